use glam::Vec2;

use crate::api::vfx::VfxSink;
use crate::components::bubble::BubbleHandle;
use crate::input::landmark::Landmark;
use crate::renderer::instance::{BubbleInstance, RenderBuffer};

/// A hit burst requested this frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct HitEffect {
    pub x: f32,
    pub y: f32,
}

/// VFX sink that records one frame of render data for the host to read.
pub struct FrameSink {
    position_ms: f64,
    buffer: RenderBuffer,
    hit_effects: Vec<HitEffect>,
    combo: Option<u32>,
    /// Flat x, y pairs in world pixels.
    avatar: Vec<f32>,
    max_avatar_points: usize,
    world: Vec2,
    mirror: bool,
}

impl FrameSink {
    pub fn new(max_instances: usize, max_avatar_points: usize, world: Vec2, mirror: bool) -> Self {
        Self {
            position_ms: 0.0,
            buffer: RenderBuffer::with_capacity(max_instances),
            hit_effects: Vec::new(),
            combo: None,
            avatar: Vec::with_capacity(max_avatar_points * 2),
            max_avatar_points,
            world,
            mirror,
        }
    }

    pub fn buffer(&self) -> &RenderBuffer {
        &self.buffer
    }

    pub fn hit_effects(&self) -> &[HitEffect] {
        &self.hit_effects
    }

    pub fn hit_effects_ptr(&self) -> *const f32 {
        self.hit_effects.as_ptr() as *const f32
    }

    /// Combo value to flash this frame, if any.
    pub fn combo(&self) -> Option<u32> {
        self.combo
    }

    pub fn avatar(&self) -> &[f32] {
        &self.avatar
    }

    pub fn avatar_ptr(&self) -> *const f32 {
        self.avatar.as_ptr()
    }

    pub fn avatar_point_count(&self) -> u32 {
        (self.avatar.len() / 2) as u32
    }
}

impl VfxSink for FrameSink {
    fn begin_frame(&mut self, position_ms: f64) {
        self.position_ms = position_ms;
        self.buffer.clear();
        self.hit_effects.clear();
        self.combo = None;
    }

    fn update_bubble_bounds(&mut self, bubble: &BubbleHandle) {
        let age = bubble.age(self.position_ms);
        self.buffer.push(BubbleInstance::from_bubble(bubble, age));
    }

    fn create_hit_effect(&mut self, x: f32, y: f32) {
        self.hit_effects.push(HitEffect { x, y });
    }

    fn trigger_combo_effect(&mut self, combo: u32) {
        self.combo = Some(combo);
    }

    fn update_player_avatar(&mut self, landmarks: &[Landmark]) {
        self.avatar.clear();
        for lm in landmarks.iter().take(self.max_avatar_points) {
            let p = lm.to_world(self.world, self.mirror);
            self.avatar.extend_from_slice(&[p.x, p.y]);
        }
    }
}
