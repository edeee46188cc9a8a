use crate::components::bubble::BubbleHandle;
use crate::input::landmark::Landmark;

/// Fire-and-forget visual effects hooks. The engine never reads anything back.
///
/// All methods default to no-ops so a sink only implements what it renders.
pub trait VfxSink {
    /// A new frame is about to be described, at playback position `position_ms`.
    fn begin_frame(&mut self, _position_ms: f64) {}

    /// Called every frame for every live bubble with its current bounds.
    fn update_bubble_bounds(&mut self, _bubble: &BubbleHandle) {}

    /// A bubble was caught at (x, y).
    fn create_hit_effect(&mut self, _x: f32, _y: f32) {}

    /// Combo counter changed to `combo` after a hit.
    fn trigger_combo_effect(&mut self, _combo: u32) {}

    /// Latest body landmarks, for the player avatar.
    fn update_player_avatar(&mut self, _landmarks: &[Landmark]) {}
}

/// Sink that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVfx;

impl VfxSink for NullVfx {}
