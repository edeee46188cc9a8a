//! Spawning, placement, motion and expiry of lyric bubbles.

use glam::Vec2;

use crate::api::config::SessionConfig;
use crate::api::types::BubbleId;
use crate::api::vfx::VfxSink;
use crate::components::bubble::BubbleHandle;
use crate::core::pool::ObjectPool;
use crate::core::rng::Rng;
use crate::core::scene::Scene;
use crate::timeline::lyrics::LyricEntry;

/// Fraction of the lifetime over which a bubble fades out.
const FADE_TAIL: f32 = 0.2;

/// What a spawn did to the active set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnOutcome {
    pub id: BubbleId,
    pub pos: Vec2,
    /// Oldest bubble forcibly released to stay under the cap.
    pub evicted: Option<BubbleId>,
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    attempts: u32,
    gap: f32,
    radius_min: f32,
    radius_max: f32,
    radius_per_char: f32,
    band_top: f32,
    band_bottom: f32,
}

pub struct BubbleLifecycleManager {
    pool: ObjectPool<BubbleHandle>,
    scene: Scene,
    rng: Rng,
    next_id: u32,
    cap: usize,
    world: Vec2,
    rise_speed: f32,
    placement: Placement,
}

impl BubbleLifecycleManager {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            pool: ObjectPool::new(config.pool_max_size, BubbleHandle::blank),
            scene: Scene::with_capacity(config.max_active_bubbles),
            rng: Rng::new(config.rng_seed),
            next_id: 1,
            cap: config.max_active_bubbles.max(1),
            world: Vec2::new(config.world_width, config.world_height),
            rise_speed: config.rise_speed,
            placement: Placement {
                attempts: config.placement_attempts,
                gap: config.placement_gap_px,
                radius_min: config.bubble_radius_min,
                radius_max: config.bubble_radius_max.max(config.bubble_radius_min),
                radius_per_char: config.bubble_radius_per_char,
                band_top: config.spawn_band_top,
                band_bottom: config.spawn_band_bottom.max(config.spawn_band_top),
            },
        }
    }

    /// Put a bubble on screen for `entry`, evicting the oldest one if at the cap.
    pub fn spawn(&mut self, entry: &LyricEntry, position_ms: f64) -> SpawnOutcome {
        let evicted = if self.scene.len() >= self.cap {
            self.scene.despawn_oldest().map(|oldest| {
                let id = oldest.id;
                log::debug!("bubbles: cap {} reached, evicting {:?}", self.cap, id);
                self.pool.release(oldest);
                id
            })
        } else {
            None
        };

        let radius = self.radius_for(&entry.text);
        let pos = self.place(radius);
        let id = BubbleId(self.next_id);
        self.next_id += 1;

        let bubble = self
            .pool
            .acquire()
            .with_id(id)
            .with_text(&entry.text)
            .with_pos(pos)
            .with_radius(radius)
            .with_lifetime(position_ms, entry.time + entry.display_duration);
        self.scene.spawn(bubble);

        SpawnOutcome { id, pos, evicted }
    }

    fn radius_for(&self, text: &str) -> f32 {
        let p = &self.placement;
        (p.radius_min + text.chars().count() as f32 * p.radius_per_char).min(p.radius_max)
    }

    /// Rejection-sample an x that keeps the gap to every active bubble; give up after the budget.
    fn place(&mut self, radius: f32) -> Vec2 {
        let p = self.placement;
        let (lo, hi) = if self.world.x > 2.0 * radius {
            (radius, self.world.x - radius)
        } else {
            (self.world.x * 0.5, self.world.x * 0.5)
        };
        let y = self
            .rng
            .range(p.band_top * self.world.y, p.band_bottom * self.world.y);

        for _ in 0..p.attempts {
            let x = self.rng.range(lo, hi);
            let clear = self.scene.iter().all(|b| {
                let (left, right) = b.x_bounds();
                x + radius + p.gap <= left || x - radius - p.gap >= right
            });
            if clear {
                return Vec2::new(x, y);
            }
        }
        Vec2::new(self.rng.range(lo, hi), y)
    }

    /// Release every uncaught bubble whose lifetime has passed. Returns their ids.
    pub fn expire(&mut self, position_ms: f64) -> Vec<BubbleId> {
        let expired = self
            .scene
            .despawn_where(|b| !b.completed && position_ms >= b.expires_at);
        let ids = expired.iter().map(|b| b.id).collect();
        self.pool.release_all(expired);
        ids
    }

    /// Release one bubble. Returns where it was.
    pub fn release(&mut self, id: BubbleId) -> Option<Vec2> {
        let bubble = self.scene.despawn(id)?;
        let pos = bubble.pos;
        self.pool.release(bubble);
        Some(pos)
    }

    /// Release everything on screen. Returns the released ids in spawn order.
    pub fn release_all(&mut self) -> Vec<BubbleId> {
        let all = self.scene.drain_all();
        let ids = all.iter().map(|b| b.id).collect();
        self.pool.release_all(all);
        ids
    }

    /// Flag a caught bubble so it stops taking input until it is released.
    pub fn mark_completed(&mut self, id: BubbleId) {
        if let Some(b) = self.scene.get_mut(id) {
            b.completed = true;
            b.interactive = false;
            b.progress = 1.0;
        }
    }

    /// Move bubbles by `dt_s` seconds of playback and mirror hold progress for rendering.
    pub fn advance(&mut self, dt_s: f32, position_ms: f64, progress: impl Fn(BubbleId) -> f32) {
        let rise = self.rise_speed * dt_s.max(0.0);
        for b in self.scene.iter_mut() {
            b.pos.y -= rise;
            if !b.completed {
                b.progress = progress(b.id);
            }
            let remaining = 1.0 - b.age(position_ms);
            b.opacity = (remaining / FADE_TAIL).clamp(0.0, 1.0);
        }
    }

    /// Push every live bubble's bounds to the sink.
    pub fn refresh_bounds(&self, vfx: &mut dyn VfxSink) {
        for b in self.scene.iter() {
            vfx.update_bubble_bounds(b);
        }
    }

    /// Topmost interactive bubble under a probe circle.
    pub fn hit_test(&self, x: f32, y: f32, radius: f32) -> Option<BubbleId> {
        self.scene
            .iter()
            .rev()
            .find(|b| b.hit_test(x, y, radius))
            .map(|b| b.id)
    }

    /// Every interactive bubble under a probe circle.
    pub fn hits(&self, x: f32, y: f32, radius: f32) -> Vec<BubbleId> {
        self.scene
            .iter()
            .filter(|b| b.hit_test(x, y, radius))
            .map(|b| b.id)
            .collect()
    }

    pub fn get(&self, id: BubbleId) -> Option<&BubbleHandle> {
        self.scene.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BubbleHandle> {
        self.scene.iter()
    }

    pub fn active_count(&self) -> usize {
        self.scene.len()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn pool(&self) -> &ObjectPool<BubbleHandle> {
        &self.pool
    }
}
