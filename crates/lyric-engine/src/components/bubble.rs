use glam::Vec2;

use crate::api::types::BubbleId;
use crate::core::pool::Poolable;

/// One on-screen lyric bubble.
///
/// Borrowed from the pool on spawn and returned on hit, miss, eviction or reset.
/// After return the id is dead; the host must not render it again.
#[derive(Debug, Clone)]
pub struct BubbleHandle {
    /// Unique for the session; assigned on every acquire.
    pub id: BubbleId,
    /// Lyric text shown in the bubble.
    pub text: String,
    /// Centre in world pixels.
    pub pos: Vec2,
    pub radius: f32,
    /// Playback time the bubble appeared.
    pub created_at: f64,
    /// Playback time after which an uncaught bubble is a miss.
    pub expires_at: f64,
    /// Hold progress mirrored from the scoring engine, for rendering.
    pub progress: f32,
    pub opacity: f32,
    /// Whether input may still hit this bubble.
    pub interactive: bool,
    /// Caught; waiting to be released.
    pub completed: bool,
    /// On screen (false once returned to the pool).
    pub attached: bool,
}

impl BubbleHandle {
    /// Blank handle as produced by the pool factory.
    pub fn blank() -> Self {
        Self {
            id: BubbleId(0),
            text: String::new(),
            pos: Vec2::ZERO,
            radius: 0.0,
            created_at: 0.0,
            expires_at: 0.0,
            progress: 0.0,
            opacity: 1.0,
            interactive: true,
            completed: false,
            attached: false,
        }
    }

    // -- Builder pattern (used after acquire) --

    pub fn with_id(mut self, id: BubbleId) -> Self {
        self.id = id;
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text.clear();
        self.text.push_str(text);
        self
    }

    pub fn with_pos(mut self, pos: Vec2) -> Self {
        self.pos = pos;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_lifetime(mut self, created_at: f64, expires_at: f64) -> Self {
        self.created_at = created_at;
        self.expires_at = expires_at;
        self
    }

    /// Circle-circle overlap with a probe of radius `probe_radius` at (x, y).
    pub fn hit_test(&self, x: f32, y: f32, probe_radius: f32) -> bool {
        self.interactive
            && self.pos.distance_squared(Vec2::new(x, y)) <= (self.radius + probe_radius).powi(2)
    }

    /// Horizontal extent `[left, right]`.
    pub fn x_bounds(&self) -> (f32, f32) {
        (self.pos.x - self.radius, self.pos.x + self.radius)
    }

    /// Fraction of the lifetime elapsed at `position_ms`, clamped to [0, 1].
    pub fn age(&self, position_ms: f64) -> f32 {
        let span = self.expires_at - self.created_at;
        if span <= 0.0 {
            return 1.0;
        }
        ((position_ms - self.created_at) / span).clamp(0.0, 1.0) as f32
    }
}

impl Default for BubbleHandle {
    fn default() -> Self {
        Self::blank()
    }
}

impl Poolable for BubbleHandle {
    fn reset(&mut self) {
        self.opacity = 1.0;
        self.interactive = true;
        self.completed = false;
        self.progress = 0.0;
        self.text.clear();
        self.attached = true;
    }

    fn detach(&mut self) {
        self.attached = false;
        self.interactive = false;
        self.text.clear();
    }
}
