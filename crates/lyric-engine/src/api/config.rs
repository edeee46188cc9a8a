use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::types::GameMode;
use crate::assets::song::SelectedSong;
use crate::error::ConfigError;

/// Every tunable of a play session. Loaded from JSON by the host; missing fields keep defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// World width in pixels.
    pub world_width: f32,
    /// World height in pixels.
    pub world_height: f32,
    /// Seed for bubble placement.
    pub rng_seed: u64,

    // -- Lyric timeline --
    /// Acceptance window around an entry's time (either side).
    pub scan_tolerance_ms: f64,
    /// Minimum playback time between two spawns.
    pub min_spawn_gap_ms: f64,
    /// How long a spawned (time, text) key is remembered.
    pub recent_spawn_ttl_ms: f64,
    /// Backward jump that counts as a rewind.
    pub rewind_resync_ms: f64,
    /// Forward jump that counts as a skip.
    pub forward_resync_ms: f64,
    /// Lower bound for a bubble's on-screen lifetime.
    pub min_display_ms: f64,

    // -- Bubbles --
    pub max_active_bubbles: usize,
    pub pool_max_size: usize,
    pub placement_attempts: u32,
    /// Minimum horizontal gap between bubble edges.
    pub placement_gap_px: f32,
    pub bubble_radius_min: f32,
    pub bubble_radius_max: f32,
    pub bubble_radius_per_char: f32,
    /// Upward drift in pixels per second of playback.
    pub rise_speed: f32,
    /// Vertical spawn band as fractions of world height.
    pub spawn_band_top: f32,
    pub spawn_band_bottom: f32,

    // -- Hold scoring --
    pub hold_duration_ms: f64,
    /// Theoretical maximum session score.
    pub max_score: f64,
    pub pointer_radius: f32,
    pub landmark_radius: f32,
    /// Mouth opening (relative to face height) that counts as an open-mouth hold.
    pub mouth_open_ratio: f32,
    /// Flip camera x so the screen behaves like a mirror.
    pub mirror_camera: bool,

    // -- Presence gate --
    pub countdown_seconds: u32,
    pub visibility_threshold: f32,
    pub presence_loss_grace_ms: f64,

    // -- Completion --
    /// No completion signal is honoured this soon after playback starts.
    pub completion_grace_ms: f64,
    pub watchdog_interval_ms: f64,
    /// Position within this margin of the duration counts as the end.
    pub end_margin_ms: f64,
    pub end_confirm_delay_ms: f64,
    /// A pause this close to the end counts as finished.
    pub near_end_pause_ms: f64,
    pub completion_safety_margin_ms: f64,
    /// Absolute deadline when the song duration is unknown.
    pub default_deadline_ms: f64,
    pub fallback_loop_grace_ms: f64,
    pub cursor_buffer_ms: f64,
    pub hand_buffer_ms: f64,
    pub face_buffer_ms: f64,
    pub body_buffer_ms: f64,

    // -- Playback --
    /// Switch to the internal wall clock when the timed player fails.
    pub allow_fallback: bool,

    // -- Host protocol --
    /// Events kept per frame; extras are dropped.
    pub max_frame_events: usize,
    pub max_avatar_points: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            world_width: 1280.0,
            world_height: 720.0,
            rng_seed: 42,
            scan_tolerance_ms: 200.0,
            min_spawn_gap_ms: 350.0,
            recent_spawn_ttl_ms: 10_000.0,
            rewind_resync_ms: 1000.0,
            forward_resync_ms: 1200.0,
            min_display_ms: 1500.0,
            max_active_bubbles: 50,
            pool_max_size: 64,
            placement_attempts: 8,
            placement_gap_px: 16.0,
            bubble_radius_min: 40.0,
            bubble_radius_max: 90.0,
            bubble_radius_per_char: 6.0,
            rise_speed: 18.0,
            spawn_band_top: 0.2,
            spawn_band_bottom: 0.8,
            hold_duration_ms: 1000.0,
            max_score: 1_000_000.0,
            pointer_radius: 20.0,
            landmark_radius: 32.0,
            mouth_open_ratio: 0.35,
            mirror_camera: true,
            countdown_seconds: 5,
            visibility_threshold: 0.6,
            presence_loss_grace_ms: 3000.0,
            completion_grace_ms: 4000.0,
            watchdog_interval_ms: 1000.0,
            end_margin_ms: 500.0,
            end_confirm_delay_ms: 800.0,
            near_end_pause_ms: 1500.0,
            completion_safety_margin_ms: 10_000.0,
            default_deadline_ms: 300_000.0,
            fallback_loop_grace_ms: 3000.0,
            cursor_buffer_ms: 3000.0,
            hand_buffer_ms: 5000.0,
            face_buffer_ms: 5000.0,
            body_buffer_ms: 10_000.0,
            allow_fallback: true,
            max_frame_events: 64,
            max_avatar_points: 64,
        }
    }
}

impl SessionConfig {
    /// Parse a config override document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Session)
    }

    /// Extra slack added to the song duration before the absolute completion deadline.
    pub fn mode_buffer_ms(&self, mode: GameMode) -> f64 {
        match mode {
            GameMode::Cursor => self.cursor_buffer_ms,
            GameMode::Hand => self.hand_buffer_ms,
            GameMode::Face => self.face_buffer_ms,
            GameMode::Body => self.body_buffer_ms,
        }
    }
}

/// Everything a session's components need to know, owned by whoever starts the session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub config: SessionConfig,
    pub mode: GameMode,
    pub song: SelectedSong,
}

impl SessionContext {
    pub fn new(config: SessionConfig, mode: GameMode, song: SelectedSong) -> Self {
        Self { config, mode, song }
    }

    pub fn world(&self) -> Vec2 {
        Vec2::new(self.config.world_width, self.config.world_height)
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(SessionConfig::default(), GameMode::default(), SelectedSong::default())
    }
}
