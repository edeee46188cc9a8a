//! Shared frame layout read by the host page.
//! Must stay in sync with the host's `protocol.ts`.
//!
//! Layout (all values in f32 / 4 bytes):
//! ```text
//! [Header: 16 floats]
//! [Bubbles: max_instances × 8 floats]
//! [Events: max_events × 4 floats]
//! [Avatar: max_avatar_points × 2 floats]
//! ```
//!
//! Capacities are written into the header every frame.
//! The host reads them from the header to compute offsets dynamically.

use crate::api::config::SessionConfig;

/// Number of floats in the header section.
pub const HEADER_FLOATS: usize = 16;

/// Header field indices.
pub const HEADER_LOCK: usize = 0;
pub const HEADER_FRAME_COUNTER: usize = 1;
pub const HEADER_MAX_INSTANCES: usize = 2;
pub const HEADER_INSTANCE_COUNT: usize = 3;
pub const HEADER_MAX_EVENTS: usize = 4;
pub const HEADER_EVENT_COUNT: usize = 5;
pub const HEADER_MAX_AVATAR_POINTS: usize = 6;
pub const HEADER_AVATAR_POINT_COUNT: usize = 7;
pub const HEADER_WORLD_WIDTH: usize = 8;
pub const HEADER_WORLD_HEIGHT: usize = 9;
pub const HEADER_PROTOCOL_VERSION: usize = 10;
pub const HEADER_POSITION_MS: usize = 11;
pub const HEADER_SCORE: usize = 12;
pub const HEADER_COMBO: usize = 13;
pub const HEADER_MAX_COMBO: usize = 14;
/// 0 = ready, n > 0 = countdown seconds left, -1 = not ready, -2 = warning shown.
pub const HEADER_PRESENCE: usize = 15;

/// Protocol version written into the header.
pub const PROTOCOL_VERSION: f32 = 1.0;

/// Floats per bubble instance (wire format, never changes).
pub const INSTANCE_FLOATS: usize = 8;

/// Floats per game event: kind, a, b, c (wire format, never changes).
pub const EVENT_FLOATS: usize = 4;

/// Floats per avatar point: x, y.
pub const AVATAR_POINT_FLOATS: usize = 2;

/// Runtime-computed buffer layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolLayout {
    pub max_instances: usize,
    pub max_events: usize,
    pub max_avatar_points: usize,

    /// Size of instance data section in floats.
    pub instance_data_floats: usize,
    /// Size of event data section in floats.
    pub event_data_floats: usize,
    /// Size of avatar data section in floats.
    pub avatar_data_floats: usize,

    /// Offset (in floats) where instance data begins.
    pub instance_data_offset: usize,
    /// Offset (in floats) where event data begins.
    pub event_data_offset: usize,
    /// Offset (in floats) where avatar data begins.
    pub avatar_data_offset: usize,

    /// Total buffer size in floats.
    pub buffer_total_floats: usize,
    /// Total buffer size in bytes.
    pub buffer_total_bytes: usize,
}

impl ProtocolLayout {
    /// Compute layout from raw capacity values.
    pub fn new(max_instances: usize, max_events: usize, max_avatar_points: usize) -> Self {
        let instance_data_floats = max_instances * INSTANCE_FLOATS;
        let event_data_floats = max_events * EVENT_FLOATS;
        let avatar_data_floats = max_avatar_points * AVATAR_POINT_FLOATS;

        let instance_data_offset = HEADER_FLOATS;
        let event_data_offset = instance_data_offset + instance_data_floats;
        let avatar_data_offset = event_data_offset + event_data_floats;

        let buffer_total_floats = avatar_data_offset + avatar_data_floats;

        Self {
            max_instances,
            max_events,
            max_avatar_points,
            instance_data_floats,
            event_data_floats,
            avatar_data_floats,
            instance_data_offset,
            event_data_offset,
            avatar_data_offset,
            buffer_total_floats,
            buffer_total_bytes: buffer_total_floats * 4,
        }
    }

    /// Compute layout from a session config. The bubble cap bounds the instance section.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.max_active_bubbles,
            config.max_frame_events,
            config.max_avatar_points,
        )
    }

    /// Header with capacities and world size filled in; per-frame fields zeroed.
    pub fn header(&self, world_width: f32, world_height: f32) -> [f32; HEADER_FLOATS] {
        let mut header = [0.0; HEADER_FLOATS];
        header[HEADER_MAX_INSTANCES] = self.max_instances as f32;
        header[HEADER_MAX_EVENTS] = self.max_events as f32;
        header[HEADER_MAX_AVATAR_POINTS] = self.max_avatar_points as f32;
        header[HEADER_WORLD_WIDTH] = world_width;
        header[HEADER_WORLD_HEIGHT] = world_height;
        header[HEADER_PROTOCOL_VERSION] = PROTOCOL_VERSION;
        header
    }
}
