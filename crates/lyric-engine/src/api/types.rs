use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Unique identifier for an on-screen bubble.
/// Ids are never reused within a session, even when the pooled handle behind them is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BubbleId(pub u32);

/// Which kind of input is holding a bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldSource {
    /// Mouse or touch. Only one bubble may be the pointer target at a time.
    Pointer,
    /// Camera-derived points (hands, face, pose). May hold several bubbles at once.
    Auto,
}

/// Input modality selected for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Cursor,
    Hand,
    Face,
    Body,
}

impl GameMode {
    /// Wire name, as used by the ranking service.
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Cursor => "cursor",
            GameMode::Hand => "hand",
            GameMode::Face => "face",
            GameMode::Body => "body",
        }
    }

    /// Decode the numeric mode code sent by the host page.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(GameMode::Cursor),
            1 => Some(GameMode::Hand),
            2 => Some(GameMode::Face),
            3 => Some(GameMode::Body),
            _ => None,
        }
    }

    /// Only full-body tracking waits for the player to step into frame.
    pub fn uses_presence_gate(self) -> bool {
        matches!(self, GameMode::Body)
    }

    pub fn uses_camera(self) -> bool {
        !matches!(self, GameMode::Cursor)
    }
}

/// Event kinds forwarded from Rust to the host page.
/// Numeric values are part of the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EventKind {
    /// a = bubble id, b = x, c = y
    BubbleSpawned = 1,
    /// a = bubble id, b = x, c = y
    BubbleHit = 2,
    /// a = bubble id
    BubbleMissed = 3,
    /// a = bubble id. The host must drop any reference to this id.
    BubbleReleased = 4,
    /// a = combo
    Combo = 5,
    /// a = rounded score, b = combo, c = max combo
    Score = 6,
    /// a = seconds remaining
    Countdown = 7,
    /// a = warning code
    WarningShown = 8,
    WarningHidden = 9,
    /// a = control op code
    ControlRequest = 10,
    PlaybackStarted = 11,
    /// a = score, b = max combo, c = rank code
    Results = 12,
    FallbackEntered = 13,
}

/// A game event communicated from Rust to the host page.
/// Generic container: `kind` identifies the event, `a/b/c` carry payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GameEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl GameEvent {
    pub const FLOATS: usize = 4;

    pub fn new(kind: EventKind, a: f32, b: f32, c: f32) -> Self {
        Self {
            kind: kind as u32 as f32,
            a,
            b,
            c,
        }
    }

    pub fn is(&self, kind: EventKind) -> bool {
        self.kind == kind as u32 as f32
    }
}
