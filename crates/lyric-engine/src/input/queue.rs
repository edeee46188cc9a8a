use crate::core::clock::PlayerSnapshot;
use crate::core::control::ControlOp;
use crate::input::landmark::{Landmark, LandmarkKind};

/// Requests and reports from the host page that are not pointer or vision input.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// UI asked for play/pause/restart.
    Request(ControlOp),
    /// The timed player finished a control call. `error` is set when it was rejected.
    Settled { op: ControlOp, error: Option<String> },
    /// Latest timed-player state.
    PlayerState(PlayerSnapshot),
    /// The timed player reported the end of the song.
    PlayerFinished,
    /// No timed player library could be loaded.
    PlayerUnavailable,
    /// Turn the presence gate off for the rest of the session.
    SuppressPresence,
}

/// Input event types the session understands.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// A touch/click began at world coordinates (x, y).
    PointerDown { x: f32, y: f32 },
    /// A touch/click ended at world coordinates (x, y).
    PointerUp { x: f32, y: f32 },
    /// A touch/cursor moved to world coordinates (x, y).
    PointerMove { x: f32, y: f32 },
    /// One frame of vision output.
    Landmarks { kind: LandmarkKind, points: Vec<Landmark> },
    /// A command from the host page.
    Command(HostCommand),
}

/// A queue of input events.
/// The host writes events into the queue; the session drains them once per frame.
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events. Returns a Vec and clears the queue.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
