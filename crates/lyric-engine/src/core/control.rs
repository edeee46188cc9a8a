use crate::error::ControlError;

/// Playback control operations sent to the external player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ControlOp {
    Play = 1,
    Pause = 2,
    Restart = 3,
}

impl ControlOp {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(ControlOp::Play),
            2 => Some(ControlOp::Pause),
            3 => Some(ControlOp::Restart),
            _ => None,
        }
    }
}

/// Guards against re-entrant control requests.
///
/// While one operation is in flight every new request is ignored, so rapid
/// repeated clicks never stack up play/pause/restart calls on the player.
#[derive(Debug, Default)]
pub struct PlaybackControl {
    in_flight: Option<ControlOp>,
}

impl PlaybackControl {
    pub fn new() -> Self {
        Self { in_flight: None }
    }

    /// Start an operation. Returns false (and changes nothing) if one is in flight.
    pub fn begin(&mut self, op: ControlOp) -> bool {
        if let Some(current) = self.in_flight {
            log::debug!("control: {:?} ignored, {:?} still in flight", op, current);
            return false;
        }
        self.in_flight = Some(op);
        true
    }

    /// Settle the in-flight operation. A mismatched op is ignored and returns `None`.
    pub fn settle(
        &mut self,
        op: ControlOp,
        result: Result<(), ControlError>,
    ) -> Option<Result<(), ControlError>> {
        if self.in_flight != Some(op) {
            log::debug!("control: stray settle for {:?}", op);
            return None;
        }
        self.in_flight = None;
        if let Err(e) = &result {
            log::warn!("control: {:?} failed: {}", op, e);
        }
        Some(result)
    }

    pub fn in_flight(&self) -> Option<ControlOp> {
        self.in_flight
    }

    /// Drop any in-flight operation (session teardown).
    pub fn clear(&mut self) {
        self.in_flight = None;
    }
}
