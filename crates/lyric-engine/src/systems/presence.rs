//! Full-body presence gate for body-tracking mode.
//!
//! `NotReady -> Countdown(n) -> Ready`, with an orthogonal warning overlay.
//! `Ready` is sticky: losing the player afterwards only raises a warning once the
//! loss has lasted the grace period.

use crate::api::config::SessionConfig;
use crate::core::timers::{TimerKey, TimerRegistry};
use crate::input::landmark::{pose, Landmark};

const COUNTDOWN_INTERVAL_MS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresencePhase {
    NotReady,
    Countdown(u32),
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceWarning {
    /// Lost during the countdown.
    AdjustPosition,
    /// Lost for longer than the grace period after playback started.
    OutOfFrame,
}

impl PresenceWarning {
    /// Wire code for the host page.
    pub fn code(self) -> u32 {
        match self {
            PresenceWarning::AdjustPosition => 1,
            PresenceWarning::OutOfFrame => 2,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            PresenceWarning::AdjustPosition => "adjust position",
            PresenceWarning::OutOfFrame => "out of frame",
        }
    }
}

/// Side effects the session must carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceSignal {
    CountdownTick(u32),
    StartPlayback,
    WarningShown(PresenceWarning),
    WarningHidden,
}

pub struct PresenceGate {
    phase: PresencePhase,
    warning: Option<PresenceWarning>,
    suppressed: bool,
    countdown_from: u32,
    threshold: f32,
    loss_grace_ms: f64,
}

impl PresenceGate {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            phase: PresencePhase::NotReady,
            warning: None,
            suppressed: false,
            countdown_from: config.countdown_seconds.max(1),
            threshold: config.visibility_threshold,
            loss_grace_ms: config.presence_loss_grace_ms,
        }
    }

    /// A gate that is already open and never warns (modes without body tracking).
    pub fn disabled(config: &SessionConfig) -> Self {
        Self {
            phase: PresencePhase::Ready,
            suppressed: true,
            ..Self::new(config)
        }
    }

    /// All required landmarks present and visible per [`Landmark::is_visible`].
    /// A required point that is missing from the list fails; one that is present
    /// without a confidence passes.
    pub fn body_visible(&self, landmarks: &[Landmark]) -> bool {
        pose::REQUIRED_FOR_PRESENCE.iter().all(|&idx| {
            landmarks
                .get(idx)
                .is_some_and(|lm| lm.is_visible(self.threshold))
        })
    }

    /// Feed one frame of pose landmarks.
    pub fn evaluate(
        &mut self,
        landmarks: &[Landmark],
        now_ms: f64,
        timers: &mut TimerRegistry,
    ) -> Vec<PresenceSignal> {
        let mut signals = Vec::new();
        if self.suppressed {
            return signals;
        }
        let visible = self.body_visible(landmarks);

        match self.phase {
            PresencePhase::NotReady => {
                if visible {
                    self.hide_warning(&mut signals);
                    self.phase = PresencePhase::Countdown(self.countdown_from);
                    timers.schedule_every(TimerKey::Countdown, now_ms, COUNTDOWN_INTERVAL_MS);
                    signals.push(PresenceSignal::CountdownTick(self.countdown_from));
                    log::info!("presence: countdown from {}", self.countdown_from);
                }
            }
            PresencePhase::Countdown(_) => {
                if !visible {
                    timers.cancel(TimerKey::Countdown);
                    self.phase = PresencePhase::NotReady;
                    self.show_warning(PresenceWarning::AdjustPosition, &mut signals);
                    log::info!("presence: lost during countdown");
                }
            }
            PresencePhase::Ready => {
                if visible {
                    timers.cancel(TimerKey::PresenceLoss);
                    self.hide_warning(&mut signals);
                } else if self.warning.is_none() && !timers.is_pending(TimerKey::PresenceLoss) {
                    timers.schedule_once(TimerKey::PresenceLoss, now_ms, self.loss_grace_ms);
                }
            }
        }
        signals
    }

    /// Handle a [`TimerKey::Countdown`] tick.
    pub fn on_countdown_tick(&mut self, timers: &mut TimerRegistry) -> Vec<PresenceSignal> {
        let PresencePhase::Countdown(n) = self.phase else {
            timers.cancel(TimerKey::Countdown);
            return Vec::new();
        };
        let remaining = n.saturating_sub(1);
        if remaining == 0 {
            timers.cancel(TimerKey::Countdown);
            self.phase = PresencePhase::Ready;
            log::info!("presence: ready");
            vec![PresenceSignal::CountdownTick(0), PresenceSignal::StartPlayback]
        } else {
            self.phase = PresencePhase::Countdown(remaining);
            vec![PresenceSignal::CountdownTick(remaining)]
        }
    }

    /// Handle a [`TimerKey::PresenceLoss`] expiry.
    pub fn on_loss_timeout(&mut self) -> Option<PresenceSignal> {
        if self.suppressed || self.phase != PresencePhase::Ready || self.warning.is_some() {
            return None;
        }
        self.warning = Some(PresenceWarning::OutOfFrame);
        log::info!("presence: player out of frame");
        Some(PresenceSignal::WarningShown(PresenceWarning::OutOfFrame))
    }

    /// Turn the gate off for the rest of the session.
    pub fn suppress(&mut self, timers: &mut TimerRegistry) -> Vec<PresenceSignal> {
        let mut signals = Vec::new();
        if self.suppressed {
            return signals;
        }
        self.suppressed = true;
        timers.cancel(TimerKey::Countdown);
        timers.cancel(TimerKey::PresenceLoss);
        self.hide_warning(&mut signals);
        if self.phase != PresencePhase::Ready {
            self.phase = PresencePhase::Ready;
            signals.push(PresenceSignal::StartPlayback);
        }
        log::info!("presence: gate suppressed");
        signals
    }

    fn show_warning(&mut self, warning: PresenceWarning, signals: &mut Vec<PresenceSignal>) {
        if self.warning != Some(warning) {
            self.warning = Some(warning);
            signals.push(PresenceSignal::WarningShown(warning));
        }
    }

    fn hide_warning(&mut self, signals: &mut Vec<PresenceSignal>) {
        if self.warning.take().is_some() {
            signals.push(PresenceSignal::WarningHidden);
        }
    }

    /// Lyric scanning and hold progress pause while this is true: until the
    /// countdown has finished, and while a warning is up.
    pub fn is_suspending(&self) -> bool {
        self.phase != PresencePhase::Ready || self.warning.is_some()
    }

    pub fn phase(&self) -> PresencePhase {
        self.phase
    }

    pub fn warning(&self) -> Option<PresenceWarning> {
        self.warning
    }

    pub fn is_ready(&self) -> bool {
        self.phase == PresencePhase::Ready
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(visible: bool) -> Vec<Landmark> {
        let vis = if visible { 0.95 } else { 0.1 };
        vec![Landmark::new(0.5, 0.5).with_visibility(vis); 33]
    }

    fn ready_gate(timers: &mut TimerRegistry) -> PresenceGate {
        let mut gate = PresenceGate::new(&SessionConfig::default());
        gate.evaluate(&body(true), 0.0, timers);
        for _ in 0..5 {
            gate.on_countdown_tick(timers);
        }
        assert!(gate.is_ready());
        gate
    }

    #[test]
    fn full_countdown_starts_playback() {
        let mut timers = TimerRegistry::new();
        let mut gate = PresenceGate::new(&SessionConfig::default());
        assert_eq!(
            gate.evaluate(&body(true), 0.0, &mut timers),
            vec![PresenceSignal::CountdownTick(5)]
        );
        assert!(gate.is_suspending());
        assert!(timers.is_pending(TimerKey::Countdown));

        let mut last = Vec::new();
        for _ in 0..5 {
            last = gate.on_countdown_tick(&mut timers);
        }
        assert_eq!(last, vec![PresenceSignal::CountdownTick(0), PresenceSignal::StartPlayback]);
        assert!(gate.is_ready());
        assert!(!gate.is_suspending());
        assert!(!timers.is_pending(TimerKey::Countdown));
    }

    #[test]
    fn partial_body_does_not_start() {
        let mut timers = TimerRegistry::new();
        let mut gate = PresenceGate::new(&SessionConfig::default());
        let mut lms = body(true);
        lms[pose::LEFT_ANKLE].visibility = Some(0.2);
        assert!(gate.evaluate(&lms, 0.0, &mut timers).is_empty());
        assert_eq!(gate.phase(), PresencePhase::NotReady);

        // Missing landmarks entirely also count as not visible.
        assert!(gate.evaluate(&lms[..20], 0.0, &mut timers).is_empty());
        assert!(gate.is_suspending());
    }

    #[test]
    fn unreported_confidence_counts_as_visible() {
        let mut timers = TimerRegistry::new();
        let mut gate = PresenceGate::new(&SessionConfig::default());
        let lms = vec![Landmark::new(0.5, 0.5); 33];
        assert!(gate.body_visible(&lms));
        assert_eq!(
            gate.evaluate(&lms, 0.0, &mut timers),
            vec![PresenceSignal::CountdownTick(5)]
        );
    }

    #[test]
    fn loss_during_countdown_returns_to_not_ready() {
        let mut timers = TimerRegistry::new();
        let mut gate = PresenceGate::new(&SessionConfig::default());
        gate.evaluate(&body(true), 0.0, &mut timers);
        gate.on_countdown_tick(&mut timers);

        let signals = gate.evaluate(&body(false), 1500.0, &mut timers);
        assert_eq!(
            signals,
            vec![PresenceSignal::WarningShown(PresenceWarning::AdjustPosition)]
        );
        assert_eq!(gate.phase(), PresencePhase::NotReady);
        assert!(!timers.is_pending(TimerKey::Countdown));

        // Coming back hides the warning and restarts the countdown from the top.
        let signals = gate.evaluate(&body(true), 2000.0, &mut timers);
        assert_eq!(
            signals,
            vec![PresenceSignal::WarningHidden, PresenceSignal::CountdownTick(5)]
        );
    }

    #[test]
    fn loss_after_ready_only_warns_after_grace() {
        let mut timers = TimerRegistry::new();
        let mut gate = ready_gate(&mut timers);

        assert!(gate.evaluate(&body(false), 10_000.0, &mut timers).is_empty());
        assert!(timers.is_pending(TimerKey::PresenceLoss));
        assert!(gate.is_ready());
        assert!(!gate.is_suspending());

        assert_eq!(timers.poll(13_000.0), vec![TimerKey::PresenceLoss]);
        assert_eq!(
            gate.on_loss_timeout(),
            Some(PresenceSignal::WarningShown(PresenceWarning::OutOfFrame))
        );
        assert_eq!(gate.phase(), PresencePhase::Ready);
        assert!(gate.is_suspending());

        assert_eq!(
            gate.evaluate(&body(true), 14_000.0, &mut timers),
            vec![PresenceSignal::WarningHidden]
        );
        assert!(!gate.is_suspending());
    }

    #[test]
    fn recovery_within_grace_shows_nothing() {
        let mut timers = TimerRegistry::new();
        let mut gate = ready_gate(&mut timers);
        gate.evaluate(&body(false), 10_000.0, &mut timers);
        assert!(gate.evaluate(&body(true), 11_000.0, &mut timers).is_empty());
        assert!(!timers.is_pending(TimerKey::PresenceLoss));
        assert!(gate.warning().is_none());
    }

    #[test]
    fn suppress_opens_gate_and_silences_it() {
        let mut timers = TimerRegistry::new();
        let mut gate = PresenceGate::new(&SessionConfig::default());
        gate.evaluate(&body(true), 0.0, &mut timers);
        gate.evaluate(&body(false), 100.0, &mut timers);
        assert!(gate.warning().is_some());

        let signals = gate.suppress(&mut timers);
        assert_eq!(
            signals,
            vec![PresenceSignal::WarningHidden, PresenceSignal::StartPlayback]
        );
        assert!(gate.is_ready());
        assert!(gate.evaluate(&body(false), 200.0, &mut timers).is_empty());
        assert!(gate.evaluate(&body(true), 300.0, &mut timers).is_empty());
        assert!(timers.is_empty());
        assert!(!gate.is_suspending());
    }

    #[test]
    fn disabled_gate_never_suspends() {
        let mut timers = TimerRegistry::new();
        let mut gate = PresenceGate::disabled(&SessionConfig::default());
        assert!(gate.is_ready());
        assert!(gate.evaluate(&body(false), 0.0, &mut timers).is_empty());
        assert!(!gate.is_suspending());
    }
}
