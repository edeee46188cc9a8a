//! Single-fire session completion.
//!
//! Several independent signals can end a session: the player's finish event, the
//! near-end watchdog, an absolute deadline and the fallback loop. The first one
//! accepted wins; every later one is a silent no-op.

use serde::{Deserialize, Serialize};

use crate::api::config::SessionConfig;
use crate::api::types::GameMode;
use crate::core::timers::{TimerKey, TimerRegistry};

const COMPLETION_TIMERS: [TimerKey; 4] = [
    TimerKey::CompletionWatchdog,
    TimerKey::CompletionConfirm,
    TimerKey::CompletionDeadline,
    TimerKey::FallbackLoopGrace,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// The timed player reported the end of the song.
    FinishEvent,
    /// Position reached the end and stayed there.
    Watchdog,
    /// Playback paused just short of the end.
    NearEndPause,
    /// Absolute deadline after playback start.
    Deadline,
    /// Fallback timeline ran out of lyrics.
    FallbackLoop,
}

impl CompletionReason {
    pub fn code(self) -> u32 {
        match self {
            CompletionReason::FinishEvent => 1,
            CompletionReason::Watchdog => 2,
            CompletionReason::NearEndPause => 3,
            CompletionReason::Deadline => 4,
            CompletionReason::FallbackLoop => 5,
        }
    }
}

pub struct SessionCompletionArbiter {
    completed: Option<CompletionReason>,
    /// Wall-clock time playback started. Nothing completes before it is set.
    started_at_ms: Option<f64>,
    deadline_from_duration: bool,
    grace_ms: f64,
    watchdog_interval_ms: f64,
    end_margin_ms: f64,
    confirm_delay_ms: f64,
    near_end_pause_ms: f64,
    safety_margin_ms: f64,
    default_deadline_ms: f64,
    loop_grace_ms: f64,
    mode_buffer_ms: f64,
}

impl SessionCompletionArbiter {
    pub fn new(config: &SessionConfig, mode: GameMode) -> Self {
        Self {
            completed: None,
            started_at_ms: None,
            deadline_from_duration: false,
            grace_ms: config.completion_grace_ms,
            watchdog_interval_ms: config.watchdog_interval_ms,
            end_margin_ms: config.end_margin_ms,
            confirm_delay_ms: config.end_confirm_delay_ms,
            near_end_pause_ms: config.near_end_pause_ms,
            safety_margin_ms: config.completion_safety_margin_ms,
            default_deadline_ms: config.default_deadline_ms,
            loop_grace_ms: config.fallback_loop_grace_ms,
            mode_buffer_ms: config.mode_buffer_ms(mode),
        }
    }

    /// Playback started: schedule the deadline and the watchdog.
    pub fn arm(&mut self, now_ms: f64, duration_ms: Option<f64>, timers: &mut TimerRegistry) {
        if self.completed.is_some() {
            return;
        }
        self.started_at_ms = Some(now_ms);
        self.deadline_from_duration = duration_ms.is_some();
        timers.cancel(TimerKey::CompletionConfirm);
        timers.cancel(TimerKey::FallbackLoopGrace);
        timers.schedule_once(TimerKey::CompletionDeadline, now_ms, self.deadline_ms(duration_ms));
        timers.schedule_every(TimerKey::CompletionWatchdog, now_ms, self.watchdog_interval_ms);
        log::debug!(
            "completion: armed, deadline in {:.0}ms",
            self.deadline_ms(duration_ms)
        );
    }

    /// Delay from playback start to the absolute deadline.
    pub fn deadline_ms(&self, duration_ms: Option<f64>) -> f64 {
        match duration_ms {
            Some(d) => d + self.mode_buffer_ms + self.safety_margin_ms,
            None => self.default_deadline_ms,
        }
    }

    /// The duration became known after arming: move the deadline off the default.
    pub fn update_duration(&mut self, duration_ms: f64, timers: &mut TimerRegistry) {
        let Some(started) = self.started_at_ms else {
            return;
        };
        if self.completed.is_some() || self.deadline_from_duration {
            return;
        }
        self.deadline_from_duration = true;
        timers.schedule_once(
            TimerKey::CompletionDeadline,
            started,
            self.deadline_ms(Some(duration_ms)),
        );
    }

    fn in_grace(&self, now_ms: f64) -> bool {
        self.started_at_ms
            .map_or(true, |started| now_ms - started < self.grace_ms)
    }

    /// Latch the session as complete. True only for the first accepted signal.
    pub fn try_complete(
        &mut self,
        reason: CompletionReason,
        now_ms: f64,
        timers: &mut TimerRegistry,
    ) -> bool {
        if self.completed.is_some() {
            return false;
        }
        if self.in_grace(now_ms) {
            log::debug!("completion: {:?} ignored inside the start grace window", reason);
            return false;
        }
        self.completed = Some(reason);
        for key in COMPLETION_TIMERS {
            timers.cancel(key);
        }
        log::info!("completion: session finished ({:?})", reason);
        true
    }

    /// Periodic check. Schedules a confirmation once the end is reached; reports a
    /// pause just short of the end directly.
    pub fn on_watchdog(
        &mut self,
        now_ms: f64,
        position_ms: f64,
        duration_ms: Option<f64>,
        paused: bool,
        timers: &mut TimerRegistry,
    ) -> Option<CompletionReason> {
        let duration = duration_ms?;
        if self.completed.is_some() {
            return None;
        }
        if position_ms >= duration - self.end_margin_ms {
            if !timers.is_pending(TimerKey::CompletionConfirm) {
                timers.schedule_once(TimerKey::CompletionConfirm, now_ms, self.confirm_delay_ms);
            }
            return None;
        }
        if paused && duration - position_ms <= self.near_end_pause_ms {
            return Some(CompletionReason::NearEndPause);
        }
        None
    }

    /// Second look after the watchdog saw the end.
    pub fn on_confirm(&self, position_ms: f64, duration_ms: Option<f64>) -> Option<CompletionReason> {
        let duration = duration_ms?;
        (position_ms >= duration - self.end_margin_ms).then_some(CompletionReason::Watchdog)
    }

    /// Fallback timeline passed its last lyric: finish after a grace period.
    pub fn schedule_fallback_loop(&self, now_ms: f64, timers: &mut TimerRegistry) {
        if self.completed.is_none() && !timers.is_pending(TimerKey::FallbackLoopGrace) {
            timers.schedule_once(TimerKey::FallbackLoopGrace, now_ms, self.loop_grace_ms);
        }
    }

    /// Forget the latch and every completion timer (restart).
    pub fn reset(&mut self, timers: &mut TimerRegistry) {
        self.completed = None;
        self.started_at_ms = None;
        self.deadline_from_duration = false;
        for key in COMPLETION_TIMERS {
            timers.cancel(key);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.started_at_ms.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }

    pub fn reason(&self) -> Option<CompletionReason> {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn armed(duration: Option<f64>) -> (SessionCompletionArbiter, TimerRegistry) {
        let mut timers = TimerRegistry::new();
        let mut arb = SessionCompletionArbiter::new(&SessionConfig::default(), GameMode::Cursor);
        arb.arm(0.0, duration, &mut timers);
        (arb, timers)
    }

    #[test]
    fn first_signal_wins() {
        let (mut arb, mut timers) = armed(Some(60_000.0));
        assert!(arb.try_complete(CompletionReason::FinishEvent, 60_000.0, &mut timers));
        assert!(!arb.try_complete(CompletionReason::Deadline, 60_001.0, &mut timers));
        assert_eq!(arb.reason(), Some(CompletionReason::FinishEvent));
        assert!(timers.is_empty());
    }

    #[test]
    fn nothing_completes_inside_grace_window() {
        let (mut arb, mut timers) = armed(Some(0.0));
        assert!(!arb.try_complete(CompletionReason::FinishEvent, 3999.0, &mut timers));
        assert!(arb.try_complete(CompletionReason::FinishEvent, 4000.0, &mut timers));
    }

    #[test]
    fn unarmed_arbiter_ignores_everything() {
        let mut timers = TimerRegistry::new();
        let mut arb = SessionCompletionArbiter::new(&SessionConfig::default(), GameMode::Body);
        assert!(!arb.try_complete(CompletionReason::FinishEvent, 1e9, &mut timers));
    }

    #[test]
    fn deadline_uses_duration_and_mode_buffer() {
        let cfg = SessionConfig::default();
        let arb = SessionCompletionArbiter::new(&cfg, GameMode::Body);
        assert_eq!(arb.deadline_ms(Some(100_000.0)), 100_000.0 + 10_000.0 + 10_000.0);
        assert_eq!(arb.deadline_ms(None), 300_000.0);
    }

    #[test]
    fn late_duration_moves_deadline() {
        let (mut arb, mut timers) = armed(None);
        arb.update_duration(60_000.0, &mut timers);
        assert!(timers.poll(60_000.0 + 3000.0 + 10_000.0 - 1.0).iter().all(|k| *k != TimerKey::CompletionDeadline));
        assert!(timers.poll(60_000.0 + 3000.0 + 10_000.0).contains(&TimerKey::CompletionDeadline));
    }

    #[test]
    fn watchdog_confirms_before_completing() {
        let (mut arb, mut timers) = armed(Some(60_000.0));
        assert_eq!(arb.on_watchdog(59_600.0, 59_600.0, Some(60_000.0), false, &mut timers), None);
        assert!(timers.is_pending(TimerKey::CompletionConfirm));
        assert_eq!(arb.on_confirm(59_700.0, Some(60_000.0)), Some(CompletionReason::Watchdog));
        // A seek back in between cancels the verdict.
        assert_eq!(arb.on_confirm(10_000.0, Some(60_000.0)), None);
    }

    #[test]
    fn pause_near_end_counts_as_finished() {
        let (mut arb, mut timers) = armed(Some(60_000.0));
        assert_eq!(
            arb.on_watchdog(59_000.0, 59_000.0, Some(60_000.0), true, &mut timers),
            Some(CompletionReason::NearEndPause)
        );
        assert_eq!(arb.on_watchdog(50_000.0, 50_000.0, Some(60_000.0), true, &mut timers), None);
        assert_eq!(arb.on_watchdog(59_000.0, 59_000.0, None, true, &mut timers), None);
    }

    #[test]
    fn reset_reopens_latch() {
        let (mut arb, mut timers) = armed(Some(60_000.0));
        arb.try_complete(CompletionReason::Deadline, 90_000.0, &mut timers);
        arb.reset(&mut timers);
        assert!(!arb.is_completed());
        assert!(!arb.is_armed());
        arb.arm(100_000.0, Some(60_000.0), &mut timers);
        assert!(arb.try_complete(CompletionReason::FinishEvent, 170_000.0, &mut timers));
    }

    fn reason_strategy() -> impl Strategy<Value = CompletionReason> {
        prop_oneof![
            Just(CompletionReason::FinishEvent),
            Just(CompletionReason::Watchdog),
            Just(CompletionReason::NearEndPause),
            Just(CompletionReason::Deadline),
            Just(CompletionReason::FallbackLoop),
        ]
    }

    proptest! {
        #[test]
        fn latch_fires_at_most_once(signals in prop::collection::vec((reason_strategy(), 0.0f64..20_000.0), 1..30)) {
            let (mut arb, mut timers) = armed(Some(10_000.0));
            let mut sorted = signals;
            sorted.sort_by(|a, b| a.1.total_cmp(&b.1));
            let accepted = sorted
                .iter()
                .filter(|(reason, at)| arb.try_complete(*reason, *at, &mut timers))
                .count();
            let any_after_grace = sorted.iter().any(|(_, at)| *at >= 4000.0);
            prop_assert_eq!(accepted, usize::from(any_after_grace));
        }
    }
}
