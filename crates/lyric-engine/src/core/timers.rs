//! Keyed one-shot and periodic timers on the host's wall clock.
//!
//! Each purpose has exactly one slot: scheduling a key that is already pending
//! replaces it. Timers never call back on their own; the game loop polls them
//! once per frame and dispatches whatever fired.

use std::collections::HashMap;

/// Every reason the session schedules delayed work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    /// Presence countdown, once per second.
    Countdown,
    /// Grace period before warning that the player left the frame.
    PresenceLoss,
    /// Periodic near-end position check.
    CompletionWatchdog,
    /// Second look after the watchdog saw the end.
    CompletionConfirm,
    /// Absolute deadline after playback start.
    CompletionDeadline,
    /// Wait after the fallback timeline ran out of lyrics.
    FallbackLoopGrace,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    due_ms: f64,
    interval_ms: Option<f64>,
}

/// Registry of pending timers, one per [`TimerKey`].
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: HashMap<TimerKey, Timer>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
        }
    }

    /// Fire once, `delay_ms` after `now_ms`. Replaces any pending timer under `key`.
    pub fn schedule_once(&mut self, key: TimerKey, now_ms: f64, delay_ms: f64) {
        self.insert(key, now_ms + delay_ms.max(0.0), None);
    }

    /// Fire every `interval_ms`, first at `now_ms + interval_ms`.
    pub fn schedule_every(&mut self, key: TimerKey, now_ms: f64, interval_ms: f64) {
        let interval = interval_ms.max(1.0);
        self.insert(key, now_ms + interval, Some(interval));
    }

    fn insert(&mut self, key: TimerKey, due_ms: f64, interval_ms: Option<f64>) {
        if self.timers.insert(key, Timer { due_ms, interval_ms }).is_some() {
            log::trace!("timer {:?} rescheduled", key);
        }
    }

    /// Cancel one timer. Returns whether it was pending.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.timers.remove(&key).is_some()
    }

    /// Cancel every pending timer. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.timers.len();
        self.timers.clear();
        n
    }

    pub fn is_pending(&self, key: TimerKey) -> bool {
        self.timers.contains_key(&key)
    }

    /// Collect the timers due at `now_ms`, earliest first.
    /// One-shot timers are removed; periodic timers are rescheduled past `now_ms`.
    pub fn poll(&mut self, now_ms: f64) -> Vec<TimerKey> {
        let mut fired: Vec<(f64, TimerKey)> = self
            .timers
            .iter()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .map(|(k, t)| (t.due_ms, *k))
            .collect();
        fired.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for (_, key) in &fired {
            let reschedule = self.timers.get(key).and_then(|t| t.interval_ms);
            match reschedule {
                Some(interval) => {
                    if let Some(t) = self.timers.get_mut(key) {
                        // Skip missed periods instead of firing a burst.
                        while t.due_ms <= now_ms {
                            t.due_ms += interval;
                        }
                    }
                }
                None => {
                    self.timers.remove(key);
                }
            }
        }
        fired.into_iter().map(|(_, k)| k).collect()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_fires_once() {
        let mut timers = TimerRegistry::new();
        timers.schedule_once(TimerKey::PresenceLoss, 0.0, 3000.0);
        assert!(timers.poll(2999.0).is_empty());
        assert_eq!(timers.poll(3000.0), vec![TimerKey::PresenceLoss]);
        assert!(timers.poll(9000.0).is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn periodic_reschedules_without_burst() {
        let mut timers = TimerRegistry::new();
        timers.schedule_every(TimerKey::Countdown, 0.0, 1000.0);
        assert_eq!(timers.poll(1000.0), vec![TimerKey::Countdown]);
        // A long stall fires once, not three times.
        assert_eq!(timers.poll(4500.0), vec![TimerKey::Countdown]);
        assert!(timers.poll(4900.0).is_empty());
        assert_eq!(timers.poll(5000.0), vec![TimerKey::Countdown]);
    }

    #[test]
    fn rescheduling_a_key_replaces_it() {
        let mut timers = TimerRegistry::new();
        timers.schedule_once(TimerKey::CompletionConfirm, 0.0, 100.0);
        timers.schedule_once(TimerKey::CompletionConfirm, 0.0, 500.0);
        assert_eq!(timers.len(), 1);
        assert!(timers.poll(200.0).is_empty());
        assert_eq!(timers.poll(500.0), vec![TimerKey::CompletionConfirm]);
    }

    #[test]
    fn fired_in_due_order() {
        let mut timers = TimerRegistry::new();
        timers.schedule_once(TimerKey::CompletionDeadline, 0.0, 300.0);
        timers.schedule_once(TimerKey::FallbackLoopGrace, 0.0, 100.0);
        assert_eq!(
            timers.poll(1000.0),
            vec![TimerKey::FallbackLoopGrace, TimerKey::CompletionDeadline]
        );
    }

    #[test]
    fn cancel_all_leaves_nothing() {
        let mut timers = TimerRegistry::new();
        timers.schedule_once(TimerKey::CompletionDeadline, 0.0, 10.0);
        timers.schedule_every(TimerKey::CompletionWatchdog, 0.0, 10.0);
        assert!(timers.cancel(TimerKey::CompletionDeadline));
        assert!(!timers.cancel(TimerKey::CompletionDeadline));
        assert_eq!(timers.cancel_all(), 1);
        assert!(timers.poll(1_000_000.0).is_empty());
    }
}
