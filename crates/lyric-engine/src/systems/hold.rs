//! Hold-to-catch scoring.
//!
//! A bubble fills while at least one source holds it. Score is credited per tick
//! for newly covered progress only, so the sum of credits for one bubble never
//! exceeds its per-hit value no matter how often it is dropped and re-held.

use std::collections::HashMap;

use crate::api::config::SessionConfig;
use crate::api::types::{BubbleId, HoldSource};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoldState {
    /// 0..=1
    pub progress: f64,
    /// High-water mark of credited progress.
    pub scored_progress: f64,
    pub pointer_holding: bool,
    pub auto_holding: bool,
    pub is_complete: bool,
}

impl HoldState {
    pub fn is_held(&self) -> bool {
        self.pointer_holding || self.auto_holding
    }
}

/// Running score for the session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionScore {
    pub score: f64,
    pub combo: u32,
    pub max_combo: u32,
    pub hits: u32,
    pub misses: u32,
}

pub struct HoldScoringEngine {
    holds: HashMap<BubbleId, HoldState>,
    pointer_target: Option<BubbleId>,
    score: SessionScore,
    total_notes: u32,
    max_score: f64,
    duration_ms: f64,
}

impl HoldScoringEngine {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            holds: HashMap::new(),
            pointer_target: None,
            score: SessionScore::default(),
            total_notes: 0,
            max_score: config.max_score,
            duration_ms: config.hold_duration_ms.max(1.0),
        }
    }

    /// Number of notes in the loaded timeline. Fixes the per-hit value.
    pub fn set_total_notes(&mut self, total: u32) {
        self.total_notes = total;
    }

    pub fn total_notes(&self) -> u32 {
        self.total_notes
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    pub fn per_hit_value(&self) -> f64 {
        if self.total_notes == 0 {
            0.0
        } else {
            self.max_score / self.total_notes as f64
        }
    }

    /// Start tracking a freshly spawned bubble.
    pub fn track(&mut self, id: BubbleId) {
        self.holds.entry(id).or_default();
    }

    /// Begin (or keep) holding `id`. Returns false for unknown or completed bubbles.
    ///
    /// A pointer hold on a new target drops the previous pointer target, which
    /// loses its progress unless it already completed.
    pub fn start_hold(&mut self, id: BubbleId, source: HoldSource) -> bool {
        match self.holds.get(&id) {
            Some(state) if !state.is_complete => {}
            _ => return false,
        }
        if source == HoldSource::Pointer && self.pointer_target != Some(id) {
            if let Some(prev) = self.pointer_target.take() {
                self.drop_pointer_target(prev);
            }
            self.pointer_target = Some(id);
        }
        let Some(state) = self.holds.get_mut(&id) else {
            return false;
        };
        match source {
            HoldSource::Pointer => state.pointer_holding = true,
            HoldSource::Auto => state.auto_holding = true,
        }
        true
    }

    fn drop_pointer_target(&mut self, id: BubbleId) {
        if let Some(state) = self.holds.get_mut(&id) {
            state.pointer_holding = false;
            if !state.is_complete {
                state.progress = 0.0;
            }
        }
    }

    /// Stop one source holding `id`. Progress is kept. No-op if that source was not holding.
    pub fn stop_hold(&mut self, id: BubbleId, source: HoldSource) {
        if source == HoldSource::Pointer && self.pointer_target == Some(id) {
            self.pointer_target = None;
        }
        if let Some(state) = self.holds.get_mut(&id) {
            match source {
                HoldSource::Pointer => state.pointer_holding = false,
                HoldSource::Auto => state.auto_holding = false,
            }
        }
    }

    /// Pointer released or moved off every bubble.
    pub fn release_pointer(&mut self) {
        if let Some(id) = self.pointer_target {
            self.stop_hold(id, HoldSource::Pointer);
        }
    }

    /// Bubbles currently held by an auto source.
    pub fn auto_held(&self) -> Vec<BubbleId> {
        let mut ids: Vec<BubbleId> = self
            .holds
            .iter()
            .filter(|(_, s)| s.auto_holding)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Advance every held bubble by `delta_ms` of playback. Returns bubbles completed this tick.
    pub fn tick(&mut self, delta_ms: f64) -> Vec<BubbleId> {
        let mut completed = Vec::new();
        if delta_ms.is_nan() || delta_ms <= 0.0 {
            return completed;
        }
        let step = delta_ms / self.duration_ms;
        let per_hit = self.per_hit_value();

        let mut held: Vec<BubbleId> = self
            .holds
            .iter()
            .filter(|(_, s)| s.is_held() && !s.is_complete)
            .map(|(id, _)| *id)
            .collect();
        held.sort();

        for id in held {
            let Some(state) = self.holds.get_mut(&id) else {
                continue;
            };
            let next = (state.progress + step).min(1.0);
            let award = (next - state.scored_progress).max(0.0) * per_hit;
            state.progress = next;
            state.scored_progress = state.scored_progress.max(next);
            self.score.score = (self.score.score + award).min(self.max_score);

            if next >= 1.0 {
                state.is_complete = true;
                state.pointer_holding = false;
                state.auto_holding = false;
                if self.pointer_target == Some(id) {
                    self.pointer_target = None;
                }
                self.on_hit();
                completed.push(id);
            }
        }
        completed
    }

    fn on_hit(&mut self) {
        self.score.hits += 1;
        self.score.combo += 1;
        self.score.max_combo = self.score.max_combo.max(self.score.combo);
        if self.total_notes > 0 && self.score.combo == self.total_notes {
            // Rounding from fractional per-hit values.
            self.score.score = self.max_score;
        }
    }

    /// An uncaught bubble expired.
    pub fn on_miss(&mut self, id: BubbleId) {
        self.remove(id);
        self.score.misses += 1;
        if self.score.combo > 0 {
            log::debug!("hold: combo {} broken by {:?}", self.score.combo, id);
        }
        self.score.combo = 0;
    }

    /// Forget a bubble without scoring consequences.
    pub fn remove(&mut self, id: BubbleId) {
        self.holds.remove(&id);
        if self.pointer_target == Some(id) {
            self.pointer_target = None;
        }
    }

    /// Forget every bubble, keeping the score.
    pub fn clear_holds(&mut self) {
        self.holds.clear();
        self.pointer_target = None;
    }

    /// Back to a fresh session with the same note count.
    pub fn reset(&mut self) {
        self.clear_holds();
        self.score = SessionScore::default();
    }

    pub fn get(&self, id: BubbleId) -> Option<&HoldState> {
        self.holds.get(&id)
    }

    pub fn progress(&self, id: BubbleId) -> f32 {
        self.holds.get(&id).map_or(0.0, |s| s.progress as f32)
    }

    pub fn pointer_target(&self) -> Option<BubbleId> {
        self.pointer_target
    }

    pub fn score(&self) -> &SessionScore {
        &self.score
    }

    /// Every note caught without a miss.
    pub fn is_full_combo(&self) -> bool {
        self.total_notes > 0 && self.score.combo == self.total_notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine(total: u32) -> HoldScoringEngine {
        let mut e = HoldScoringEngine::new(&SessionConfig::default());
        e.set_total_notes(total);
        e
    }

    #[test]
    fn full_hold_credits_exactly_one_hit() {
        let mut e = engine(4);
        e.track(BubbleId(1));
        e.start_hold(BubbleId(1), HoldSource::Pointer);
        let mut done = Vec::new();
        for delta in [16.0, 17.0, 250.0, 333.0, 120.0, 400.0] {
            done.extend(e.tick(delta));
        }
        assert_eq!(done, vec![BubbleId(1)]);
        assert!((e.score().score - 250_000.0).abs() < 1e-6);
        assert_eq!(e.score().combo, 1);
        assert!(e.get(BubbleId(1)).unwrap().is_complete);
    }

    #[test]
    fn two_sources_do_not_double_accumulate() {
        let mut e = engine(1);
        e.track(BubbleId(1));
        e.start_hold(BubbleId(1), HoldSource::Pointer);
        e.start_hold(BubbleId(1), HoldSource::Auto);
        e.tick(250.0);
        assert!((e.get(BubbleId(1)).unwrap().progress - 0.25).abs() < 1e-9);
    }

    #[test]
    fn hold_calls_are_idempotent() {
        let mut e = engine(1);
        e.track(BubbleId(1));
        e.stop_hold(BubbleId(1), HoldSource::Auto);
        assert_eq!(e.get(BubbleId(1)), Some(&HoldState::default()));

        e.start_hold(BubbleId(1), HoldSource::Auto);
        let once = *e.get(BubbleId(1)).unwrap();
        e.start_hold(BubbleId(1), HoldSource::Auto);
        assert_eq!(e.get(BubbleId(1)), Some(&once));
    }

    #[test]
    fn unknown_or_complete_bubbles_cannot_be_held() {
        let mut e = engine(1);
        assert!(!e.start_hold(BubbleId(9), HoldSource::Pointer));
        e.track(BubbleId(1));
        e.start_hold(BubbleId(1), HoldSource::Auto);
        e.tick(1000.0);
        assert!(!e.start_hold(BubbleId(1), HoldSource::Auto));
    }

    #[test]
    fn stop_hold_pauses_progress() {
        let mut e = engine(2);
        e.track(BubbleId(1));
        e.start_hold(BubbleId(1), HoldSource::Pointer);
        e.tick(400.0);
        e.stop_hold(BubbleId(1), HoldSource::Pointer);
        e.tick(400.0);
        assert!((e.get(BubbleId(1)).unwrap().progress - 0.4).abs() < 1e-9);
        assert_eq!(e.pointer_target(), None);
    }

    #[test]
    fn switching_pointer_target_resets_previous() {
        let mut e = engine(2);
        e.track(BubbleId(1));
        e.track(BubbleId(2));
        e.start_hold(BubbleId(1), HoldSource::Pointer);
        e.tick(500.0);
        let after_first = e.score().score;

        e.start_hold(BubbleId(2), HoldSource::Pointer);
        assert_eq!(e.pointer_target(), Some(BubbleId(2)));
        let first = e.get(BubbleId(1)).unwrap();
        assert!(!first.pointer_holding);
        assert_eq!(first.progress, 0.0);

        // Re-holding the first bubble must not re-award already credited progress.
        e.start_hold(BubbleId(1), HoldSource::Pointer);
        e.tick(500.0);
        assert!((e.score().score - after_first).abs() < 1e-6);
    }

    #[test]
    fn auto_holds_many_bubbles() {
        let mut e = engine(2);
        e.track(BubbleId(1));
        e.track(BubbleId(2));
        e.start_hold(BubbleId(1), HoldSource::Auto);
        e.start_hold(BubbleId(2), HoldSource::Auto);
        assert_eq!(e.auto_held(), vec![BubbleId(1), BubbleId(2)]);
        let done = e.tick(1000.0);
        assert_eq!(done, vec![BubbleId(1), BubbleId(2)]);
        assert_eq!(e.score().combo, 2);
    }

    #[test]
    fn full_combo_lands_on_max_score() {
        let mut e = engine(3);
        for i in 1..=3 {
            e.track(BubbleId(i));
            e.start_hold(BubbleId(i), HoldSource::Auto);
            for _ in 0..7 {
                e.tick(1000.0 / 7.0);
            }
            e.tick(1.0);
        }
        assert!(e.is_full_combo());
        assert_eq!(e.score().score, 1_000_000.0);
    }

    #[test]
    fn miss_breaks_combo() {
        let mut e = engine(3);
        e.track(BubbleId(1));
        e.start_hold(BubbleId(1), HoldSource::Auto);
        e.tick(1000.0);
        e.track(BubbleId(2));
        e.on_miss(BubbleId(2));
        assert_eq!(e.score().combo, 0);
        assert_eq!(e.score().max_combo, 1);
        assert_eq!(e.score().misses, 1);
        assert!(e.get(BubbleId(2)).is_none());
    }

    proptest! {
        #[test]
        fn per_bubble_credit_is_bounded(deltas in prop::collection::vec((1.0f64..300.0, any::<bool>()), 1..80)) {
            let mut e = engine(5);
            e.track(BubbleId(1));
            e.track(BubbleId(2));
            for (delta, on_first) in deltas {
                let id = if on_first { BubbleId(1) } else { BubbleId(2) };
                e.start_hold(id, HoldSource::Pointer);
                e.tick(delta);
            }
            let per_hit = e.per_hit_value();
            prop_assert!(e.score().score <= 2.0 * per_hit + 1e-6);
            let expected: f64 = [BubbleId(1), BubbleId(2)]
                .iter()
                .map(|id| e.get(*id).unwrap().scored_progress * per_hit)
                .sum();
            prop_assert!((e.score().score - expected).abs() < 1e-6);
        }
    }
}
