//! Ordered lyric timeline with rate-limited forward scanning.
//!
//! `scan` emits at most one entry per tick: an entry is due once playback is within
//! the tolerance window of its time, has not been emitted recently, and the minimum
//! spawn gap since the previous emission has passed. Large backward or forward jumps
//! of the playback position move the cursor by binary search.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

use crate::api::config::SessionConfig;
use crate::assets::song::LyricRecord;

/// One lyric unit. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricEntry {
    pub time: f64,
    pub end_time: Option<f64>,
    pub text: String,
    /// How long the bubble for this entry stays on screen.
    pub display_duration: f64,
}

impl LyricEntry {
    /// Dedup / recently-spawned key.
    fn key(&self) -> String {
        format!("{:.3}|{}", self.time, self.text)
    }
}

/// Why the cursor was moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resync {
    /// Backward jump; already-spawned entries may spawn again.
    Rewind,
    /// Forward jump; entries in between are skipped.
    Skip,
}

#[derive(Debug, Clone, Copy)]
struct ScanSettings {
    tolerance_ms: f64,
    min_gap_ms: f64,
    recent_ttl_ms: f64,
    rewind_ms: f64,
    forward_ms: f64,
    min_display_ms: f64,
}

impl From<&SessionConfig> for ScanSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            tolerance_ms: config.scan_tolerance_ms,
            min_gap_ms: config.min_spawn_gap_ms,
            recent_ttl_ms: config.recent_spawn_ttl_ms,
            rewind_ms: config.rewind_resync_ms,
            forward_ms: config.forward_resync_ms,
            min_display_ms: config.min_display_ms,
        }
    }
}

pub struct LyricTimeline {
    entries: Vec<LyricEntry>,
    cursor: usize,
    /// key -> playback position it was emitted at.
    recent: HashMap<String, f64>,
    last_spawn_at: Option<f64>,
    last_position: Option<f64>,
    settings: ScanSettings,
}

impl LyricTimeline {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            recent: HashMap::new(),
            last_spawn_at: None,
            last_position: None,
            settings: ScanSettings::from(config),
        }
    }

    /// Replace the timeline. Malformed records are skipped individually.
    /// Returns the number of entries kept after dedup.
    pub fn load(&mut self, records: impl IntoIterator<Item = LyricRecord>) -> usize {
        self.load_counting(records, 0)
    }

    /// Like [`load`](Self::load), with `rejected` elements already dropped by
    /// the parser counted toward the malformed total.
    pub fn load_counting(
        &mut self,
        records: impl IntoIterator<Item = LyricRecord>,
        rejected: usize,
    ) -> usize {
        let mut seen = HashMap::new();
        let mut entries = Vec::new();
        let mut skipped = rejected;

        for record in records {
            let Some(entry) = self.normalize(record) else {
                skipped += 1;
                continue;
            };
            if seen.insert(entry.key(), ()).is_some() {
                log::debug!("timeline: duplicate {:?} at {}ms dropped", entry.text, entry.time);
                continue;
            }
            entries.push(entry);
        }
        entries.sort_by(|a, b| a.time.total_cmp(&b.time));

        if skipped > 0 {
            log::warn!("timeline: skipped {} malformed lyric entries", skipped);
        }
        log::info!("timeline: {} entries loaded", entries.len());

        self.entries = entries;
        self.reset_cursor();
        self.entries.len()
    }

    fn normalize(&self, record: LyricRecord) -> Option<LyricEntry> {
        if !record.time.is_finite() || record.time < 0.0 {
            return None;
        }
        let text: String = record.text.trim().nfc().collect();
        if text.is_empty() {
            return None;
        }
        let end_time = record.end_time.filter(|e| e.is_finite() && *e > record.time);
        let display_duration = record
            .display_duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .or_else(|| end_time.map(|e| e - record.time))
            .unwrap_or(self.settings.min_display_ms)
            .max(self.settings.min_display_ms);
        Some(LyricEntry {
            time: record.time,
            end_time,
            text,
            display_duration,
        })
    }

    /// Emit the next due entry, if any. At most one per call.
    pub fn scan(&mut self, position_ms: f64) -> Option<&LyricEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.detect_jump(position_ms);

        let ttl = self.settings.recent_ttl_ms;
        self.recent.retain(|_, at| (position_ms - *at).abs() <= ttl);

        let tol = self.settings.tolerance_ms;
        while let Some(entry) = self.entries.get(self.cursor) {
            if entry.time > position_ms + tol {
                break;
            }
            if entry.time < position_ms - tol {
                log::debug!("timeline: {:?} at {}ms passed unspawned", entry.text, entry.time);
                self.cursor += 1;
                continue;
            }
            let key = entry.key();
            if self.recent.contains_key(&key) {
                self.cursor += 1;
                continue;
            }
            if let Some(last) = self.last_spawn_at {
                if position_ms - last < self.settings.min_gap_ms {
                    break;
                }
            }
            self.recent.insert(key, position_ms);
            self.last_spawn_at = Some(position_ms);
            self.cursor += 1;
            return self.entries.get(self.cursor - 1);
        }
        None
    }

    fn detect_jump(&mut self, position_ms: f64) {
        let last = self.last_position.unwrap_or(0.0);
        self.last_position = Some(position_ms);
        if position_ms < last - self.settings.rewind_ms {
            self.resync(position_ms, Resync::Rewind);
        } else if position_ms > last + self.settings.forward_ms {
            self.resync(position_ms, Resync::Skip);
        }
    }

    fn resync(&mut self, position_ms: f64, kind: Resync) {
        let next = self.entries.partition_point(|e| e.time <= position_ms);
        self.cursor = next.saturating_sub(1);
        if kind == Resync::Rewind {
            self.recent.clear();
            self.last_spawn_at = None;
        }
        self.last_position = Some(position_ms);
        log::debug!("timeline: {:?} to {:.0}ms, cursor {}", kind, position_ms, self.cursor);
    }

    /// Explicit seek: move the cursor and forget what was spawned.
    pub fn resync_to(&mut self, position_ms: f64) {
        self.resync(position_ms, Resync::Rewind);
    }

    /// Back to the start, as after a restart.
    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
        self.recent.clear();
        self.last_spawn_at = None;
        self.last_position = None;
    }

    /// Every entry has been passed.
    pub fn is_exhausted(&self) -> bool {
        !self.entries.is_empty() && self.cursor >= self.entries.len()
    }

    /// Playback time at which the last bubble would expire.
    pub fn end_ms(&self) -> Option<f64> {
        self.entries
            .iter()
            .map(|e| e.time + e.display_duration)
            .max_by(|a, b| a.total_cmp(b))
    }

    pub fn entries(&self) -> &[LyricEntry] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(time: f64, text: &str) -> LyricRecord {
        LyricRecord {
            time,
            end_time: None,
            text: text.to_string(),
            display_duration: Some(2000.0),
        }
    }

    fn timeline(records: Vec<LyricRecord>) -> LyricTimeline {
        let mut t = LyricTimeline::new(&SessionConfig::default());
        t.load(records);
        t
    }

    /// Advance from `from` to `to` in `step` increments, collecting emitted times.
    fn play(t: &mut LyricTimeline, from: f64, to: f64, step: f64) -> Vec<f64> {
        let mut out = Vec::new();
        let mut pos = from;
        while pos <= to {
            if let Some(e) = t.scan(pos) {
                out.push(e.time);
            }
            pos += step;
        }
        out
    }

    #[test]
    fn load_dedups_sorts_and_skips_bad_entries() {
        let t = timeline(vec![
            record(300.0, "c"),
            record(100.0, "x"),
            record(100.0, "x"),
            record(-120.0, "pickup"),
            record(200.0, "   "),
            record(200.0, "b"),
        ]);
        let times: Vec<f64> = t.entries().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn text_is_nfc_normalized_before_dedup() {
        // "é" precomposed vs "e" + combining acute
        let t = timeline(vec![record(100.0, "caf\u{e9}"), record(100.0, "cafe\u{301}")]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.entries()[0].text, "caf\u{e9}");
    }

    #[test]
    fn display_duration_falls_back_to_end_time_then_minimum() {
        let mut t = LyricTimeline::new(&SessionConfig::default());
        t.load(vec![
            LyricRecord { time: 0.0, end_time: Some(4000.0), text: "long".into(), display_duration: None },
            LyricRecord { time: 10.0, end_time: Some(100.0), text: "short".into(), display_duration: None },
            LyricRecord { time: 20.0, end_time: None, text: "bare".into(), display_duration: None },
        ]);
        let d: Vec<f64> = t.entries().iter().map(|e| e.display_duration).collect();
        assert_eq!(d, vec![4000.0, 1500.0, 1500.0]);
    }

    #[test]
    fn empty_timeline_is_a_no_op() {
        let mut t = timeline(vec![]);
        assert!(t.scan(1000.0).is_none());
        assert!(!t.is_exhausted());
    }

    #[test]
    fn before_first_entry_cursor_stays() {
        let mut t = timeline(vec![record(5000.0, "a")]);
        assert!(t.scan(100.0).is_none());
        assert_eq!(t.cursor(), 0);
    }

    #[test]
    fn emits_within_tolerance_window() {
        let mut t = timeline(vec![record(1000.0, "a")]);
        assert!(t.scan(700.0).is_none());
        assert_eq!(t.scan(800.0).map(|e| e.time), Some(1000.0));
        assert!(t.is_exhausted());
        assert!(t.scan(900.0).is_none());
    }

    #[test]
    fn entry_closer_than_spawn_gap_is_dropped() {
        let mut t = timeline(vec![record(1000.0, "a"), record(1100.0, "b"), record(1600.0, "c")]);
        assert_eq!(t.scan(1000.0).map(|e| e.time), Some(1000.0));
        // The gap never elapses inside "b"'s window, so "b" is passed over for good.
        for pos in [1100.0, 1200.0, 1299.0, 1300.0, 1301.0, 1400.0] {
            assert!(t.scan(pos).is_none(), "emitted at {pos}");
        }
        assert_eq!(t.scan(1600.0).map(|e| e.text.as_str()), Some("c"));
        assert!(t.scan(2500.0).is_none());
    }

    #[test]
    fn gap_passes_inside_window() {
        let mut t = timeline(vec![record(1000.0, "a"), record(1300.0, "b")]);
        assert_eq!(t.scan(1000.0).map(|e| e.time), Some(1000.0));
        assert!(t.scan(1200.0).is_none());
        assert_eq!(t.scan(1350.0).map(|e| e.time), Some(1300.0));
    }

    #[test]
    fn burst_after_stall_is_rate_limited() {
        let mut t = timeline(vec![
            record(1000.0, "a"),
            record(1050.0, "b"),
            record(1100.0, "c"),
        ]);
        // One tick with everything due emits a single entry.
        assert!(t.scan(1100.0).is_some());
        assert_eq!(t.cursor(), 1);
    }

    #[test]
    fn stale_entries_are_passed_over() {
        let mut t = timeline(vec![record(1000.0, "a"), record(1500.0, "b")]);
        // "a" is more than 200ms behind; "b" is not due yet.
        assert!(t.scan(1250.0).is_none());
        assert_eq!(t.cursor(), 1);
        assert_eq!(t.scan(1400.0).map(|e| e.time), Some(1500.0));
    }

    #[test]
    fn rewind_allows_replay_without_early_duplicates() {
        let mut t = timeline(vec![record(100.0, "intro"), record(4000.0, "x")]);
        assert_eq!(play(&mut t, 0.0, 5000.0, 50.0), vec![100.0, 4000.0]);

        // Rewind to 500: the intro is behind the window and must not respawn.
        assert!(t.scan(500.0).is_none());
        assert_eq!(play(&mut t, 550.0, 4200.0, 50.0), vec![4000.0]);
    }

    #[test]
    fn forward_skip_moves_cursor_without_clearing_recent() {
        let mut t = timeline(vec![
            record(1000.0, "a"),
            record(2000.0, "b"),
            record(9000.0, "c"),
        ]);
        assert!(t.scan(1000.0).is_some());
        // Jump straight past "b".
        assert!(t.scan(8900.0).is_some());
        assert!(t.is_exhausted());
    }

    #[test]
    fn after_last_entry_scanning_is_terminal() {
        let mut t = timeline(vec![record(100.0, "a")]);
        play(&mut t, 0.0, 1000.0, 16.0);
        assert!(t.is_exhausted());
        assert!(t.scan(2000.0).is_none());
        assert_eq!(t.end_ms(), Some(2100.0));
    }

    #[test]
    fn resync_to_replays_from_position() {
        let mut t = timeline(vec![record(1000.0, "a"), record(2000.0, "b")]);
        play(&mut t, 0.0, 2500.0, 20.0);
        t.resync_to(900.0);
        assert_eq!(play(&mut t, 900.0, 2500.0, 20.0), vec![1000.0, 2000.0]);
    }

    proptest! {
        #[test]
        fn every_entry_spawns_once_at_any_frame_rate(
            gaps in proptest::collection::vec(500.0f64..3000.0, 1..40),
            frame in 5.0f64..60.0,
        ) {
            let mut time: f64 = 1000.0;
            let mut records = Vec::new();
            for (i, gap) in gaps.iter().enumerate() {
                records.push(record(time.round(), &format!("w{i}")));
                time += gap;
            }
            let n = records.len();
            let mut t = timeline(records);
            let spawned = play(&mut t, 0.0, time + 1000.0, frame);
            prop_assert_eq!(spawned.len(), n);
        }
    }
}
