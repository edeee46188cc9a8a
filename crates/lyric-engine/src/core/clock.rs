/// Where the current playback position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// The external timed player's own position.
    External,
    /// Elapsed time of the player's underlying media element.
    MediaElement,
    /// Internal wall clock (offline / fallback mode).
    FallbackClock,
}

/// What the host last reported about the external timed player.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerSnapshot {
    /// Player library loaded and the song is ready to play.
    pub ready: bool,
    /// Player-reported position, if it gave one.
    pub position_ms: Option<f64>,
    /// Underlying media element's elapsed time, if available.
    pub media_elapsed_ms: Option<f64>,
    pub paused: bool,
    /// Song duration, once known.
    pub duration_ms: Option<f64>,
}

/// Exclusively owned by [`PlaybackClock`], mutated only in `tick`/`resync`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub position_ms: f64,
    pub source: ClockSource,
    /// Raw value of the most recent valid read, before clamping.
    pub last_observed_ms: f64,
}

/// Result of one clock tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReading {
    pub position_ms: f64,
    pub source: ClockSource,
    /// Position jumped backwards because of an external seek.
    pub resynced: bool,
}

/// Derives a monotonically non-decreasing playback position.
///
/// Between two ticks without a resync, the position never decreases. Small backward
/// reads (player jitter) are held at the cached value; backward reads larger than
/// the seek threshold are treated as an external seek and reported as a resync.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    state: PlaybackState,
    player: Option<PlayerSnapshot>,
    /// Wall-clock origin of the fallback timeline, when fallback mode is active.
    fallback_start_ms: Option<f64>,
    /// Fallback position frozen while paused.
    fallback_paused_at: Option<f64>,
    seek_threshold_ms: f64,
}

impl PlaybackClock {
    pub fn new(seek_threshold_ms: f64) -> Self {
        Self {
            state: PlaybackState {
                position_ms: 0.0,
                source: ClockSource::External,
                last_observed_ms: 0.0,
            },
            player: None,
            fallback_start_ms: None,
            fallback_paused_at: None,
            seek_threshold_ms,
        }
    }

    /// Record the latest player report. Call before `tick`.
    pub fn observe(&mut self, snapshot: PlayerSnapshot) {
        self.player = Some(snapshot);
    }

    /// Forget the external player (library missing or torn down).
    pub fn detach_player(&mut self) {
        self.player = None;
    }

    pub fn player(&self) -> Option<&PlayerSnapshot> {
        self.player.as_ref()
    }

    /// Switch to the internal wall clock, continuing from the current position.
    pub fn enter_fallback(&mut self, now_ms: f64) {
        if self.fallback_start_ms.is_none() {
            self.fallback_start_ms = Some(now_ms - self.state.position_ms);
            self.fallback_paused_at = None;
            self.state.source = ClockSource::FallbackClock;
            log::info!("playback clock: fallback mode at {:.0}ms", self.state.position_ms);
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_start_ms.is_some()
    }

    /// Freeze the fallback timeline. No effect on external sources.
    pub fn pause_fallback(&mut self, now_ms: f64) {
        if let Some(start) = self.fallback_start_ms {
            if self.fallback_paused_at.is_none() {
                self.fallback_paused_at = Some(now_ms - start);
            }
        }
    }

    /// Resume a frozen fallback timeline where it stopped.
    pub fn resume_fallback(&mut self, now_ms: f64) {
        if let Some(paused) = self.fallback_paused_at.take() {
            self.fallback_start_ms = Some(now_ms - paused);
        }
    }

    /// Explicit seek/restart: position back to zero, fallback origin at `now_ms`.
    pub fn resync(&mut self, now_ms: f64) {
        if self.fallback_start_ms.is_some() {
            self.fallback_start_ms = Some(now_ms);
            if self.fallback_paused_at.is_some() {
                self.fallback_paused_at = Some(0.0);
            }
        }
        self.state.position_ms = 0.0;
        self.state.last_observed_ms = 0.0;
    }

    /// Advance the clock. Never fails: an unusable read yields the last good position.
    pub fn tick(&mut self, now_ms: f64) -> ClockReading {
        let Some((raw, source)) = self.read(now_ms) else {
            return self.reading(false);
        };
        self.state.last_observed_ms = raw;
        self.state.source = source;

        if raw >= self.state.position_ms {
            self.state.position_ms = raw;
            return self.reading(false);
        }
        if self.state.position_ms - raw > self.seek_threshold_ms {
            log::debug!(
                "playback clock: seek {:.0}ms -> {:.0}ms",
                self.state.position_ms,
                raw
            );
            self.state.position_ms = raw;
            return self.reading(true);
        }
        // Jitter: hold the cached position.
        self.reading(false)
    }

    fn read(&self, now_ms: f64) -> Option<(f64, ClockSource)> {
        if let Some(start) = self.fallback_start_ms {
            let pos = self.fallback_paused_at.unwrap_or(now_ms - start);
            return valid(pos).map(|p| (p, ClockSource::FallbackClock));
        }
        let player = self.player.as_ref().filter(|p| p.ready)?;
        if let Some(pos) = player.position_ms.and_then(valid).filter(|p| *p > 0.0) {
            return Some((pos, ClockSource::External));
        }
        if !player.paused {
            // The player timer stalls in some browsers; the media element keeps going.
            if let Some(pos) = player.media_elapsed_ms.and_then(valid).filter(|p| *p > 0.0) {
                return Some((pos, ClockSource::MediaElement));
            }
        }
        None
    }

    fn reading(&self, resynced: bool) -> ClockReading {
        ClockReading {
            position_ms: self.state.position_ms,
            source: self.state.source,
            resynced,
        }
    }

    pub fn position_ms(&self) -> f64 {
        self.state.position_ms
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Song duration as last reported by the player.
    pub fn duration_ms(&self) -> Option<f64> {
        self.player.and_then(|p| p.duration_ms).and_then(valid).filter(|d| *d > 0.0)
    }
}

fn valid(ms: f64) -> Option<f64> {
    (ms.is_finite() && ms >= 0.0).then_some(ms)
}
