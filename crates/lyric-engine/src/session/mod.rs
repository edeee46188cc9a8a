//! One play session: the per-frame game loop and every entry point the host calls.
//!
//! Frame order: timers, playback clock, lyric scan, hold refresh and scoring,
//! expiry, bubble motion and bounds. Everything runs on the host's single thread;
//! host input is queued and applied at the start of the next frame.

pub mod result;

use glam::Vec2;

use crate::api::config::SessionContext;
use crate::api::types::{BubbleId, EventKind, GameEvent, GameMode, HoldSource};
use crate::api::vfx::{NullVfx, VfxSink};
use crate::assets::song::{parse_lyrics, LyricRecord};
use crate::core::clock::{PlaybackClock, PlayerSnapshot};
use crate::core::control::{ControlOp, PlaybackControl};
use crate::core::timers::{TimerKey, TimerRegistry};
use crate::error::{ConfigError, ControlError};
use crate::input::landmark::{Landmark, LandmarkKind};
use crate::input::pointer::{
    FaceLandmarks, HandLandmarks, MousePointer, PointerLikeSource, PointerSample, PoseLandmarks,
    SampleSpace,
};
use crate::input::queue::{HostCommand, InputEvent, InputQueue};
use crate::systems::bubbles::{BubbleLifecycleManager, SpawnOutcome};
use crate::systems::completion::{CompletionReason, SessionCompletionArbiter};
use crate::systems::hold::{HoldScoringEngine, SessionScore};
use crate::systems::presence::{PresenceGate, PresenceSignal};
use crate::timeline::lyrics::LyricTimeline;

use self::result::SessionResult;

/// Where the session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for playback to start.
    Idle,
    Playing,
    Paused,
    /// Completion latched; results are available.
    Finished,
    /// Cleaned up; every entry point is a no-op.
    TornDown,
}

pub struct GameSession<V: VfxSink = NullVfx> {
    ctx: SessionContext,
    clock: PlaybackClock,
    timeline: LyricTimeline,
    bubbles: BubbleLifecycleManager,
    hold: HoldScoringEngine,
    gate: PresenceGate,
    arbiter: SessionCompletionArbiter,
    timers: TimerRegistry,
    control: PlaybackControl,
    vfx: V,
    events: Vec<GameEvent>,
    mouse: MousePointer,
    hands: HandLandmarks,
    face: FaceLandmarks,
    pose: PoseLandmarks,
    samples: Vec<PointerSample>,
    phase: SessionPhase,
    now_ms: f64,
    last_position_ms: f64,
    reported: Option<(u32, u32)>,
    result: Option<SessionResult>,
}

impl GameSession<NullVfx> {
    /// A session that renders nothing.
    pub fn headless(ctx: SessionContext) -> Self {
        Self::new(ctx, NullVfx)
    }
}

impl<V: VfxSink> GameSession<V> {
    pub fn new(ctx: SessionContext, vfx: V) -> Self {
        let config = &ctx.config;
        let gate = if ctx.mode.uses_presence_gate() {
            PresenceGate::new(config)
        } else {
            PresenceGate::disabled(config)
        };
        log::info!(
            "session: {} mode, song {:?} by {:?}",
            ctx.mode.as_str(),
            ctx.song.title,
            ctx.song.artist
        );
        Self {
            clock: PlaybackClock::new(config.rewind_resync_ms),
            timeline: LyricTimeline::new(config),
            bubbles: BubbleLifecycleManager::new(config),
            hold: HoldScoringEngine::new(config),
            gate,
            arbiter: SessionCompletionArbiter::new(config, ctx.mode),
            timers: TimerRegistry::new(),
            control: PlaybackControl::new(),
            vfx,
            events: Vec::with_capacity(config.max_frame_events),
            mouse: MousePointer::new(),
            hands: HandLandmarks::default(),
            face: FaceLandmarks::new(config.mouth_open_ratio),
            pose: PoseLandmarks::new(config.visibility_threshold),
            samples: Vec::new(),
            phase: SessionPhase::Idle,
            now_ms: 0.0,
            last_position_ms: 0.0,
            reported: None,
            result: None,
            ctx,
        }
    }

    // ---- Loading ----

    /// Replace the lyric timeline. Returns the number of notes kept.
    pub fn load_lyrics(&mut self, records: impl IntoIterator<Item = LyricRecord>) -> usize {
        let kept = self.timeline.load(records);
        self.notes_loaded(kept)
    }

    /// Load a lyric source document. Bad elements are skipped; only a
    /// document that is not a JSON array is an error.
    pub fn load_lyrics_json(&mut self, json: &str) -> Result<usize, ConfigError> {
        let source = parse_lyrics(json)?;
        let kept = self.timeline.load_counting(source.records, source.rejected);
        Ok(self.notes_loaded(kept))
    }

    fn notes_loaded(&mut self, kept: usize) -> usize {
        self.hold.set_total_notes(kept as u32);
        log::info!("session: {} notes loaded", kept);
        kept
    }

    // ---- Frame ----

    /// Run one frame: clear last frame's events, apply queued input, then tick.
    pub fn update(&mut self, now_ms: f64, input: &mut InputQueue) {
        self.events.clear();
        self.now_ms = now_ms;
        for event in input.drain() {
            self.handle_input(event);
        }
        self.tick(now_ms);
    }

    /// Advance the game loop to wall-clock time `now_ms`.
    pub fn tick(&mut self, now_ms: f64) {
        if self.phase == SessionPhase::TornDown {
            return;
        }
        self.now_ms = now_ms;

        for key in self.timers.poll(now_ms) {
            self.on_timer(key);
        }

        let reading = self.clock.tick(now_ms);
        let position = reading.position_ms;
        self.vfx.begin_frame(position);

        if self.phase == SessionPhase::Finished {
            return;
        }

        if reading.resynced {
            self.on_seek(position);
        }
        let delta_ms = if reading.resynced {
            0.0
        } else {
            (position - self.last_position_ms).max(0.0)
        };
        self.last_position_ms = position;

        let suspended = self.gate.is_suspending();
        if self.phase == SessionPhase::Playing && !suspended {
            if let Some(entry) = self.timeline.scan(position).cloned() {
                let outcome = self.bubbles.spawn(&entry, position);
                self.on_spawn(outcome);
            }
        }

        self.refresh_holds();
        if !suspended {
            for id in self.hold.tick(delta_ms) {
                self.on_hit(id);
            }
        }

        for id in self.bubbles.expire(position) {
            self.hold.on_miss(id);
            self.emit(EventKind::BubbleMissed, id.0 as f32, 0.0, 0.0);
            self.emit(EventKind::BubbleReleased, id.0 as f32, 0.0, 0.0);
        }

        let hold = &self.hold;
        self.bubbles
            .advance((delta_ms / 1000.0) as f32, position, |id| hold.progress(id));
        self.bubbles.refresh_bounds(&mut self.vfx);

        if self.phase == SessionPhase::Playing
            && self.clock.is_fallback()
            && self.timeline.is_exhausted()
            && self.bubbles.active_count() == 0
        {
            self.arbiter.schedule_fallback_loop(now_ms, &mut self.timers);
        }

        self.report_score();
    }

    // ---- Input ----

    pub fn handle_input(&mut self, event: InputEvent) {
        if self.phase == SessionPhase::TornDown {
            return;
        }
        match event {
            InputEvent::PointerDown { .. }
            | InputEvent::PointerUp { .. }
            | InputEvent::PointerMove { .. } => {
                self.mouse.apply(&event);
            }
            InputEvent::Landmarks { kind, points } => self.evaluate_landmarks(kind, &points),
            InputEvent::Command(cmd) => self.handle_command(cmd),
        }
    }

    fn handle_command(&mut self, cmd: HostCommand) {
        match cmd {
            HostCommand::Request(op) => {
                self.request(op);
            }
            HostCommand::Settled { op, error } => {
                let result = error.map_or(Ok(()), |msg| Err(ControlError::Rejected(msg)));
                self.control_settled(op, result);
            }
            HostCommand::PlayerState(snapshot) => self.observe_player(snapshot),
            HostCommand::PlayerFinished => {
                self.on_finish_event();
            }
            HostCommand::PlayerUnavailable => self.player_unavailable(),
            HostCommand::SuppressPresence => self.suppress_presence(),
        }
    }

    /// Feed one frame of vision output: presence gate, avatar, and auto-hold sources.
    pub fn evaluate_landmarks(&mut self, kind: LandmarkKind, points: &[Landmark]) {
        match kind {
            LandmarkKind::Pose => {
                self.vfx.update_player_avatar(points);
                if self.phase != SessionPhase::Finished {
                    let signals = self.gate.evaluate(points, self.now_ms, &mut self.timers);
                    self.apply_presence(signals);
                }
                self.pose.update(points);
            }
            LandmarkKind::Hands => self.hands.update(points),
            LandmarkKind::Face => self.face.update(points),
        }
    }

    /// Topmost bubble under a probe circle at world (x, y).
    pub fn check_lyrics(&self, x: f32, y: f32, radius: f32) -> Option<BubbleId> {
        self.bubbles.hit_test(x, y, radius)
    }

    /// Recompute which bubbles each input source is holding.
    fn refresh_holds(&mut self) {
        let world = self.ctx.world();
        let mirror = self.ctx.config.mirror_camera;

        self.samples.clear();
        let pointer_space = SampleSpace {
            world,
            mirror,
            radius: self.ctx.config.pointer_radius,
        };
        self.mouse.sample(&pointer_space, &mut self.samples);
        let target = self
            .samples
            .first()
            .filter(|s| s.active)
            .and_then(|s| self.check_lyrics(s.pos.x, s.pos.y, s.radius));
        match target {
            Some(id) => {
                self.hold.start_hold(id, HoldSource::Pointer);
            }
            None => self.hold.release_pointer(),
        }

        self.samples.clear();
        let landmark_space = SampleSpace {
            world,
            mirror,
            radius: self.ctx.config.landmark_radius,
        };
        let source: Option<&dyn PointerLikeSource> = match self.ctx.mode {
            GameMode::Cursor => None,
            GameMode::Hand => Some(&self.hands),
            GameMode::Face => Some(&self.face),
            GameMode::Body => Some(&self.pose),
        };
        if let Some(source) = source {
            source.sample(&landmark_space, &mut self.samples);
        }
        let mut touched: Vec<BubbleId> = Vec::new();
        for s in self.samples.iter().filter(|s| s.active) {
            for id in self.bubbles.hits(s.pos.x, s.pos.y, s.radius) {
                if !touched.contains(&id) {
                    touched.push(id);
                }
            }
        }
        for id in self.hold.auto_held() {
            if !touched.contains(&id) {
                self.hold.stop_hold(id, HoldSource::Auto);
            }
        }
        for id in touched {
            self.hold.start_hold(id, HoldSource::Auto);
        }
    }

    // ---- Playback control ----

    /// Ask for a control operation. Ignored (false) while another one is in
    /// flight, and for play or restart while the presence gate is still closed.
    pub fn request(&mut self, op: ControlOp) -> bool {
        if matches!(self.phase, SessionPhase::TornDown) {
            return false;
        }
        if op != ControlOp::Pause && !self.gate.is_ready() {
            log::info!("session: {:?} refused, presence gate closed", op);
            return false;
        }
        if !self.control.begin(op) {
            return false;
        }
        if self.clock.is_fallback() {
            // Nothing external to wait for.
            self.control_settled(op, Ok(()));
        } else {
            self.emit(EventKind::ControlRequest, op as u32 as f32, 0.0, 0.0);
        }
        true
    }

    pub fn play(&mut self) -> bool {
        self.request(ControlOp::Play)
    }

    pub fn pause(&mut self) -> bool {
        self.request(ControlOp::Pause)
    }

    pub fn restart(&mut self) -> bool {
        self.request(ControlOp::Restart)
    }

    /// The host finished carrying out a control request.
    pub fn control_settled(&mut self, op: ControlOp, result: Result<(), ControlError>) {
        let Some(result) = self.control.settle(op, result) else {
            return;
        };
        match result {
            Ok(()) => self.apply_control(op),
            Err(_) if op == ControlOp::Play && self.ctx.config.allow_fallback => {
                if self.phase == SessionPhase::Finished {
                    return;
                }
                self.enter_fallback();
                self.apply_control(ControlOp::Play);
            }
            Err(e) => log::warn!("session: {:?} abandoned: {}", op, e),
        }
    }

    fn apply_control(&mut self, op: ControlOp) {
        let now = self.now_ms;
        match (op, self.phase) {
            (_, SessionPhase::TornDown) => {}
            (ControlOp::Restart, _) => self.restart_now(),
            (ControlOp::Play, SessionPhase::Idle) => self.start_playback(),
            (ControlOp::Play, SessionPhase::Paused) => {
                self.clock.resume_fallback(now);
                self.phase = SessionPhase::Playing;
            }
            (ControlOp::Pause, SessionPhase::Playing) => {
                self.clock.pause_fallback(now);
                self.phase = SessionPhase::Paused;
            }
            _ => {}
        }
    }

    fn start_playback(&mut self) {
        let now = self.now_ms;
        self.clock.resume_fallback(now);
        self.arbiter.arm(now, self.clock.duration_ms(), &mut self.timers);
        self.phase = SessionPhase::Playing;
        self.emit(EventKind::PlaybackStarted, 0.0, 0.0, 0.0);
        log::info!("session: playback started");
    }

    fn restart_now(&mut self) {
        let now = self.now_ms;
        self.release_all_bubbles();
        self.hold.reset();
        self.timeline.reset_cursor();
        self.clock.resync(now);
        self.timers.cancel_all();
        self.arbiter.reset(&mut self.timers);
        self.last_position_ms = 0.0;
        self.result = None;
        self.reported = None;
        log::info!("session: restart");
        self.start_playback();
    }

    fn enter_fallback(&mut self) {
        if self.clock.is_fallback() {
            return;
        }
        self.clock.enter_fallback(self.now_ms);
        if self.phase != SessionPhase::Playing {
            self.clock.pause_fallback(self.now_ms);
        }
        self.emit(EventKind::FallbackEntered, 0.0, 0.0, 0.0);
    }

    /// Latest state of the external timed player.
    pub fn observe_player(&mut self, snapshot: PlayerSnapshot) {
        self.clock.observe(snapshot);
        if let Some(duration) = self.clock.duration_ms() {
            self.arbiter.update_duration(duration, &mut self.timers);
        }
    }

    /// No timed player at all: run on the internal clock if allowed.
    pub fn player_unavailable(&mut self) {
        self.clock.detach_player();
        if self.ctx.config.allow_fallback {
            self.enter_fallback();
        } else {
            log::warn!("session: timed player unavailable and fallback disabled");
        }
    }

    /// Turn the presence gate off for the rest of the session.
    pub fn suppress_presence(&mut self) {
        let signals = self.gate.suppress(&mut self.timers);
        self.apply_presence(signals);
    }

    fn apply_presence(&mut self, signals: Vec<PresenceSignal>) {
        for signal in signals {
            match signal {
                PresenceSignal::CountdownTick(n) => {
                    self.emit(EventKind::Countdown, n as f32, 0.0, 0.0)
                }
                PresenceSignal::StartPlayback => {
                    if self.phase == SessionPhase::Idle {
                        self.request(ControlOp::Play);
                    }
                }
                PresenceSignal::WarningShown(w) => {
                    self.emit(EventKind::WarningShown, w.code() as f32, 0.0, 0.0)
                }
                PresenceSignal::WarningHidden => self.emit(EventKind::WarningHidden, 0.0, 0.0, 0.0),
            }
        }
    }

    // ---- Completion ----

    /// The timed player reported the end of the song.
    pub fn on_finish_event(&mut self) -> bool {
        self.complete(CompletionReason::FinishEvent)
    }

    fn on_timer(&mut self, key: TimerKey) {
        let now = self.now_ms;
        match key {
            TimerKey::Countdown => {
                let signals = self.gate.on_countdown_tick(&mut self.timers);
                self.apply_presence(signals);
            }
            TimerKey::PresenceLoss => {
                if let Some(signal) = self.gate.on_loss_timeout() {
                    self.apply_presence(vec![signal]);
                }
            }
            TimerKey::CompletionWatchdog => {
                let observed = self.clock.state().last_observed_ms;
                let paused = self.phase == SessionPhase::Paused
                    || self.clock.player().is_some_and(|p| p.paused);
                let verdict = self.arbiter.on_watchdog(
                    now,
                    observed,
                    self.clock.duration_ms(),
                    paused,
                    &mut self.timers,
                );
                if let Some(reason) = verdict {
                    self.complete(reason);
                }
            }
            TimerKey::CompletionConfirm => {
                let observed = self.clock.state().last_observed_ms;
                if let Some(reason) = self.arbiter.on_confirm(observed, self.clock.duration_ms()) {
                    self.complete(reason);
                }
            }
            TimerKey::CompletionDeadline => {
                self.complete(CompletionReason::Deadline);
            }
            TimerKey::FallbackLoopGrace => {
                self.complete(CompletionReason::FallbackLoop);
            }
        }
    }

    /// Try to end the session. True only for the first accepted signal.
    pub fn complete(&mut self, reason: CompletionReason) -> bool {
        if matches!(self.phase, SessionPhase::TornDown | SessionPhase::Finished) {
            return false;
        }
        if !self.arbiter.try_complete(reason, self.now_ms, &mut self.timers) {
            return false;
        }
        self.timers.cancel_all();

        let result = SessionResult::from_score(
            self.hold.score(),
            self.hold.total_notes(),
            self.hold.max_score(),
            reason,
        );
        self.release_all_bubbles();
        self.phase = SessionPhase::Finished;

        if self.clock.is_fallback() {
            self.clock.pause_fallback(self.now_ms);
        } else {
            self.control.clear();
            self.request(ControlOp::Pause);
        }
        self.report_score();
        self.emit(
            EventKind::Results,
            result.score as f32,
            result.max_combo as f32,
            result.rank.code() as f32,
        );
        log::info!(
            "session: finished, score {} max combo {} rank {}",
            result.score,
            result.max_combo,
            result.rank.as_str()
        );
        self.result = Some(result);
        true
    }

    /// Cancel every timer and release every bubble. The session is dead afterwards.
    pub fn teardown(&mut self) {
        if self.phase == SessionPhase::TornDown {
            return;
        }
        let cancelled = self.timers.cancel_all();
        let released = self.release_all_bubbles();
        self.control.clear();
        self.clock.detach_player();
        self.phase = SessionPhase::TornDown;
        log::info!(
            "session: teardown, {} timers cancelled, {} bubbles released",
            cancelled,
            released
        );
    }

    // ---- Internals ----

    fn on_spawn(&mut self, outcome: SpawnOutcome) {
        if let Some(evicted) = outcome.evicted {
            self.hold.remove(evicted);
            self.emit(EventKind::BubbleReleased, evicted.0 as f32, 0.0, 0.0);
        }
        self.hold.track(outcome.id);
        self.emit(
            EventKind::BubbleSpawned,
            outcome.id.0 as f32,
            outcome.pos.x,
            outcome.pos.y,
        );
    }

    fn on_hit(&mut self, id: BubbleId) {
        let combo = self.hold.score().combo;
        let pos = self.bubbles.release(id).unwrap_or(Vec2::ZERO);
        self.hold.remove(id);
        self.vfx.create_hit_effect(pos.x, pos.y);
        self.vfx.trigger_combo_effect(combo);
        self.emit(EventKind::BubbleHit, id.0 as f32, pos.x, pos.y);
        self.emit(EventKind::Combo, combo as f32, 0.0, 0.0);
        self.emit(EventKind::BubbleReleased, id.0 as f32, 0.0, 0.0);
    }

    /// External seek backwards: drop what is on screen and move the timeline cursor.
    fn on_seek(&mut self, position_ms: f64) {
        let released = self.release_all_bubbles();
        self.timeline.resync_to(position_ms);
        log::debug!("session: seek to {:.0}ms released {} bubbles", position_ms, released);
    }

    fn release_all_bubbles(&mut self) -> usize {
        let ids = self.bubbles.release_all();
        self.hold.clear_holds();
        for id in &ids {
            self.emit(EventKind::BubbleReleased, id.0 as f32, 0.0, 0.0);
        }
        ids.len()
    }

    fn report_score(&mut self) {
        let score = self.hold.score();
        let current = (score.score.round() as u32, score.combo);
        if self.reported != Some(current) {
            self.reported = Some(current);
            self.emit(
                EventKind::Score,
                current.0 as f32,
                score.combo as f32,
                score.max_combo as f32,
            );
        }
    }

    fn emit(&mut self, kind: EventKind, a: f32, b: f32, c: f32) {
        if self.events.len() >= self.ctx.config.max_frame_events {
            log::warn!("session: event buffer full, dropping {:?}", kind);
            return;
        }
        self.events.push(GameEvent::new(kind, a, b, c));
    }

    // ---- Accessors ----

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn events_ptr(&self) -> *const f32 {
        self.events.as_ptr() as *const f32
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn position_ms(&self) -> f64 {
        self.clock.position_ms()
    }

    pub fn score(&self) -> &SessionScore {
        self.hold.score()
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn active_bubbles(&self) -> usize {
        self.bubbles.active_count()
    }

    pub fn bubbles(&self) -> &BubbleLifecycleManager {
        &self.bubbles
    }

    /// Text of a live bubble; the render buffer only carries its id.
    pub fn bubble_text(&self, id: BubbleId) -> Option<&str> {
        self.bubbles.get(id).map(|b| b.text.as_str())
    }

    pub fn hold(&self) -> &HoldScoringEngine {
        &self.hold
    }

    pub fn timeline(&self) -> &LyricTimeline {
        &self.timeline
    }

    pub fn gate(&self) -> &PresenceGate {
        &self.gate
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn control_in_flight(&self) -> Option<ControlOp> {
        self.control.in_flight()
    }

    pub fn is_fallback(&self) -> bool {
        self.clock.is_fallback()
    }

    pub fn vfx(&self) -> &V {
        &self.vfx
    }

    pub fn vfx_mut(&mut self) -> &mut V {
        &mut self.vfx
    }
}
