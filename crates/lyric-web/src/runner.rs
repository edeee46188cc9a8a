use lyric_engine::bridge::protocol::{
    HEADER_AVATAR_POINT_COUNT, HEADER_COMBO, HEADER_EVENT_COUNT, HEADER_FLOATS,
    HEADER_FRAME_COUNTER, HEADER_INSTANCE_COUNT, HEADER_MAX_COMBO, HEADER_POSITION_MS,
    HEADER_PRESENCE, HEADER_SCORE,
};
use lyric_engine::systems::presence::PresencePhase;
use lyric_engine::{
    BubbleId, ConfigError, FrameSink, GameSession, HostCommand, InputEvent, InputQueue,
    ProtocolLayout, ScoreSubmission, SessionContext,
};

/// Owns one game session and the frame data the host page reads back.
///
/// wasm-bindgen cannot export generic structs, so the crate root keeps a
/// `thread_local!` runner and exports free functions that forward here.
pub struct SessionRunner {
    session: GameSession<FrameSink>,
    input: InputQueue,
    layout: ProtocolLayout,
    header: [f32; HEADER_FLOATS],
    frame_counter: u32,
}

impl SessionRunner {
    pub fn new(ctx: SessionContext) -> Self {
        let config = &ctx.config;
        let layout = ProtocolLayout::from_config(config);
        let header = layout.header(config.world_width, config.world_height);
        let sink = FrameSink::new(
            config.max_active_bubbles,
            config.max_avatar_points,
            ctx.world(),
            config.mirror_camera,
        );
        Self {
            session: GameSession::new(ctx, sink),
            input: InputQueue::new(),
            layout,
            header,
            frame_counter: 0,
        }
    }

    /// Queue an input event for the next frame.
    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Queue a host command for the next frame.
    pub fn command(&mut self, cmd: HostCommand) {
        self.input.push(InputEvent::Command(cmd));
    }

    pub fn load_lyrics(&mut self, json: &str) -> Result<usize, ConfigError> {
        self.session.load_lyrics_json(json)
    }

    /// Run one frame at wall-clock `now_ms` and refresh the header.
    pub fn tick(&mut self, now_ms: f64) {
        self.session.update(now_ms, &mut self.input);
        self.frame_counter = self.frame_counter.wrapping_add(1);
        self.write_header();
    }

    fn write_header(&mut self) {
        let sink = self.session.vfx();
        let score = self.session.score();
        let h = &mut self.header;
        h[HEADER_FRAME_COUNTER] = self.frame_counter as f32;
        h[HEADER_INSTANCE_COUNT] = sink.buffer().instance_count() as f32;
        h[HEADER_EVENT_COUNT] = self.session.events().len() as f32;
        h[HEADER_AVATAR_POINT_COUNT] = sink.avatar_point_count() as f32;
        h[HEADER_POSITION_MS] = self.session.position_ms() as f32;
        h[HEADER_SCORE] = score.score.round() as f32;
        h[HEADER_COMBO] = score.combo as f32;
        h[HEADER_MAX_COMBO] = score.max_combo as f32;

        let gate = self.session.gate();
        h[HEADER_PRESENCE] = if gate.warning().is_some() {
            -2.0
        } else {
            match gate.phase() {
                PresencePhase::Ready => 0.0,
                PresencePhase::Countdown(n) => n as f32,
                PresencePhase::NotReady => -1.0,
            }
        };
    }

    pub fn teardown(&mut self) {
        self.session.teardown();
        self.input.drain();
    }

    pub fn session(&self) -> &GameSession<FrameSink> {
        &self.session
    }

    // ---- Pointer accessors for host-side buffer reads ----

    pub fn header_ptr(&self) -> *const f32 {
        self.header.as_ptr()
    }

    pub fn instances_ptr(&self) -> *const f32 {
        self.session.vfx().buffer().instances_ptr()
    }

    pub fn instance_count(&self) -> u32 {
        self.session.vfx().buffer().instance_count()
    }

    pub fn events_ptr(&self) -> *const f32 {
        self.session.events_ptr()
    }

    pub fn events_len(&self) -> u32 {
        self.session.events().len() as u32
    }

    pub fn hit_effects_ptr(&self) -> *const f32 {
        self.session.vfx().hit_effects_ptr()
    }

    pub fn hit_effect_count(&self) -> u32 {
        self.session.vfx().hit_effects().len() as u32
    }

    pub fn avatar_ptr(&self) -> *const f32 {
        self.session.vfx().avatar_ptr()
    }

    pub fn avatar_point_count(&self) -> u32 {
        self.session.vfx().avatar_point_count()
    }

    pub fn world_width(&self) -> f32 {
        self.session.context().config.world_width
    }

    pub fn world_height(&self) -> f32 {
        self.session.context().config.world_height
    }

    // ---- Capacity accessors ----

    pub fn max_instances(&self) -> u32 {
        self.layout.max_instances as u32
    }

    pub fn max_events(&self) -> u32 {
        self.layout.max_events as u32
    }

    pub fn max_avatar_points(&self) -> u32 {
        self.layout.max_avatar_points as u32
    }

    pub fn buffer_total_floats(&self) -> u32 {
        self.layout.buffer_total_floats as u32
    }

    // ---- Text payloads ----

    pub fn bubble_text(&self, id: u32) -> Option<String> {
        self.session.bubble_text(BubbleId(id)).map(str::to_string)
    }

    /// Final results as JSON, once the session has finished.
    pub fn result_json(&self) -> Option<String> {
        let result = self.session.result()?;
        result
            .to_json()
            .map_err(|e| log::error!("result: {}", e))
            .ok()
    }

    /// Score payload for the ranking service.
    pub fn score_submission_json(&self, player_name: &str) -> Result<String, String> {
        let result = self
            .session
            .result()
            .ok_or_else(|| "session has not finished".to_string())?;
        let ctx = self.session.context();
        let submission =
            ScoreSubmission::from_result(result, player_name, &ctx.song.song_id(), ctx.mode)
                .map_err(|e| e.to_string())?;
        submission.to_json().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyric_engine::bridge::protocol::{HEADER_MAX_INSTANCES, HEADER_WORLD_WIDTH};
    use lyric_engine::{EventKind, GameMode, SelectedSong, SessionConfig};

    fn runner(mode: GameMode) -> SessionRunner {
        SessionRunner::new(SessionContext::new(
            SessionConfig::default(),
            mode,
            SelectedSong::default(),
        ))
    }

    #[test]
    fn header_tracks_frames() {
        let mut r = runner(GameMode::Cursor);
        assert_eq!(r.header[HEADER_MAX_INSTANCES], 50.0);
        assert_eq!(r.header[HEADER_WORLD_WIDTH], 1280.0);
        r.tick(0.0);
        r.tick(16.0);
        assert_eq!(r.header[HEADER_FRAME_COUNTER], 2.0);
        assert_eq!(r.header[HEADER_PRESENCE], 0.0);
    }

    #[test]
    fn body_mode_reports_not_ready() {
        let mut r = runner(GameMode::Body);
        r.tick(0.0);
        assert_eq!(r.header[HEADER_PRESENCE], -1.0);
    }

    #[test]
    fn commands_apply_on_next_frame() {
        let mut r = runner(GameMode::Cursor);
        r.load_lyrics(r#"[{"time":500,"text":"la"}]"#).unwrap();
        r.command(HostCommand::PlayerUnavailable);
        r.command(HostCommand::Request(lyric_engine::ControlOp::Play));
        assert_eq!(r.events_len(), 0);

        r.tick(0.0);
        let events = r.session().events();
        assert!(events.iter().any(|e| e.is(EventKind::FallbackEntered)));
        assert!(events.iter().any(|e| e.is(EventKind::PlaybackStarted)));

        r.tick(400.0);
        assert_eq!(r.instance_count(), 1);
        let id = r
            .session()
            .events()
            .iter()
            .find(|e| e.is(EventKind::BubbleSpawned))
            .map(|e| e.a as u32)
            .unwrap();
        assert_eq!(r.bubble_text(id).as_deref(), Some("la"));
    }

    #[test]
    fn submission_needs_results() {
        let r = runner(GameMode::Cursor);
        assert!(r.result_json().is_none());
        assert!(r.score_submission_json("ann").is_err());
    }

    #[test]
    fn teardown_stops_everything() {
        let mut r = runner(GameMode::Cursor);
        r.command(HostCommand::PlayerUnavailable);
        r.tick(0.0);
        r.teardown();
        assert!(r.session().timers().is_empty());
        r.tick(100.0);
        assert_eq!(r.events_len(), 0);
    }
}
