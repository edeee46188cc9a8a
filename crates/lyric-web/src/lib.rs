//! WASM exports for the lyric engine.
//!
//! The host page calls `session_init` once, feeds input and player state as it
//! arrives, and calls `session_tick` every animation frame. After each tick it
//! reads the header, bubble instances, events and avatar points through the
//! pointer accessors below.

pub mod runner;

pub use runner::SessionRunner;

use std::cell::RefCell;

use lyric_engine::{
    ControlOp, GameMode, HostCommand, InputEvent, Landmark, LandmarkKind, PlayerSnapshot,
    SelectedSong, SessionConfig, SessionContext,
};
use wasm_bindgen::prelude::*;

/// localStorage key of the song picked on the selection screen.
const SELECTED_SONG_KEY: &str = "selectedSong";

thread_local! {
    static RUNNER: RefCell<Option<SessionRunner>> = RefCell::new(None);
}

fn with_runner<R>(f: impl FnOnce(&mut SessionRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| {
        let mut borrow = cell.borrow_mut();
        match borrow.as_mut() {
            Some(runner) => Some(f(runner)),
            None => {
                log::warn!("session not initialized, call session_init() first");
                None
            }
        }
    })
}

fn stored_song() -> Option<String> {
    let storage = web_sys::window()?.local_storage().ok()??;
    storage.get_item(SELECTED_SONG_KEY).ok()?
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Start a new session, replacing any previous one.
///
/// `mode` is 0 = cursor, 1 = hand, 2 = face, 3 = body. `config_json` may be
/// empty for defaults.
#[wasm_bindgen]
pub fn session_init(mode: u32, config_json: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let config = if config_json.trim().is_empty() {
        SessionConfig::default()
    } else {
        SessionConfig::from_json(config_json).map_err(js_error)?
    };
    let mode = GameMode::from_code(mode).unwrap_or_else(|| {
        log::warn!("unknown game mode {}, using cursor", mode);
        GameMode::Cursor
    });
    let song = SelectedSong::from_storage(stored_song().as_deref());
    let runner = SessionRunner::new(SessionContext::new(config, mode, song));

    RUNNER.with(|cell| {
        if let Some(mut previous) = cell.borrow_mut().replace(runner) {
            previous.teardown();
        }
    });
    log::info!("lyric-web: initialized");
    Ok(())
}

/// Load the lyric source document. Returns the number of notes kept.
#[wasm_bindgen]
pub fn session_load_lyrics(json: &str) -> Result<u32, JsValue> {
    match with_runner(|r| r.load_lyrics(json)) {
        Some(Ok(kept)) => Ok(kept as u32),
        Some(Err(e)) => Err(js_error(e)),
        None => Err(JsValue::from_str("session not initialized")),
    }
}

#[wasm_bindgen]
pub fn session_tick(now_ms: f64) {
    with_runner(|r| r.tick(now_ms));
}

#[wasm_bindgen]
pub fn session_teardown() {
    with_runner(|r| r.teardown());
}

// ---- Input ----

#[wasm_bindgen]
pub fn session_pointer_down(x: f32, y: f32) {
    with_runner(|r| r.push_input(InputEvent::PointerDown { x, y }));
}

#[wasm_bindgen]
pub fn session_pointer_up(x: f32, y: f32) {
    with_runner(|r| r.push_input(InputEvent::PointerUp { x, y }));
}

#[wasm_bindgen]
pub fn session_pointer_move(x: f32, y: f32) {
    with_runner(|r| r.push_input(InputEvent::PointerMove { x, y }));
}

/// One frame of vision output as flat `[x, y, z, visibility]` quadruples.
/// `kind` is 0 = hands, 1 = face, 2 = pose.
#[wasm_bindgen]
pub fn session_landmarks(kind: u32, data: &[f32]) {
    let Some(kind) = LandmarkKind::from_code(kind) else {
        log::warn!("unknown landmark kind {}", kind);
        return;
    };
    let points = Landmark::from_flat(data);
    with_runner(|r| r.push_input(InputEvent::Landmarks { kind, points }));
}

// ---- Timed player ----

/// Latest timed-player state. Negative values mean "not available".
#[wasm_bindgen]
pub fn session_player_state(
    ready: bool,
    position_ms: f64,
    media_elapsed_ms: f64,
    paused: bool,
    duration_ms: f64,
) {
    let known = |v: f64| (v >= 0.0).then_some(v);
    let snapshot = PlayerSnapshot {
        ready,
        position_ms: known(position_ms),
        media_elapsed_ms: known(media_elapsed_ms),
        paused,
        duration_ms: known(duration_ms),
    };
    with_runner(|r| r.command(HostCommand::PlayerState(snapshot)));
}

#[wasm_bindgen]
pub fn session_player_finished() {
    with_runner(|r| r.command(HostCommand::PlayerFinished));
}

#[wasm_bindgen]
pub fn session_player_unavailable() {
    with_runner(|r| r.command(HostCommand::PlayerUnavailable));
}

/// The host carried out a `ControlRequest` event. `op` is 1 = play, 2 = pause, 3 = restart.
#[wasm_bindgen]
pub fn session_control_settled(op: u32, ok: bool, message: &str) {
    let Some(op) = ControlOp::from_code(op) else {
        log::warn!("unknown control op {}", op);
        return;
    };
    let error = (!ok).then(|| message.to_string());
    with_runner(|r| r.command(HostCommand::Settled { op, error }));
}

// ---- Controls ----

#[wasm_bindgen]
pub fn session_play() {
    with_runner(|r| r.command(HostCommand::Request(ControlOp::Play)));
}

#[wasm_bindgen]
pub fn session_pause() {
    with_runner(|r| r.command(HostCommand::Request(ControlOp::Pause)));
}

#[wasm_bindgen]
pub fn session_restart() {
    with_runner(|r| r.command(HostCommand::Request(ControlOp::Restart)));
}

#[wasm_bindgen]
pub fn session_suppress_presence() {
    with_runner(|r| r.command(HostCommand::SuppressPresence));
}

// ---- Data accessors ----

#[wasm_bindgen]
pub fn get_header_ptr() -> *const f32 {
    with_runner(|r| r.header_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_instances_ptr() -> *const f32 {
    with_runner(|r| r.instances_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_instance_count() -> u32 {
    with_runner(|r| r.instance_count()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_game_events_ptr() -> *const f32 {
    with_runner(|r| r.events_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_game_events_len() -> u32 {
    with_runner(|r| r.events_len()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_hit_effects_ptr() -> *const f32 {
    with_runner(|r| r.hit_effects_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_hit_effect_count() -> u32 {
    with_runner(|r| r.hit_effect_count()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_avatar_ptr() -> *const f32 {
    with_runner(|r| r.avatar_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_avatar_point_count() -> u32 {
    with_runner(|r| r.avatar_point_count()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_world_width() -> f32 {
    with_runner(|r| r.world_width()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_world_height() -> f32 {
    with_runner(|r| r.world_height()).unwrap_or_default()
}

// ---- Capacity accessors ----

#[wasm_bindgen]
pub fn get_max_instances() -> u32 {
    with_runner(|r| r.max_instances()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_max_events() -> u32 {
    with_runner(|r| r.max_events()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_max_avatar_points() -> u32 {
    with_runner(|r| r.max_avatar_points()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_buffer_total_floats() -> u32 {
    with_runner(|r| r.buffer_total_floats()).unwrap_or_default()
}

// ---- Text payloads ----

/// Lyric text of a live bubble; instances only carry the id.
#[wasm_bindgen]
pub fn get_bubble_text(id: u32) -> Option<String> {
    with_runner(|r| r.bubble_text(id)).flatten()
}

/// Results object, or `undefined` until the session finishes.
#[wasm_bindgen]
pub fn get_result() -> JsValue {
    with_runner(|r| r.result_json())
        .flatten()
        .and_then(|json| js_sys::JSON::parse(&json).ok())
        .unwrap_or(JsValue::UNDEFINED)
}

/// JSON body for the score service, validated against its limits.
#[wasm_bindgen]
pub fn get_score_submission(player_name: &str) -> Result<String, JsValue> {
    with_runner(|r| r.score_submission_json(player_name))
        .unwrap_or_else(|| Err("session not initialized".to_string()))
        .map_err(js_error)
}
