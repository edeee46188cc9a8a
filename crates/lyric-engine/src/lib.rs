pub mod api;
pub mod assets;
pub mod bridge;
pub mod components;
pub mod core;
pub mod error;
pub mod input;
pub mod net;
pub mod renderer;
pub mod session;
pub mod systems;
pub mod timeline;

// Re-export key types at crate root for convenience
pub use api::config::{SessionConfig, SessionContext};
pub use api::types::{BubbleId, EventKind, GameEvent, GameMode, HoldSource};
pub use api::vfx::{NullVfx, VfxSink};
pub use assets::song::{parse_lyrics, LyricRecord, LyricSource, SelectedSong};
pub use bridge::protocol::ProtocolLayout;
pub use components::bubble::BubbleHandle;
pub use core::clock::{ClockSource, PlaybackClock, PlayerSnapshot};
pub use core::control::ControlOp;
pub use core::timers::{TimerKey, TimerRegistry};
pub use error::{ConfigError, ControlError, ResponseError, SubmissionError};
pub use input::landmark::{Landmark, LandmarkKind};
pub use input::queue::{HostCommand, InputEvent, InputQueue};
pub use net::ranking::{ApiResponse, Period, RankingQuery, RankingRow};
pub use net::score::ScoreSubmission;
pub use renderer::{BubbleInstance, FrameSink, HitEffect, RenderBuffer};
pub use session::result::{Rank, SessionResult};
pub use session::{GameSession, SessionPhase};
pub use systems::bubbles::BubbleLifecycleManager;
pub use systems::completion::{CompletionReason, SessionCompletionArbiter};
pub use systems::hold::{HoldScoringEngine, SessionScore};
pub use systems::presence::{PresenceGate, PresenceSignal, PresenceWarning};
pub use timeline::lyrics::{LyricEntry, LyricTimeline};
