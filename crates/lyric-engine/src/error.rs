//! Error types for the lyric engine
use thiserror::Error;

/// Malformed JSON handed to the engine by the host page.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Session config override document
    #[error("malformed session config: {0}")]
    Session(#[source] serde_json::Error),

    /// Lyric source document
    #[error("malformed lyric source: {0}")]
    Lyrics(#[source] serde_json::Error),

    /// Persisted selected-song record
    #[error("malformed selected song record: {0}")]
    SelectedSong(#[source] serde_json::Error),
}

/// A score payload that the ranking service would reject.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmissionError {
    #[error("score {0} outside [0, 1000000]")]
    ScoreOutOfRange(u32),

    #[error("max combo {0} outside [0, 10000]")]
    MaxComboOutOfRange(u32),

    #[error("song id {0:?} must match [A-Za-z0-9_-]{{1,64}}")]
    InvalidSongId(String),

    #[error("player name must be 1-32 characters")]
    InvalidPlayerName,

    #[error("accuracy {0} outside [0, 1]")]
    AccuracyOutOfRange(f32),
}

/// The external timed player rejected a control request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// e.g. autoplay policy aborting a play request
    #[error("player rejected request: {0}")]
    Rejected(String),

    /// No timed player library is present at all
    #[error("timed player unavailable")]
    Unavailable,
}

/// The score/ranking service answered with something other than data.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("service error: {0}")]
    Remote(String),

    #[error("response carried neither data nor error")]
    Empty,

    #[error("malformed response: {0}")]
    Malformed(#[source] serde_json::Error),
}
