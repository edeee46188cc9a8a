use serde::{Deserialize, Serialize};

use crate::api::types::GameMode;
use crate::error::SubmissionError;
use crate::session::result::{Rank, SessionResult};

pub const MAX_SUBMITTED_SCORE: u32 = 1_000_000;
pub const MAX_SUBMITTED_COMBO: u32 = 10_000;
pub const MAX_PLAYER_NAME_CHARS: usize = 32;
pub const MAX_SONG_ID_CHARS: usize = 64;

/// `^[A-Za-z0-9_-]{1,64}$`
pub fn is_valid_song_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SONG_ID_CHARS
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Body of `POST /score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub player_name: String,
    pub song_id: String,
    pub mode: GameMode,
    pub score: u32,
    pub max_combo: u32,
    pub rank: Rank,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
}

impl ScoreSubmission {
    /// Build and validate a submission for a finished session.
    pub fn from_result(
        result: &SessionResult,
        player_name: &str,
        song_id: &str,
        mode: GameMode,
    ) -> Result<Self, SubmissionError> {
        let submission = Self {
            player_name: player_name.trim().to_string(),
            song_id: song_id.to_string(),
            mode,
            score: result.score,
            max_combo: result.max_combo,
            rank: result.rank,
            accuracy: Some(result.accuracy),
        };
        submission.validate()?;
        Ok(submission)
    }

    /// Check everything the ranking service would reject.
    pub fn validate(&self) -> Result<(), SubmissionError> {
        if self.score > MAX_SUBMITTED_SCORE {
            return Err(SubmissionError::ScoreOutOfRange(self.score));
        }
        if self.max_combo > MAX_SUBMITTED_COMBO {
            return Err(SubmissionError::MaxComboOutOfRange(self.max_combo));
        }
        if !is_valid_song_id(&self.song_id) {
            return Err(SubmissionError::InvalidSongId(self.song_id.clone()));
        }
        let name_chars = self.player_name.trim().chars().count();
        if name_chars == 0 || name_chars > MAX_PLAYER_NAME_CHARS {
            return Err(SubmissionError::InvalidPlayerName);
        }
        if let Some(acc) = self.accuracy {
            if !(0.0..=1.0).contains(&acc) {
                return Err(SubmissionError::AccuracyOutOfRange(acc));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::completion::CompletionReason;

    fn result() -> SessionResult {
        SessionResult {
            score: 812_345,
            combo: 3,
            max_combo: 17,
            rank: Rank::A,
            accuracy: 0.85,
            reason: CompletionReason::FinishEvent,
            notes: 20,
            hits: 17,
            misses: 3,
        }
    }

    #[test]
    fn song_id_pattern() {
        assert!(is_valid_song_id("sky_01-remix"));
        assert!(!is_valid_song_id(""));
        assert!(!is_valid_song_id("has space"));
        assert!(!is_valid_song_id("ü"));
        assert!(!is_valid_song_id(&"a".repeat(65)));
        assert!(is_valid_song_id(&"a".repeat(64)));
    }

    #[test]
    fn builds_camel_case_payload() {
        let sub = ScoreSubmission::from_result(&result(), "  Mika ", "sky_01", GameMode::Hand).unwrap();
        assert_eq!(sub.player_name, "Mika");
        let json: serde_json::Value = serde_json::from_str(&sub.to_json().unwrap()).unwrap();
        assert_eq!(json["playerName"], "Mika");
        assert_eq!(json["songId"], "sky_01");
        assert_eq!(json["mode"], "hand");
        assert_eq!(json["maxCombo"], 17);
        assert_eq!(json["rank"], "A");
    }

    #[test]
    fn rejects_bad_fields() {
        let mut r = result();
        assert_eq!(
            ScoreSubmission::from_result(&r, "", "sky", GameMode::Cursor),
            Err(SubmissionError::InvalidPlayerName)
        );
        assert_eq!(
            ScoreSubmission::from_result(&r, &"n".repeat(33), "sky", GameMode::Cursor),
            Err(SubmissionError::InvalidPlayerName)
        );
        assert_eq!(
            ScoreSubmission::from_result(&r, "p", "bad/id", GameMode::Cursor),
            Err(SubmissionError::InvalidSongId("bad/id".into()))
        );
        r.score = 1_000_001;
        assert_eq!(
            ScoreSubmission::from_result(&r, "p", "sky", GameMode::Cursor),
            Err(SubmissionError::ScoreOutOfRange(1_000_001))
        );
        r.score = 10;
        r.max_combo = 10_001;
        assert_eq!(
            ScoreSubmission::from_result(&r, "p", "sky", GameMode::Cursor),
            Err(SubmissionError::MaxComboOutOfRange(10_001))
        );
    }

    #[test]
    fn unknown_rank_is_rejected_on_parse() {
        let json = r#"{"playerName":"p","songId":"s","mode":"face","score":1,"maxCombo":1,"rank":"Z"}"#;
        assert!(serde_json::from_str::<ScoreSubmission>(json).is_err());
    }
}
