use serde::{Deserialize, Serialize};

use crate::systems::completion::CompletionReason;
use crate::systems::hold::SessionScore;

/// Letter grade shown on the results screen and sent with a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    SS,
    S,
    A,
    B,
    C,
    D,
}

impl Rank {
    /// Grade for a finished session. `SS` needs every note caught at the maximum score.
    pub fn grade(accuracy: f32, full_combo_at_max: bool) -> Self {
        if full_combo_at_max {
            Rank::SS
        } else if accuracy >= 0.9 {
            Rank::S
        } else if accuracy >= 0.8 {
            Rank::A
        } else if accuracy >= 0.7 {
            Rank::B
        } else if accuracy >= 0.6 {
            Rank::C
        } else {
            Rank::D
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::SS => "SS",
            Rank::S => "S",
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::D => "D",
        }
    }

    /// Numeric code for the event buffer (0 = SS).
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Final snapshot of a session, taken once when completion latches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub rank: Rank,
    /// Caught notes over total notes.
    pub accuracy: f32,
    pub reason: CompletionReason,
    pub notes: u32,
    pub hits: u32,
    pub misses: u32,
}

impl SessionResult {
    pub fn from_score(
        score: &SessionScore,
        total_notes: u32,
        max_score: f64,
        reason: CompletionReason,
    ) -> Self {
        let accuracy = if total_notes == 0 {
            0.0
        } else {
            (score.hits as f32 / total_notes as f32).min(1.0)
        };
        let full_combo_at_max =
            total_notes > 0 && score.hits >= total_notes && score.misses == 0 && score.score >= max_score;
        Self {
            score: score.score.round().clamp(0.0, u32::MAX as f64) as u32,
            combo: score.combo,
            max_combo: score.max_combo,
            rank: Rank::grade(accuracy, full_combo_at_max),
            accuracy,
            reason,
            notes: total_notes,
            hits: score.hits,
            misses: score.misses,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(points: f64, hits: u32, misses: u32) -> SessionScore {
        SessionScore {
            score: points,
            combo: hits,
            max_combo: hits,
            hits,
            misses,
        }
    }

    #[test]
    fn rank_thresholds() {
        assert_eq!(Rank::grade(1.0, true), Rank::SS);
        assert_eq!(Rank::grade(1.0, false), Rank::S);
        assert_eq!(Rank::grade(0.85, false), Rank::A);
        assert_eq!(Rank::grade(0.7, false), Rank::B);
        assert_eq!(Rank::grade(0.65, false), Rank::C);
        assert_eq!(Rank::grade(0.1, false), Rank::D);
    }

    #[test]
    fn perfect_session_is_ss() {
        let r = SessionResult::from_score(
            &score(1_000_000.0, 10, 0),
            10,
            1_000_000.0,
            CompletionReason::FinishEvent,
        );
        assert_eq!(r.rank, Rank::SS);
        assert_eq!(r.score, 1_000_000);
        assert_eq!(r.accuracy, 1.0);
    }

    #[test]
    fn one_miss_drops_to_accuracy_grade() {
        let r = SessionResult::from_score(&score(900_000.4, 9, 1), 10, 1_000_000.0, CompletionReason::Watchdog);
        assert_eq!(r.score, 900_000);
        assert_eq!(r.rank, Rank::S);
    }

    #[test]
    fn empty_song_grades_d() {
        let r = SessionResult::from_score(&SessionScore::default(), 0, 1_000_000.0, CompletionReason::Deadline);
        assert_eq!(r.rank, Rank::D);
        assert_eq!(r.accuracy, 0.0);
    }

    #[test]
    fn serializes_camel_case() {
        let r = SessionResult::from_score(&score(10.0, 1, 0), 2, 20.0, CompletionReason::FallbackLoop);
        let json = r.to_json().unwrap();
        assert!(json.contains("\"maxCombo\":1"));
        assert!(json.contains("\"reason\":\"fallback_loop\""));
        assert!(json.contains("\"rank\":\"D\""));
    }
}
