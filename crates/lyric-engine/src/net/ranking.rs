use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::types::GameMode;
use crate::error::{ResponseError, SubmissionError};
use crate::net::score::is_valid_song_id;
use crate::session::result::Rank;

/// Leaderboard window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    #[default]
    All,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::All => "all",
        }
    }
}

/// Parameters of `GET /ranking`.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingQuery {
    pub song_id: String,
    pub mode: GameMode,
    pub period: Period,
    pub limit: u32,
    pub offset: u32,
}

impl RankingQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(song_id: impl Into<String>, mode: GameMode) -> Self {
        Self {
            song_id: song_id.into(),
            mode,
            period: Period::default(),
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit.clamp(1, Self::MAX_LIMIT);
        self.offset = offset;
        self
    }

    /// `songId=..&mode=..&period=..&limit=..&offset=..`. Song ids need no escaping once validated.
    pub fn to_query_string(&self) -> Result<String, SubmissionError> {
        if !is_valid_song_id(&self.song_id) {
            return Err(SubmissionError::InvalidSongId(self.song_id.clone()));
        }
        Ok(format!(
            "songId={}&mode={}&period={}&limit={}&offset={}",
            self.song_id,
            self.mode.as_str(),
            self.period.as_str(),
            self.limit,
            self.offset
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub total: u64,
}

/// Envelope every service response comes in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    pub fn from_json(json: &str) -> Result<Self, ResponseError> {
        serde_json::from_str(json).map_err(ResponseError::Malformed)
    }
}

impl<T> ApiResponse<T> {
    /// The payload, or the service's error message.
    pub fn into_result(self) -> Result<T, ResponseError> {
        match (self.data, self.error) {
            (_, Some(msg)) => Err(ResponseError::Remote(msg)),
            (Some(data), None) => Ok(data),
            (None, None) => Err(ResponseError::Empty),
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.meta.as_ref().map(|m| m.total)
    }
}

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    /// 1-based position on the board.
    #[serde(default)]
    pub position: u32,
    pub player_name: String,
    pub score: u32,
    #[serde(default)]
    pub max_combo: u32,
    pub rank: Rank,
    #[serde(default)]
    pub mode: GameMode,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string() {
        let q = RankingQuery::new("sky_01", GameMode::Body)
            .with_period(Period::Weekly)
            .with_page(500, 20);
        assert_eq!(
            q.to_query_string().unwrap(),
            "songId=sky_01&mode=body&period=weekly&limit=100&offset=20"
        );
        assert!(RankingQuery::new("a&b", GameMode::Cursor).to_query_string().is_err());
    }

    #[test]
    fn parses_ranking_page() {
        let json = r#"{
            "data": [
                {"position": 1, "playerName": "Ann", "score": 990000, "maxCombo": 120, "rank": "SS", "mode": "hand"},
                {"position": 2, "playerName": "Bo", "score": 500000, "rank": "C"}
            ],
            "meta": {"total": 42}
        }"#;
        let resp = ApiResponse::<Vec<RankingRow>>::from_json(json).unwrap();
        assert_eq!(resp.total(), Some(42));
        let rows = resp.into_result().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, Rank::SS);
        assert_eq!(rows[1].mode, GameMode::Cursor);
        assert_eq!(rows[1].max_combo, 0);
    }

    #[test]
    fn error_envelope() {
        let resp = ApiResponse::<Vec<RankingRow>>::from_json(r#"{"error": "rate limited"}"#).unwrap();
        assert!(matches!(resp.into_result(), Err(ResponseError::Remote(m)) if m == "rate limited"));

        let resp = ApiResponse::<Vec<RankingRow>>::from_json("{}").unwrap();
        assert!(matches!(resp.into_result(), Err(ResponseError::Empty)));

        assert!(matches!(
            ApiResponse::<Vec<RankingRow>>::from_json("[1,"),
            Err(ResponseError::Malformed(_))
        ));
    }
}
