use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The song the player picked on the menu, persisted in client storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedSong {
    pub title: String,
    pub artist: String,
    /// Token for the timed-player service.
    #[serde(default)]
    pub api_token: String,
    pub song_url: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

fn default_difficulty() -> String {
    "normal".to_string()
}

impl Default for SelectedSong {
    fn default() -> Self {
        Self {
            title: "First Note".to_string(),
            artist: "Unknown Artist".to_string(),
            api_token: String::new(),
            song_url: String::new(),
            difficulty: default_difficulty(),
        }
    }
}

impl SelectedSong {
    /// Parse a stored record.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::SelectedSong)
    }

    /// Read the stored record, falling back to the default song if absent or unreadable.
    pub fn from_storage(stored: Option<&str>) -> Self {
        match stored {
            None => {
                log::info!("no selected song stored, using default");
                Self::default()
            }
            Some(json) => Self::from_json(json).unwrap_or_else(|e| {
                log::warn!("{}; using default song", e);
                Self::default()
            }),
        }
    }

    /// Song id for the ranking service: the last URL path segment, sanitized.
    pub fn song_id(&self) -> String {
        let tail = self
            .song_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let id: String = tail
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .take(64)
            .collect();
        if id.is_empty() {
            "default".to_string()
        } else {
            id
        }
    }
}

/// One lyric record as delivered by the host, before timeline normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricRecord {
    /// Start time in ms. May be negative for an upbeat pickup.
    pub time: f64,
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub display_duration: Option<f64>,
}

/// Records decoded from a lyric source, plus the number of array elements that
/// were not valid records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricSource {
    pub records: Vec<LyricRecord>,
    pub rejected: usize,
}

/// Parse a JSON array of lyric records.
///
/// Only a document that is not an array is an error. Elements that do not
/// decode as a record are counted in `rejected` and left out.
pub fn parse_lyrics(json: &str) -> Result<LyricSource, ConfigError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json).map_err(ConfigError::Lyrics)?;
    let mut source = LyricSource::default();
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<LyricRecord>(value) {
            Ok(record) => source.records.push(record),
            Err(e) => {
                log::debug!("lyrics: element {} rejected: {}", index, e);
                source.rejected += 1;
            }
        }
    }
    Ok(source)
}
