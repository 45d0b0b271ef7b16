use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const THUMBNAIL_BASE: &str = "https://i.ytimg.com/vi";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::One => "one",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Some(Self::Off),
            "one" | "single" => Some(Self::One),
            "all" | "loop" => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StreamQuality {
    #[default]
    Best,
    Audio,
    Height(u16),
}

impl StreamQuality {
    /// Value of the backend's `quality` query parameter.
    pub fn as_query(self) -> String {
        match self {
            Self::Best => String::from("best"),
            Self::Audio => String::from("audio"),
            Self::Height(height) => height.to_string(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "best" => Some(Self::Best),
            "audio" => Some(Self::Audio),
            other => other.parse::<u16>().ok().map(Self::Height),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    #[serde(rename = "id")]
    pub external_id: String,
    pub title: String,
    #[serde(rename = "duration", default)]
    pub duration_seconds: u32,
}

impl QueueEntry {
    pub fn new(external_id: impl Into<String>, title: impl Into<String>, duration_seconds: u32) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            duration_seconds,
        }
    }

    pub fn has_id(&self) -> bool {
        !self.external_id.trim().is_empty()
    }

    pub fn needs_metadata(&self) -> bool {
        self.duration_seconds == 0 || self.title.trim().is_empty()
    }

    pub fn thumbnail_url(&self) -> String {
        format!("{THUMBNAIL_BASE}/{}/default.jpg", self.external_id)
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.external_id
        } else {
            &self.title
        }
    }

    pub fn display_duration(&self) -> String {
        format_duration(self.duration_seconds)
    }
}

pub fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "videos", default)]
    pub entries: Vec<QueueEntry>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub play_count: u64,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub last_played_at: Option<OffsetDateTime>,
}

impl Playlist {
    pub fn new(id: String, name: &str, description: &str, now: OffsetDateTime) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            entries: Vec::new(),
            created_at: now,
            updated_at: now,
            play_count: 0,
            last_played_at: None,
        }
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.external_id == external_id)
    }

    pub fn total_duration_seconds(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| u64::from(entry.duration_seconds))
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default = "default_low_water_mark")]
    pub autoplay_low_water_mark: usize,
    #[serde(default = "default_search_max_results")]
    pub search_max_results: u8,
    #[serde(default)]
    pub stream_quality: StreamQuality,
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
}

fn default_backend_url() -> String {
    String::from("http://localhost:3000")
}

fn default_low_water_mark() -> usize {
    1
}

fn default_search_max_results() -> u8 {
    10
}

fn default_http_timeout_seconds() -> u64 {
    20
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            repeat_mode: RepeatMode::default(),
            autoplay_low_water_mark: default_low_water_mark(),
            search_max_results: default_search_max_results(),
            stream_quality: StreamQuality::default(),
            http_timeout_seconds: default_http_timeout_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_formats_minutes_and_padded_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(200), "3:20");
        assert_eq!(format_duration(3605), "60:05");
    }

    #[test]
    fn entry_serializes_with_short_field_names() {
        let entry = QueueEntry::new("v1", "Song", 200);
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["id"], "v1");
        assert_eq!(json["duration"], 200);
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"repeat_mode":"All"}"#).expect("parse settings");
        assert_eq!(settings.repeat_mode, RepeatMode::All);
        assert_eq!(settings.autoplay_low_water_mark, 1);
        assert_eq!(settings.backend_url, "http://localhost:3000");
    }

    #[test]
    fn quality_parses_heights() {
        assert_eq!(StreamQuality::parse("720"), Some(StreamQuality::Height(720)));
        assert_eq!(StreamQuality::Height(480).as_query(), "480");
        assert_eq!(StreamQuality::parse("huge"), None);
    }
}
