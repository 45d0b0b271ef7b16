//! Remote collaborators the player talks to, and the shapes they answer with.

use crate::error::{Error, Result, UpstreamError};
use crate::model::{QueueEntry, StreamQuality};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    #[serde(rename = "id")]
    pub external_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_title: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(
        rename = "duration",
        default,
        deserialize_with = "deserialize_duration"
    )]
    pub duration_seconds: u32,
}

impl SearchItem {
    pub fn to_entry(&self) -> QueueEntry {
        QueueEntry::new(
            self.external_id.clone(),
            self.title.clone(),
            self.duration_seconds,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub items: Vec<SearchItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub title: String,
    #[serde(
        rename = "duration",
        default,
        deserialize_with = "deserialize_duration"
    )]
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub url: String,
    #[serde(
        rename = "duration",
        default,
        deserialize_with = "deserialize_duration"
    )]
    pub duration_seconds: u32,
}

pub trait SearchProvider {
    fn search(&self, query: &str, max_results: u8) -> Result<SearchResults>;
}

pub trait VideoInfoProvider {
    /// `Error::NotFound` when the video does not exist.
    fn video_info(&self, external_id: &str) -> Result<VideoInfo>;
}

pub trait StreamProvider {
    /// `UpstreamError::Unavailable` when no stream of that quality exists.
    fn stream_url(&self, external_id: &str, quality: StreamQuality) -> Result<StreamInfo>;
}

pub trait RelatedProvider {
    /// Ids of videos related to `seed`, best match first.
    fn related(&self, seed: &str) -> Result<Vec<String>>;
}

/// Everything the dispatcher needs from one backend. Shared by all of its
/// worker lanes.
pub trait Backend:
    SearchProvider + VideoInfoProvider + StreamProvider + RelatedProvider + Send + Sync + 'static
{
}

impl<T> Backend for T where
    T: SearchProvider + VideoInfoProvider + StreamProvider + RelatedProvider + Send + Sync + 'static
{
}

/// Parses `PT1H2M3S`-style durations. Date parts other than days are
/// rejected since videos never carry them.
pub fn parse_iso8601_duration(raw: &str) -> Option<u32> {
    let rest = raw.trim().strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut total: u64 = 0;
    let mut any = false;
    for (value, unit) in components(date)? {
        let unit_seconds = match unit {
            'D' => 86_400,
            'W' => 7 * 86_400,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(unit_seconds)?)?;
        any = true;
    }
    if let Some(time) = time {
        if time.is_empty() {
            return None;
        }
        for (value, unit) in components(time)? {
            let unit_seconds = match unit {
                'H' => 3_600,
                'M' => 60,
                'S' => 1,
                _ => return None,
            };
            total = total.checked_add(value.checked_mul(unit_seconds)?)?;
            any = true;
        }
    }

    if !any {
        return None;
    }
    u32::try_from(total).ok()
}

fn components(part: &str) -> Option<Vec<(u64, char)>> {
    let mut out = Vec::new();
    let mut digits = String::new();
    for ch in part.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if ch == '.' || ch == ',' {
            // fractional seconds are truncated
            digits.push('.');
        } else {
            if digits.is_empty() {
                return None;
            }
            let whole = digits.split('.').next().unwrap_or_default();
            out.push((whole.parse().ok()?, ch));
            digits.clear();
        }
    }
    if !digits.is_empty() {
        return None;
    }
    Some(out)
}

/// Parses `m:ss` or `h:mm:ss` clock strings.
pub fn parse_clock_duration(raw: &str) -> Option<u32> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    let mut total: u32 = 0;
    for part in parts {
        let value: u32 = part.parse().ok()?;
        total = total.checked_mul(60)?.checked_add(value)?;
    }
    Some(total)
}

/// Normalizes whatever the backend sent as a duration into whole seconds.
/// Unknown shapes become 0.
pub fn duration_from_value(value: &Value) -> u32 {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
            .and_then(|secs| u32::try_from(secs).ok())
            .unwrap_or(0),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u32>()
                .ok()
                .or_else(|| parse_iso8601_duration(text))
                .or_else(|| parse_clock_duration(text))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(duration_from_value(&value))
}

#[derive(Debug, Clone)]
struct CatalogVideo {
    title: String,
    duration_seconds: u32,
    channel_title: Option<String>,
}

/// In-process backend over a fixed catalog. Backs `--offline` and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    videos: Vec<(String, CatalogVideo)>,
    related: HashMap<String, Vec<String>>,
    unavailable: Vec<String>,
    failing: bool,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two placeholder videos the backend answers with when it has no
    /// search API available.
    pub fn demo() -> Self {
        Self::new()
            .with_video("dQw4w9WgXcQ", "Sample video 1", 212)
            .with_video("jNQXAC9IVRw", "Sample video 2", 255)
            .with_related("dQw4w9WgXcQ", &["jNQXAC9IVRw"])
            .with_related("jNQXAC9IVRw", &["dQw4w9WgXcQ"])
    }

    pub fn with_video(mut self, id: &str, title: &str, duration_seconds: u32) -> Self {
        self.videos.retain(|(existing, _)| existing != id);
        self.videos.push((
            id.to_string(),
            CatalogVideo {
                title: title.to_string(),
                duration_seconds,
                channel_title: None,
            },
        ));
        self
    }

    pub fn with_channel(mut self, id: &str, channel: &str) -> Self {
        if let Some((_, video)) = self.videos.iter_mut().find(|(existing, _)| existing == id) {
            video.channel_title = Some(channel.to_string());
        }
        self
    }

    pub fn with_related(mut self, seed: &str, ids: &[&str]) -> Self {
        self.related.insert(
            seed.to_string(),
            ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }

    pub fn with_unavailable_stream(mut self, id: &str) -> Self {
        self.unavailable.push(id.to_string());
        self
    }

    /// Every call fails as if the backend were down.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn check_up(&self) -> Result<()> {
        if self.failing {
            return Err(Error::upstream("backend unreachable"));
        }
        Ok(())
    }

    fn video(&self, id: &str) -> Option<&CatalogVideo> {
        self.videos
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, video)| video)
    }
}

impl SearchProvider for StaticCatalog {
    fn search(&self, query: &str, max_results: u8) -> Result<SearchResults> {
        self.check_up()?;
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("search query is required"));
        }
        let needle = query.to_lowercase();
        let items = self
            .videos
            .iter()
            .filter(|(_, video)| {
                needle == "*" || video.title.to_lowercase().contains(&needle)
            })
            .take(usize::from(max_results))
            .map(|(id, video)| SearchItem {
                external_id: id.clone(),
                title: video.title.clone(),
                channel_title: video.channel_title.clone(),
                published_at: None,
                duration_seconds: video.duration_seconds,
            })
            .collect();
        Ok(SearchResults {
            items,
            next_page_token: None,
        })
    }
}

impl VideoInfoProvider for StaticCatalog {
    fn video_info(&self, external_id: &str) -> Result<VideoInfo> {
        self.check_up()?;
        let video = self
            .video(external_id)
            .ok_or_else(|| Error::not_found("video", external_id))?;
        Ok(VideoInfo {
            title: video.title.clone(),
            duration_seconds: video.duration_seconds,
        })
    }
}

impl StreamProvider for StaticCatalog {
    fn stream_url(&self, external_id: &str, quality: StreamQuality) -> Result<StreamInfo> {
        self.check_up()?;
        let video = self
            .video(external_id)
            .ok_or_else(|| Error::not_found("video", external_id))?;
        if self.unavailable.iter().any(|id| id == external_id) {
            return Err(UpstreamError::Unavailable(external_id.to_string()).into());
        }
        Ok(StreamInfo {
            url: format!(
                "https://stream.invalid/{external_id}?quality={}",
                quality.as_query()
            ),
            duration_seconds: video.duration_seconds,
        })
    }
}

impl RelatedProvider for StaticCatalog {
    fn related(&self, seed: &str) -> Result<Vec<String>> {
        self.check_up()?;
        Ok(self.related.get(seed).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn iso_durations() {
        assert_eq!(parse_iso8601_duration("PT4M13S"), Some(253));
        assert_eq!(parse_iso8601_duration("PT1H"), Some(3600));
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401));
        assert_eq!(parse_iso8601_duration("PT12.5S"), Some(12));
        assert_eq!(parse_iso8601_duration("PT"), None);
        assert_eq!(parse_iso8601_duration("P"), None);
        assert_eq!(parse_iso8601_duration("4M13S"), None);
        assert_eq!(parse_iso8601_duration("PTMS"), None);
        assert_eq!(parse_iso8601_duration("P999999999999999W"), None);
        assert_eq!(parse_iso8601_duration("PT18446744073709551615H"), None);
        assert_eq!(parse_iso8601_duration("P49711D"), None);
    }

    #[test]
    fn oversized_duration_decodes_as_unknown() {
        let info: VideoInfo =
            serde_json::from_value(json!({"title": "Long", "duration": "P999999999999999W"}))
                .expect("decode");
        assert_eq!(info.duration_seconds, 0);
    }

    #[test]
    fn clock_durations() {
        assert_eq!(parse_clock_duration("3:32"), Some(212));
        assert_eq!(parse_clock_duration("1:02:03"), Some(3723));
        assert_eq!(parse_clock_duration("212"), None);
        assert_eq!(parse_clock_duration("a:bc"), None);
    }

    #[test]
    fn durations_accept_every_backend_shape() {
        assert_eq!(duration_from_value(&json!(253)), 253);
        assert_eq!(duration_from_value(&json!(253.9)), 253);
        assert_eq!(duration_from_value(&json!("PT4M13S")), 253);
        assert_eq!(duration_from_value(&json!("4:13")), 253);
        assert_eq!(duration_from_value(&json!("253")), 253);
        assert_eq!(duration_from_value(&json!(null)), 0);
        assert_eq!(duration_from_value(&json!(-5)), 0);
    }

    #[test]
    fn search_response_decodes() {
        let body = json!({
            "items": [
                {"id": "abc", "title": "Song", "channelTitle": "Chan", "duration": null},
                {"id": "def", "title": "Other", "duration": "3:32", "viewCount": "1,000 views"}
            ],
            "nextPageToken": "tok",
            "totalResults": 2
        });
        let results: SearchResults = serde_json::from_value(body).expect("decode");
        assert_eq!(results.items.len(), 2);
        assert_eq!(results.items[0].channel_title.as_deref(), Some("Chan"));
        assert_eq!(results.items[0].duration_seconds, 0);
        assert_eq!(results.items[1].duration_seconds, 212);
        assert_eq!(results.next_page_token.as_deref(), Some("tok"));
    }

    #[test]
    fn catalog_search_and_lookup() {
        let catalog = StaticCatalog::new()
            .with_video("a", "Daft Punk - One More Time", 320)
            .with_video("b", "Lo-fi beats", 3600)
            .with_channel("a", "Daft Punk");

        let results = catalog.search("daft", 10).expect("search");
        assert_eq!(results.items.len(), 1);
        assert_eq!(results.items[0].to_entry(), QueueEntry::new("a", "Daft Punk - One More Time", 320));

        assert!(catalog.video_info("zzz").expect_err("missing").is_not_found());
        assert!(catalog.search("  ", 10).expect_err("empty").is_validation());
    }

    #[test]
    fn catalog_unavailable_stream_is_upstream() {
        let catalog = StaticCatalog::new()
            .with_video("a", "A", 10)
            .with_unavailable_stream("a");
        let err = catalog
            .stream_url("a", StreamQuality::Audio)
            .expect_err("unavailable");
        assert!(matches!(err, Error::Upstream(UpstreamError::Unavailable(_))));
    }

    proptest! {
        #[test]
        fn iso_round_trip(h in 0u32..24, m in 0u32..60, s in 0u32..60) {
            let raw = format!("PT{h}H{m}M{s}S");
            prop_assert_eq!(parse_iso8601_duration(&raw), Some(h * 3600 + m * 60 + s));
        }
    }
}
