//! ureq client for the Streamly backend's JSON routes.

use crate::error::{Error, Result, UpstreamError};
use crate::model::StreamQuality;
use crate::providers::{
    RelatedProvider, SearchItem, SearchProvider, SearchResults, StreamInfo, StreamProvider,
    VideoInfo, VideoInfoProvider,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use ureq::Agent;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl Health {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RelatedBody {
    Ids(Vec<String>),
    Items { items: Vec<SearchItem> },
}

#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    agent: Agent,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char);
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            agent: build_agent(timeout),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health(&self) -> Result<Health> {
        self.get_json("/api/health", &[], None)
    }

    fn video_path(&self, external_id: &str, tail: &str) -> Result<String> {
        let id = external_id.trim();
        if id.is_empty() {
            return Err(Error::validation("video id is required"));
        }
        Ok(format!("/api/video/{}/{tail}", percent_encode(id)))
    }

    /// GETs `path` and decodes the JSON body. A 404 becomes `NotFound` for
    /// `missing` when given, otherwise an upstream status error.
    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        missing: Option<(&'static str, &str)>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.agent.get(&url);
        for (key, value) in query {
            request = request.query(*key, value);
        }

        debug!(url = %url, "backend request");
        let mut response = request.call().map_err(UpstreamError::from)?;
        let status = response.status().as_u16();
        if status == 404
            && let Some((kind, id)) = missing
        {
            return Err(Error::not_found(kind, id));
        }
        if !(200..300).contains(&status) {
            warn!(url = %url, status, "backend answered with an error");
            return Err(UpstreamError::Status(status).into());
        }

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(UpstreamError::from)?;
        serde_json::from_str(&body)
            .map_err(|err| UpstreamError::Decode(format!("{path}: {err}")).into())
    }
}

impl SearchProvider for HttpBackend {
    fn search(&self, query: &str, max_results: u8) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("search query is required"));
        }
        let mut results: SearchResults = self.get_json(
            "/api/search",
            &[
                ("q", query.to_string()),
                ("maxResults", max_results.to_string()),
            ],
            None,
        )?;
        results.items.retain(|item| !item.external_id.trim().is_empty());
        Ok(results)
    }
}

impl VideoInfoProvider for HttpBackend {
    fn video_info(&self, external_id: &str) -> Result<VideoInfo> {
        let path = self.video_path(external_id, "info")?;
        self.get_json(&path, &[], Some(("video", external_id)))
    }
}

impl StreamProvider for HttpBackend {
    fn stream_url(&self, external_id: &str, quality: StreamQuality) -> Result<StreamInfo> {
        let path = self.video_path(external_id, "stream")?;
        let query = [("quality", quality.as_query())];
        match self.get_json::<StreamInfo>(&path, &query, Some(("stream", external_id))) {
            Err(Error::NotFound { .. }) => {
                Err(UpstreamError::Unavailable(external_id.to_string()).into())
            }
            Ok(info) if info.url.trim().is_empty() => {
                Err(UpstreamError::Unavailable(external_id.to_string()).into())
            }
            other => other,
        }
    }
}

impl RelatedProvider for HttpBackend {
    fn related(&self, seed: &str) -> Result<Vec<String>> {
        let path = self.video_path(seed, "related")?;
        let body: RelatedBody = self.get_json(&path, &[], Some(("video", seed)))?;
        let ids = match body {
            RelatedBody::Ids(ids) => ids,
            RelatedBody::Items { items } => {
                items.into_iter().map(|item| item.external_id).collect()
            }
        };
        Ok(ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped() {
        let backend = HttpBackend::new("http://localhost:3000/ ", DEFAULT_TIMEOUT);
        assert_eq!(backend.base_url(), "http://localhost:3000");
    }

    #[test]
    fn ids_are_percent_encoded_in_paths() {
        let backend = HttpBackend::new("http://localhost:3000", DEFAULT_TIMEOUT);
        let path = backend.video_path("a b/c", "info").expect("path");
        assert_eq!(path, "/api/video/a%20b%2Fc/info");
        assert!(backend.video_path("  ", "info").expect_err("empty").is_validation());
    }

    #[test]
    fn related_body_accepts_ids_or_items() {
        let ids: RelatedBody = serde_json::from_str(r#"["a","b"]"#).expect("ids");
        assert!(matches!(ids, RelatedBody::Ids(ref v) if v.len() == 2));

        let items: RelatedBody =
            serde_json::from_str(r#"{"items":[{"id":"a","title":"A"}]}"#).expect("items");
        assert!(matches!(items, RelatedBody::Items { ref items } if items[0].external_id == "a"));
    }
}
