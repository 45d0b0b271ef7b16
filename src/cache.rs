use crate::error::Result;
use crate::model::StreamQuality;
use crate::providers::{
    RelatedProvider, SearchProvider, SearchResults, StreamInfo, StreamProvider, VideoInfo,
    VideoInfoProvider,
};
use moka::sync::Cache;
use std::time::Duration;
use tracing::debug;

pub const SEARCH_TTL: Duration = Duration::from_secs(5 * 60);
pub const VIDEO_INFO_TTL: Duration = Duration::from_secs(30 * 60);
// stream URLs expire upstream, keep them short
pub const STREAM_TTL: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_CAPACITY: u64 = 1000;

/// Per-kind TTL and capacity of a [`CachedBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub search_ttl: Duration,
    pub video_info_ttl: Duration,
    pub stream_ttl: Duration,
    pub max_capacity: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            search_ttl: SEARCH_TTL,
            video_info_ttl: VIDEO_INFO_TTL,
            stream_ttl: STREAM_TTL,
            max_capacity: DEFAULT_CAPACITY,
        }
    }
}

fn build<K, V>(max_capacity: u64, ttl: Duration) -> Cache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(max_capacity)
        .time_to_live(ttl)
        .build()
}

/// Remembers successful search, info and stream answers of the wrapped
/// backend. Failures and related-video lookups always go through.
pub struct CachedBackend<B> {
    inner: B,
    search: Cache<(String, u8), SearchResults>,
    info: Cache<String, VideoInfo>,
    stream: Cache<(String, StreamQuality), StreamInfo>,
}

impl<B> CachedBackend<B> {
    pub fn new(inner: B) -> Self {
        Self::with_policy(inner, CachePolicy::default())
    }

    pub fn with_policy(inner: B, policy: CachePolicy) -> Self {
        Self {
            inner,
            search: build(policy.max_capacity / 2, policy.search_ttl),
            info: build(policy.max_capacity * 2, policy.video_info_ttl),
            stream: build(policy.max_capacity / 4, policy.stream_ttl),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Live entries over all three caches, after pending evictions ran.
    pub fn entry_count(&self) -> u64 {
        self.search.run_pending_tasks();
        self.info.run_pending_tasks();
        self.stream.run_pending_tasks();
        self.search.entry_count() + self.info.entry_count() + self.stream.entry_count()
    }

    pub fn clear(&self) {
        self.search.invalidate_all();
        self.info.invalidate_all();
        self.stream.invalidate_all();
    }
}

impl<B: SearchProvider> SearchProvider for CachedBackend<B> {
    fn search(&self, query: &str, max_results: u8) -> Result<SearchResults> {
        let key = (query.trim().to_lowercase(), max_results);
        if let Some(hit) = self.search.get(&key) {
            debug!(query = %key.0, "search cache hit");
            return Ok(hit);
        }
        let results = self.inner.search(query, max_results)?;
        self.search.insert(key, results.clone());
        Ok(results)
    }
}

impl<B: VideoInfoProvider> VideoInfoProvider for CachedBackend<B> {
    fn video_info(&self, external_id: &str) -> Result<VideoInfo> {
        if let Some(hit) = self.info.get(external_id) {
            return Ok(hit);
        }
        let info = self.inner.video_info(external_id)?;
        self.info.insert(external_id.to_string(), info.clone());
        Ok(info)
    }
}

impl<B: StreamProvider> StreamProvider for CachedBackend<B> {
    fn stream_url(&self, external_id: &str, quality: StreamQuality) -> Result<StreamInfo> {
        let key = (external_id.to_string(), quality);
        if let Some(hit) = self.stream.get(&key) {
            return Ok(hit);
        }
        let stream = self.inner.stream_url(external_id, quality)?;
        self.stream.insert(key, stream.clone());
        Ok(stream)
    }
}

impl<B: RelatedProvider> RelatedProvider for CachedBackend<B> {
    fn related(&self, seed: &str) -> Result<Vec<String>> {
        self.inner.related(seed)
    }
}
