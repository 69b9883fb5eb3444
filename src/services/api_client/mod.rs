use crate::config::{ApiConfig, CacheConfig};
use crate::models::*;
use anyhow::{Context, Result};
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub const VIDEO_SUMMARY_ENDPOINT: &str = "posts/summary/get";

/// Where the engine gets its data. Implementations never fail: upstream problems
/// degrade to empty collections.
#[async_trait::async_trait]
pub trait FeedDataSource: Send + Sync {
    async fn get_user_interactions(&self, username: &str) -> UserInteractions;
    /// Interactions of every user, used to find neighbours.
    async fn get_community_interactions(&self) -> UserInteractions;
    async fn get_videos(&self) -> Vec<Video>;
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    endpoint: String,
    params: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct CachedPage {
    data: Arc<Vec<serde_json::Value>>,
    fetched_at: Instant,
}

/// LRU memo of upstream pages keyed by endpoint and parameter set. Entries older
/// than `expiry` count as misses.
struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, CachedPage>>,
    expiry: Duration,
}

impl ResponseCache {
    fn new(capacity: usize, expiry: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            expiry,
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<Vec<serde_json::Value>>> {
        let mut entries = self.entries.lock();
        let fresh = entries
            .get(key)
            .map(|page| page.fetched_at.elapsed() < self.expiry);

        match fresh {
            Some(true) => entries.get(key).map(|page| page.data.clone()),
            Some(false) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: CacheKey, data: Arc<Vec<serde_json::Value>>) {
        self.entries.lock().put(
            key,
            CachedPage {
                data,
                fetched_at: Instant::now(),
            },
        );
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Client for the paginated posts API. Every request carries the `Flic-Token` header.
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    page_size: u32,
    cache: ResponseCache,
}

impl ApiClient {
    pub fn new(api: &ApiConfig, cache: &CacheConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Flic-Token",
            HeaderValue::from_str(&api.flic_token).context("invalid Flic-Token value")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(api.timeout())
            .build()
            .context("failed to build upstream HTTP client")?;

        info!(
            base_url = %api.base_url,
            cache_capacity = cache.capacity,
            cache_expiry_minutes = cache.expiry_minutes,
            "Initialized posts API client"
        );

        Ok(Self {
            http_client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            page_size: api.page_size,
            cache: ResponseCache::new(cache.capacity, cache.expiry()),
        })
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    /// Fetches one page of `endpoint`. `page` defaults to 1 and `page_size` to the
    /// configured size unless given in `params`. Any failure is logged and yields an
    /// empty list; failures are not cached.
    pub async fn fetch_paginated_data(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Arc<Vec<serde_json::Value>> {
        let key = self.cache_key(endpoint, params);

        if let Some(data) = self.cache.get(&key) {
            debug!(endpoint, "Serving page from cache");
            return data;
        }

        match self.request_page(&key).await {
            Ok(data) => {
                let data = Arc::new(data);
                self.cache.put(key, data.clone());
                data
            }
            Err(e) => {
                error!(endpoint, error = %e, "API request failed");
                Arc::new(Vec::new())
            }
        }
    }

    /// Like [`fetch_paginated_data`](Self::fetch_paginated_data), decoding each record.
    /// Records that do not decode are skipped.
    pub async fn fetch_records<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Vec<T> {
        let raw = self.fetch_paginated_data(endpoint, params).await;

        raw.iter()
            .filter_map(|value| match serde_json::from_value::<T>(value.clone()) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(endpoint, error = %e, "Skipping undecodable record");
                    None
                }
            })
            .collect()
    }

    fn cache_key(&self, endpoint: &str, params: &[(&str, &str)]) -> CacheKey {
        let mut params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        if !params.iter().any(|(k, _)| k == "page") {
            params.push(("page".to_string(), "1".to_string()));
        }
        if !params.iter().any(|(k, _)| k == "page_size") {
            params.push(("page_size".to_string(), self.page_size.to_string()));
        }
        params.sort();

        CacheKey {
            endpoint: endpoint.trim_start_matches('/').to_string(),
            params,
        }
    }

    async fn request_page(&self, key: &CacheKey) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/{}", self.base_url, key.endpoint);

        let response = self
            .http_client
            .get(&url)
            .query(&key.params)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", url))?;

        let page: PageResponse = response
            .json()
            .await
            .with_context(|| format!("invalid JSON from {}", url))?;

        debug!(endpoint = %key.endpoint, records = page.data.len(), "Fetched page");
        Ok(page.data)
    }

    async fn fetch_interactions(&self, kind: InteractionKind, username: Option<&str>) -> Vec<InteractionEvent> {
        let events: Vec<InteractionEvent> = match username {
            Some(username) => {
                self.fetch_records(kind.endpoint(), &[("username", username)])
                    .await
            }
            None => self.fetch_records(kind.endpoint(), &[]).await,
        };
        debug!(kind = %kind, username = ?username, events = events.len(), "Fetched interactions");
        events
    }

    async fn collect_interactions(&self, username: Option<&str>) -> UserInteractions {
        let (views, likes, inspired, ratings) = futures::join!(
            self.fetch_interactions(InteractionKind::View, username),
            self.fetch_interactions(InteractionKind::Like, username),
            self.fetch_interactions(InteractionKind::Inspire, username),
            self.fetch_interactions(InteractionKind::Rating, username),
        );

        let mut interactions = UserInteractions::default();
        interactions.set_events(InteractionKind::View, views);
        interactions.set_events(InteractionKind::Like, likes);
        interactions.set_events(InteractionKind::Inspire, inspired);
        interactions.set_events(InteractionKind::Rating, ratings);
        interactions
    }
}

#[async_trait::async_trait]
impl FeedDataSource for ApiClient {
    async fn get_user_interactions(&self, username: &str) -> UserInteractions {
        self.collect_interactions(Some(username)).await
    }

    async fn get_community_interactions(&self) -> UserInteractions {
        self.collect_interactions(None).await
    }

    async fn get_videos(&self) -> Vec<Video> {
        self.fetch_records(VIDEO_SUMMARY_ENDPOINT, &[]).await
    }
}
