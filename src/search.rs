//! The search module looks up real product photos through remote image search
//! services, gated by the image cache.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rate_guard::{RateLimit, StdTokenBucket, TokenBucketBuilder};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::constants::{BING_IMAGE_ENDPOINT, BROWSER_USER_AGENT, IMAGE_API_KEY_ENV_NAMES};
use crate::storage::{CacheLookup, ImageCache, cache_key};

/// A remote service able to find an image for a free-text query.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Returns the URL of the best matching image.
    ///
    /// `Ok(None)` means the service answered but had nothing usable.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or non-success statuses.
    async fn search(&self, query: &str) -> Result<Option<String>>;
}

/// Bing Image Search v7 client.
pub struct BingImageSearch {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl BingImageSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: BING_IMAGE_ENDPOINT.to_string(),
        }
    }

    /// Points the client at another endpoint with the same API.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct BingResponse {
    #[serde(default)]
    value: Vec<BingImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingImage {
    content_url: Option<String>,
    thumbnail_url: Option<String>,
}

#[async_trait]
impl ImageSearch for BingImageSearch {
    async fn search(&self, query: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .query(&[
                ("q", query),
                ("count", "1"),
                ("mkt", "zh-CN"),
                ("safeSearch", "Strict"),
                ("imageType", "Photo"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Bing Image Search request failed: {status}");
        }

        let body: BingResponse = response
            .json()
            .await
            .context("Unable to decode Bing Image Search response")?;

        Ok(body.value.into_iter().next().and_then(|image| {
            image
                .content_url
                .or(image.thumbnail_url)
                .filter(|url| url.starts_with("http"))
        }))
    }
}

/// MediaWiki page image search, used when downloading images for placeholders.
pub struct WikipediaImageSearch {
    client: Client,
    endpoint: String,
}

const WIKIPEDIA_THUMB_SIZE: &str = "600";

impl WikipediaImageSearch {
    /// Creates a client for the Wikipedia of `lang`, e.g. `zh` or `en`.
    pub fn new(lang: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("https://{lang}.wikipedia.org/w/api.php"),
        }
    }
}

#[async_trait]
impl ImageSearch for WikipediaImageSearch {
    async fn search(&self, query: &str) -> Result<Option<String>> {
        let payload: Value = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(12))
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "pageimages"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrlimit", "1"),
                ("piprop", "thumbnail|original"),
                ("pithumbsize", WIKIPEDIA_THUMB_SIZE),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let pages = match payload.pointer("/query/pages").and_then(Value::as_object) {
            Some(pages) => pages,
            None => return Ok(None),
        };

        Ok(pages.values().find_map(|page| {
            page.pointer("/original/source")
                .and_then(Value::as_str)
                .or_else(|| page.pointer("/thumbnail/source").and_then(Value::as_str))
                .map(str::to_string)
        }))
    }
}

/// Reads the image search API key from the environment.
///
/// Empty values count as absent, which turns remote image search off.
pub fn image_api_key_from_env() -> Option<String> {
    IMAGE_API_KEY_ENV_NAMES.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Shared settings of the image enrichment loop.
pub struct SearchContext<'a> {
    /// Remote search service; `None` disables all network lookups.
    pub search: Option<&'a dyn ImageSearch>,
    /// Pause after every answered request.
    pub delay: Duration,
    /// Optional requests-per-minute limit on top of the fixed delay.
    pub rate_limiter: Option<&'a StdTokenBucket>,
}

impl SearchContext<'_> {
    /// A context that never touches the network.
    pub fn disabled() -> Self {
        SearchContext {
            search: None,
            delay: Duration::ZERO,
            rate_limiter: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.search.is_some()
    }
}

/// Builds a token bucket allowing `rpm` requests per minute.
pub fn rate_limiter(rpm: u32) -> Option<StdTokenBucket> {
    let capacity = rpm.max(1) as u64;
    let refill_interval = Duration::from_secs_f64(60.0 / capacity as f64);

    TokenBucketBuilder::builder()
        .capacity(capacity)
        .refill_amount(1_u64)
        .refill_every(refill_interval)
        .with_time(rate_guard::StdTimeSource::new())
        .with_precision::<rate_guard::Nanos>()
        .build()
        .ok()
}

/// Search query for a brand/generic pair.
pub fn image_query(brand_name: &str, generic_name: &str) -> String {
    format!("{brand_name} {generic_name} 药品 原研")
}

/// Looks up a real image for an item, asking the remote service only when the
/// cache has nothing usable.
///
/// Every remote attempt is recorded in the cache, failures as negative
/// results, so a broken service is not hammered on the next run.
pub async fn fetch_real_image(
    brand_name: &str,
    generic_name: &str,
    cache: &mut ImageCache,
    ctx: &SearchContext<'_>,
    now: DateTime<Utc>,
) -> Option<String> {
    let search = ctx.search?;

    let key = cache_key(brand_name, generic_name);
    match cache.lookup(&key, now) {
        CacheLookup::Hit(url) => return Some(url),
        CacheLookup::Negative => {
            debug!("Skipping {brand_name}, no image found recently");
            return None;
        }
        CacheLookup::Miss => {}
    }

    if let Some(limiter) = ctx.rate_limiter {
        while limiter.try_acquire(1).is_err() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    match search.search(&image_query(brand_name, generic_name)).await {
        Ok(image_url) => {
            debug!("Image search for {brand_name}: {image_url:?}");
            cache.record(&key, image_url.clone(), Utc::now());
            if !ctx.delay.is_zero() {
                tokio::time::sleep(ctx.delay).await;
            }
            image_url
        }
        Err(err) => {
            warn!("Failed to fetch image for {brand_name}: {err:#}");
            cache.record(&key, None, Utc::now());
            None
        }
    }
}
