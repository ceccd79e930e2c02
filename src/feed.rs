//! Prayer times feed
//!
//! The feed is a set of static JSON files: `mosque-index.json` listing every
//! mosque (with its Jummah schedule) and `data/<slug>.json` holding a mosque's
//! daily timings.

use crate::cache::{QueryCache, QuerySnapshot};
use crate::config::Config;
use crate::error::{MosqueTimesError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MosqueIndex {
    pub mosques: Vec<MosqueIndexEntry>,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MosqueIndexEntry {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub data_file: String,
    #[serde(default)]
    pub has_data: bool,
    #[serde(default)]
    pub jummah_schedule: Vec<JummahSlot>,
}

/// Friday prayer times for one date
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct JummahSlot {
    /// `DD-MM-YYYY`
    pub date: String,
    #[serde(default)]
    pub times: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MosqueData {
    pub mosque_name: String,
    #[serde(default)]
    pub timings: Vec<PrayerTiming>,
}

/// One day of published prayer times; every field is an untrusted string
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PrayerTiming {
    pub day: String,
    pub date: String,
    pub fajr: String,
    /// May hold several space separated times; the first one is the prayer
    pub zuhr: String,
    pub asr: String,
    pub magrib: String,
    pub isha: String,
}

impl MosqueIndex {
    #[must_use]
    pub fn find(&self, slug: &str) -> Option<&MosqueIndexEntry> {
        self.mosques.iter().find(|mosque| mosque.slug == slug)
    }

    /// Mosques that publish prayer timings
    pub fn available(&self) -> impl Iterator<Item = &MosqueIndexEntry> {
        self.mosques.iter().filter(|mosque| mosque.has_data)
    }
}

/// Checks that a slug is safe to place in a feed path
///
/// # Errors
///
/// Returns an error for empty slugs or slugs containing anything but ASCII
/// letters, digits, `-` and `_`
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.trim().is_empty() {
        return Err(MosqueTimesError::from("Mosque slug cannot be empty"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(MosqueTimesError::from(format!("Invalid mosque slug: {slug}")));
    }
    Ok(())
}

/// HTTP client for the feed with a fixed retry budget
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    base_url: Url,
    retries: u32,
    retry_base_delay: Duration,
}

impl FeedClient {
    /// Builds a client from the feed settings in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the feed URL is invalid or the HTTP client cannot
    /// be constructed
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.feed_base()?,
            retries: config.fetch_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches `mosque-index.json`
    ///
    /// # Errors
    ///
    /// Returns an error once every attempt failed
    pub async fn mosque_index(&self) -> Result<MosqueIndex> {
        let url = self.base_url.join("mosque-index.json")?;
        let index: MosqueIndex = self.get_json(&url).await?;
        info!("Fetched mosque index with {} mosques", index.mosques.len());
        Ok(index)
    }

    /// Fetches `data/<slug>.json`
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid slug or once every attempt failed
    pub async fn mosque_data(&self, slug: &str) -> Result<MosqueData> {
        validate_slug(slug)?;
        let url = self.base_url.join(&format!("data/{slug}.json"))?;
        let data: MosqueData = self.get_json(&url).await?;
        info!(
            "Fetched {} days of timings for {}",
            data.timings.len(),
            data.mosque_name
        );
        Ok(data)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.get_json_once(url).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retries => {
                    let delay = retry_delay(self.retry_base_delay, attempt);
                    warn!("Request to {url} failed ({e}), retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        debug!("Fetching {url}");
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MosqueTimesError::FetchStatus {
                url: url.to_string(),
                status,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

const INDEX_KEY: &str = "mosque-index";

/// Cached access to the feed
///
/// The index and every mosque's timings are cached separately, each with its
/// own staleness window.
pub struct FeedService {
    client: FeedClient,
    index: QueryCache<MosqueIndex>,
    mosques: QueryCache<MosqueData>,
}

impl FeedService {
    /// # Errors
    ///
    /// Returns an error if the feed client cannot be built from `config`
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: FeedClient::new(config)?,
            index: QueryCache::new(
                "mosque index",
                config.index_stale_time(),
                config.index_gc_time(),
            ),
            mosques: QueryCache::new(
                "mosque data",
                config.data_stale_time(),
                config.data_gc_time(),
            ),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the index is not cached and cannot be fetched
    pub async fn mosque_index(&self) -> Result<Arc<MosqueIndex>> {
        self.index
            .fetch(INDEX_KEY, || self.client.mosque_index())
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the index cannot be fetched
    pub async fn refetch_mosque_index(&self) -> Result<Arc<MosqueIndex>> {
        self.index
            .refetch(INDEX_KEY, || self.client.mosque_index())
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the timings are not cached and cannot be fetched
    pub async fn mosque_data(&self, slug: &str) -> Result<Arc<MosqueData>> {
        validate_slug(slug)?;
        self.mosques
            .fetch(slug, || self.client.mosque_data(slug))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the timings cannot be fetched
    pub async fn refetch_mosque_data(&self, slug: &str) -> Result<Arc<MosqueData>> {
        validate_slug(slug)?;
        self.mosques
            .refetch(slug, || self.client.mosque_data(slug))
            .await
    }

    /// Index entry for `slug`, or `None` when the index does not list it
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be fetched
    pub async fn mosque_by_slug(&self, slug: &str) -> Result<Option<MosqueIndexEntry>> {
        Ok(self.mosque_index().await?.find(slug).cloned())
    }

    /// Mosques that publish timings
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be fetched
    pub async fn available_mosques(&self) -> Result<Vec<MosqueIndexEntry>> {
        Ok(self.mosque_index().await?.available().cloned().collect())
    }

    #[must_use]
    pub fn index_snapshot(&self) -> QuerySnapshot<MosqueIndex> {
        self.index.snapshot(INDEX_KEY)
    }

    #[must_use]
    pub fn mosque_snapshot(&self, slug: &str) -> QuerySnapshot<MosqueData> {
        self.mosques.snapshot(slug)
    }

    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned
    pub fn subscribe_mosque(&self, slug: &str) -> Result<watch::Receiver<QuerySnapshot<MosqueData>>> {
        self.mosques.subscribe(slug)
    }

    /// Evicts idle cache entries, returning how many were dropped
    pub fn collect_garbage(&self) -> usize {
        self.index.collect_garbage() + self.mosques.collect_garbage()
    }
}

/// Exponential backoff capped at thirty seconds
#[must_use]
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}
