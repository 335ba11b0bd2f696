//! External size-data providers and their process-wide memoization layer.
//!
//! Two lookups feed size resolution: a device-viewport dataset mapping named
//! device keywords to concrete sizes, and a "popular resolutions" source
//! listing the ten most common desktop resolutions. Both are network calls,
//! so results are cached behind [`ProviderCache`]: each distinct input fires
//! the underlying provider at most once per cache lifetime, and concurrent
//! identical lookups coalesce into a single in-flight call.

use crate::PagesnapError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// A device keyword resolved to a concrete `<width>x<height>` size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordViewport {
    pub keyword: String,
    pub size: String,
}

/// Maps named device keywords to concrete viewport sizes.
///
/// Unknown keywords must be reported as an error, not silently dropped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ViewportProvider: Send + Sync {
    async fn lookup(&self, keywords: Vec<String>) -> Result<Vec<KeywordViewport>, PagesnapError>;
}

/// Returns an ordered list of commonly used screen resolutions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResolutionProvider: Send + Sync {
    async fn top_resolutions(&self) -> Result<Vec<String>, PagesnapError>;
}

/// Read-many, write-once memoization over the two providers.
///
/// Owned by the orchestrator rather than hidden in module state, so tests can
/// construct a fresh cache per run. The lock is held across the provider
/// call, which is what guarantees that concurrent first-access for the same
/// input results in exactly one underlying lookup.
pub struct ProviderCache {
    viewports: Arc<dyn ViewportProvider>,
    resolutions: Arc<dyn ResolutionProvider>,
    viewport_results: Mutex<HashMap<Vec<String>, Vec<String>>>,
    resolution_results: Mutex<Option<Vec<String>>>,
}

impl ProviderCache {
    pub fn new(
        viewports: Arc<dyn ViewportProvider>,
        resolutions: Arc<dyn ResolutionProvider>,
    ) -> Self {
        Self {
            viewports,
            resolutions,
            viewport_results: Mutex::new(HashMap::new()),
            resolution_results: Mutex::new(None),
        }
    }

    /// Resolve a keyword list to sizes, memoized per distinct keyword list.
    pub async fn viewports(&self, keywords: &[String]) -> Result<Vec<String>, PagesnapError> {
        let key: Vec<String> = keywords.to_vec();
        let mut results = self.viewport_results.lock().await;

        if let Some(sizes) = results.get(&key) {
            return Ok(sizes.clone());
        }

        debug!(keywords = ?key, "viewport lookup");
        let entries = self.viewports.lookup(key.clone()).await?;
        let sizes: Vec<String> = entries.into_iter().map(|entry| entry.size).collect();
        results.insert(key, sizes.clone());
        Ok(sizes)
    }

    /// Fetch the popular-resolutions list, memoized for the cache lifetime.
    pub async fn top_resolutions(&self) -> Result<Vec<String>, PagesnapError> {
        let mut cached = self.resolution_results.lock().await;

        if let Some(sizes) = cached.as_ref() {
            return Ok(sizes.clone());
        }

        debug!("popular-resolutions lookup");
        let sizes = self.resolutions.top_resolutions().await?;
        *cached = Some(sizes.clone());
        Ok(sizes)
    }
}

const VIEWPORT_DATA_URL: &str =
    "https://raw.githubusercontent.com/kevva/viewport-list/master/data.json";

const GLOBAL_STATS_URL: &str = "https://www.w3counter.com/globalstats.php";

#[derive(Debug, Deserialize)]
struct ViewportRecord {
    name: String,
    size: String,
}

/// Viewport lookup against the public viewport-list dataset.
pub struct HttpViewportProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpViewportProvider {
    pub fn new() -> Self {
        Self::with_endpoint(VIEWPORT_DATA_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpViewportProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_keyword(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[async_trait]
impl ViewportProvider for HttpViewportProvider {
    async fn lookup(&self, keywords: Vec<String>) -> Result<Vec<KeywordViewport>, PagesnapError> {
        let records: Vec<ViewportRecord> = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut entries = Vec::new();
        for keyword in &keywords {
            let needle = normalize_keyword(keyword);
            let mut matched = false;

            for record in &records {
                if normalize_keyword(&record.name).contains(&needle) {
                    matched = true;
                    entries.push(KeywordViewport {
                        keyword: keyword.clone(),
                        size: record.size.to_lowercase(),
                    });
                }
            }

            if !matched {
                return Err(PagesnapError::UnknownKeyword(keyword.clone()));
            }
        }

        Ok(entries)
    }
}

/// Popular-resolution lookup scraping the w3counter global stats page.
pub struct HttpResolutionProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpResolutionProvider {
    pub fn new() -> Self {
        Self::with_endpoint(GLOBAL_STATS_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpResolutionProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull `<width> x <height>` occurrences out of the stats markup, first
/// occurrence order, capped at the historical list length of ten.
fn extract_resolutions(html: &str) -> Vec<String> {
    let mut sizes = Vec::new();
    let bytes = html.as_bytes();
    let mut i = 0;

    while i < bytes.len() && sizes.len() < 10 {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let width = &html[start..i];

        let mut j = i;
        while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
            j += 1;
        }
        if j >= bytes.len() || (bytes[j] != b'x' && bytes[j] != b'X') {
            continue;
        }
        j += 1;
        while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
            j += 1;
        }

        let height_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j == height_start {
            continue;
        }
        let height = &html[height_start..j];

        if (2..=4).contains(&width.len()) && (2..=4).contains(&height.len()) {
            let size = format!("{width}x{height}");
            if !sizes.contains(&size) {
                sizes.push(size);
            }
        }
        i = j;
    }

    sizes
}

#[async_trait]
impl ResolutionProvider for HttpResolutionProvider {
    async fn top_resolutions(&self) -> Result<Vec<String>, PagesnapError> {
        let body = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let sizes = extract_resolutions(&body);
        if sizes.is_empty() {
            return Err(PagesnapError::LookupFailed(
                "no resolutions found in stats page".to_string(),
            ));
        }

        Ok(sizes)
    }
}
