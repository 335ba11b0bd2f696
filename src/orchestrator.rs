//! The top-level capture engine.
//!
//! A [`Pagesnap`] owns the registered sources, merges per-source options over
//! the constructor-level defaults, resolves size tokens, fans captures out
//! under one shared concurrency bound, and either returns the results in
//! memory or hands them to the atomic persister. One capture failure aborts
//! the whole run; no partial result sets are ever returned or persisted.

use crate::{
    build_filename, resolve_sizes, split_size, AtomicPersister, CaptureExecutor, CaptureOptions,
    ChromiumRenderer, HttpResolutionProvider, HttpViewportProvider, PagesnapError, ProviderCache,
    Renderer, ResolutionProvider, RunMetrics, Screenshot, Source, Stats, ViewportProvider,
};
use dashmap::DashSet;
use futures::future::try_join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

fn plural(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

struct CaptureJob {
    url: String,
    size: String,
    options: CaptureOptions,
}

/// Captures screenshots of websites in various resolutions.
///
/// # Examples
///
/// ```rust,no_run
/// use pagesnap::{CaptureOptions, Pagesnap};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut pagesnap = Pagesnap::new(CaptureOptions {
///         delay: Some(2),
///         ..Default::default()
///     })
///     .await?;
///
///     pagesnap
///         .add_source(
///             "https://github.com",
///             vec!["480x320".to_string(), "1024x768".to_string()],
///             None,
///         )?
///         .set_destination("screenshots")?;
///
///     pagesnap.run().await?;
///     println!("{}", pagesnap.success_message());
///     Ok(())
/// }
/// ```
pub struct Pagesnap {
    options: CaptureOptions,
    sources: Vec<Source>,
    destination: Option<PathBuf>,
    concurrency: usize,
    cache: ProviderCache,
    executor: CaptureExecutor,
    persister: AtomicPersister,
    stats: Stats,
}

impl std::fmt::Debug for Pagesnap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pagesnap")
            .field("options", &self.options)
            .field("sources", &self.sources)
            .field("destination", &self.destination)
            .field("concurrency", &self.concurrency)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Pagesnap {
    /// Create an engine backed by a freshly launched headless browser and
    /// the public size-data providers.
    pub async fn new(options: CaptureOptions) -> Result<Self, PagesnapError> {
        let renderer = Arc::new(ChromiumRenderer::launch().await?);
        Ok(Self::with_backends(
            options,
            renderer,
            Arc::new(HttpViewportProvider::new()),
            Arc::new(HttpResolutionProvider::new()),
        ))
    }

    /// Create an engine with explicit backends. Used by tests to swap in
    /// mock renderers and providers.
    pub fn with_backends(
        options: CaptureOptions,
        renderer: Arc<dyn Renderer>,
        viewports: Arc<dyn ViewportProvider>,
        resolutions: Arc<dyn ResolutionProvider>,
    ) -> Self {
        let metrics = RunMetrics::new();
        Self {
            options,
            sources: Vec::new(),
            destination: None,
            concurrency: num_cpus::get() * 2,
            cache: ProviderCache::new(viewports, resolutions),
            executor: CaptureExecutor::new(renderer, metrics.clone()),
            persister: AtomicPersister::new(metrics),
            stats: Stats::default(),
        }
    }

    /// Register a page to capture.
    ///
    /// Validation happens here, not at [`run`](Self::run) time: caller
    /// mistakes surface before any network activity begins.
    pub fn add_source(
        &mut self,
        url: impl Into<String>,
        sizes: Vec<String>,
        options: Option<CaptureOptions>,
    ) -> Result<&mut Self, PagesnapError> {
        let url = url.into();
        if url.is_empty() {
            return Err(PagesnapError::UrlRequired);
        }
        if sizes.is_empty() {
            return Err(PagesnapError::SizesRequired);
        }

        self.sources.push(Source { url, sizes, options });
        Ok(self)
    }

    /// Pages registered so far.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Set the destination directory. When none is set, results are
    /// returned in memory only.
    pub fn set_destination(
        &mut self,
        directory: impl Into<PathBuf>,
    ) -> Result<&mut Self, PagesnapError> {
        let directory = directory.into();
        if directory.as_os_str().is_empty() {
            return Err(PagesnapError::DirectoryRequired);
        }

        self.destination = Some(directory);
        Ok(self)
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// Override the shared capture concurrency bound (default: twice the
    /// number of logical CPUs, across all sources and sizes).
    pub fn with_concurrency(&mut self, concurrency: usize) -> &mut Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Aggregate counters from the most recent completed run.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Capture every registered source at every resolved size.
    ///
    /// Returns the screenshots, and persists them first when a destination
    /// is set. Callers must not rely on result order matching registration
    /// order.
    pub async fn run(&mut self) -> Result<Vec<Screenshot>, PagesnapError> {
        self.stats = Stats::default();
        info!(sources = self.sources.len(), "starting capture run");

        // Resolving: expand size tokens for every source. Lookups for the
        // same input coalesce inside the provider cache.
        let cache = &self.cache;
        let resolved = try_join_all(self.sources.iter().map(|source| async move {
            let sizes = resolve_sizes(&source.sizes, cache).await?;
            Ok::<_, PagesnapError>((source, sizes))
        }))
        .await?;

        let mut urls = Vec::new();
        let mut resolved_sizes = Vec::new();
        let mut jobs = Vec::new();
        for (source, sizes) in resolved {
            urls.push(source.url.clone());
            let options = match &source.options {
                Some(overrides) => self.options.merge(overrides),
                None => self.options.clone(),
            };
            for size in sizes {
                resolved_sizes.push(size.clone());
                jobs.push(CaptureJob {
                    url: source.url.clone(),
                    size,
                    options: options.clone(),
                });
            }
        }
        debug!(captures = jobs.len(), "sizes resolved");

        // Capturing: one semaphore bounds the whole run, not each source.
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let claimed = Arc::new(DashSet::new());
        let tasks: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let executor = self.executor.clone();
                let semaphore = Arc::clone(&semaphore);
                let claimed = Arc::clone(&claimed);
                let destination = self.destination.clone();

                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| PagesnapError::Internal(e.to_string()))?;

                    let data = executor.capture(&job.url, &job.size, &job.options).await?;
                    let (width, height) = split_size(&job.size)?;
                    let filename = build_filename(
                        &job.url,
                        &job.size,
                        width,
                        height,
                        &job.options,
                        destination.as_deref(),
                        &claimed,
                    )?;

                    Ok::<Screenshot, PagesnapError>(Screenshot { data, filename })
                })
            })
            .collect();

        let joined = try_join_all(tasks)
            .await
            .map_err(|e| PagesnapError::Internal(e.to_string()))?;
        let screenshots = joined.into_iter().collect::<Result<Vec<_>, _>>()?;

        // Aggregating: stats are computed once, never partially visible.
        self.stats = Stats {
            urls: urls.iter().collect::<HashSet<_>>().len(),
            sizes: resolved_sizes.iter().collect::<HashSet<_>>().len(),
            screenshots: screenshots.len(),
        };

        if let Some(destination) = &self.destination {
            self.persister.save(&screenshots, destination).await?;
        }

        info!(
            screenshots = self.stats.screenshots,
            urls = self.stats.urls,
            sizes = self.stats.sizes,
            "capture run finished"
        );
        Ok(screenshots)
    }

    /// Human-readable summary of the last run, pluralized for 0/1/N.
    pub fn success_message(&self) -> String {
        let Stats {
            urls,
            sizes,
            screenshots,
        } = self.stats;
        format!(
            "Generated {screenshots} {} from {urls} {} and {sizes} {}",
            plural("screenshot", screenshots),
            plural("url", urls),
            plural("size", sizes),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MockRenderer;
    use crate::providers::{MockResolutionProvider, MockViewportProvider};

    fn engine_with(renderer: MockRenderer) -> Pagesnap {
        Pagesnap::with_backends(
            CaptureOptions::default(),
            Arc::new(renderer),
            Arc::new(MockViewportProvider::new()),
            Arc::new(MockResolutionProvider::new()),
        )
    }

    #[test]
    fn registration_validates_url_and_sizes() {
        let mut pagesnap = engine_with(MockRenderer::new());

        let err = pagesnap
            .add_source("", vec!["1024x768".to_string()], None)
            .unwrap_err();
        assert!(matches!(err, PagesnapError::UrlRequired));

        let err = pagesnap
            .add_source("https://example.com", Vec::new(), None)
            .unwrap_err();
        assert!(matches!(err, PagesnapError::SizesRequired));

        assert!(pagesnap.sources().is_empty());
    }

    #[test]
    fn destination_rejects_empty_path() {
        let mut pagesnap = engine_with(MockRenderer::new());
        let err = pagesnap.set_destination("").unwrap_err();
        assert!(matches!(err, PagesnapError::DirectoryRequired));
        assert!(pagesnap.destination().is_none());
    }

    #[test]
    fn success_message_pluralizes() {
        let mut pagesnap = engine_with(MockRenderer::new());
        pagesnap.stats = Stats {
            urls: 1,
            sizes: 2,
            screenshots: 2,
        };
        assert_eq!(
            pagesnap.success_message(),
            "Generated 2 screenshots from 1 url and 2 sizes"
        );

        pagesnap.stats = Stats {
            urls: 0,
            sizes: 0,
            screenshots: 0,
        };
        assert_eq!(
            pagesnap.success_message(),
            "Generated 0 screenshots from 0 urls and 0 sizes"
        );
    }
}
