//! Per-document asset cache.
//!
//! The cache owns at most one [`AssetHandle`] per [`AssetKey`]. The first
//! `get` for a key spawns the pipeline; every later `get` returns the same
//! handle until it is aborted.
//!
//! ```text
//!  get(key) ──► entry? ──yes──► same handle (coalesced)
//!                 │
//!                 no
//!                 ▼
//!   insert pending handle ──► spawn pipeline
//!                               │
//!            fetch (retry w/ backoff) ──► process(kind) ──► resolve
//!                               ▲
//!            abort() ── cancel token ┘   (entry removed if still current)
//! ```

use super::error::AssetError;
use super::handle::{AssetHandle, AssetResult, Settled};
use super::process::{self, ProcessingLimits, ProcessingOptions};
use super::transport::AssetTransport;
use super::types::{Asset, AssetKey, AssetKind};
use super::url::AssetLocator;
use crate::config::{
    DEFAULT_ASSET_REQUEST_RETRIES, DEFAULT_MAX_INLINE_IMAGES, DEFAULT_INLINE_IMAGE_SIZE_CUTOFF,
    DEFAULT_MAX_TEXT_BOXES, DEFAULT_RETRY_BACKOFF_MS,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Bounded retry policy for transport fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay, doubled for every further retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1u32 << shift)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_ASSET_REQUEST_RETRIES,
            backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

/// Fetch and processing settings shared by every asset of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSettings {
    pub retry: RetryPolicy,
    pub limits: ProcessingLimits,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            limits: ProcessingLimits {
                max_inline_images: DEFAULT_MAX_INLINE_IMAGES,
                inline_image_size_cutoff: DEFAULT_INLINE_IMAGE_SIZE_CUTOFF,
                max_text_boxes: DEFAULT_MAX_TEXT_BOXES,
            },
        }
    }
}

/// Statistics for monitoring cache effectiveness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total `get` calls
    pub total_requests: u64,
    /// Calls answered with an existing handle
    pub coalesced_requests: u64,
    /// Transport attempts, including retries
    pub fetch_attempts: u64,
    /// Attempts that were retried
    pub retries: u64,
    /// Pipelines that resolved with an error
    pub failures: u64,
    /// Handles aborted
    pub aborted: u64,
}

impl CacheStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

struct CacheInner {
    /// `None` once the cache has been destroyed.
    entries: Mutex<Option<HashMap<AssetKey, AssetHandle>>>,
    transport: Arc<dyn AssetTransport>,
    locator: AssetLocator,
    settings: AssetSettings,
    options: ProcessingOptions,
    stats: Mutex<CacheStats>,
}

impl CacheInner {
    fn detach(&self, handle: &AssetHandle) {
        self.stats.lock().aborted += 1;
        let mut entries = self.entries.lock();
        if let Some(map) = entries.as_mut() {
            let key = handle.key();
            if map.get(&key).is_some_and(|current| current.ptr_eq(handle)) {
                map.remove(&key);
                trace!(key = %key, "Aborted asset removed from cache");
            }
        }
    }
}

/// Shared, cloneable asset cache for one document session.
#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<CacheInner>,
}

impl AssetCache {
    /// Creates a cache.
    ///
    /// # Arguments
    ///
    /// * `transport` - Fetches raw bytes
    /// * `locator` - Builds asset URLs for the document
    /// * `settings` - Retry policy and processing limits
    /// * `options` - Host-dependent processing switches
    pub fn new(
        transport: Arc<dyn AssetTransport>,
        locator: AssetLocator,
        settings: AssetSettings,
        options: ProcessingOptions,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(Some(HashMap::new())),
                transport,
                locator,
                settings,
                options,
                stats: Mutex::new(CacheStats::default()),
            }),
        }
    }

    /// Returns the handle for `key`, starting the pipeline on first request.
    ///
    /// Must be called from within a Tokio runtime. After [`destroy`](Self::destroy)
    /// this returns an already-cancelled handle and fetches nothing.
    pub fn get(&self, key: AssetKey) -> AssetHandle {
        let handle = {
            let mut entries = self.inner.entries.lock();
            let Some(map) = entries.as_mut() else {
                debug!(key = %key, "Asset requested after cache destroy");
                return AssetHandle::cancelled(key);
            };

            let mut stats = self.inner.stats.lock();
            stats.total_requests += 1;
            if let Some(existing) = map.get(&key) {
                stats.coalesced_requests += 1;
                trace!(key = %key, "Asset request coalesced");
                return existing.clone();
            }
            drop(stats);

            let handle = AssetHandle::pending(key);
            let weak = Arc::downgrade(&self.inner);
            handle.set_abort_hook(move |aborted| {
                if let Some(inner) = weak.upgrade() {
                    inner.detach(aborted);
                }
            });
            map.insert(key, handle.clone());
            handle
        };

        debug!(key = %key, transport = self.inner.transport.name(), "Asset request started");
        tokio::spawn(run_pipeline(self.clone(), handle.clone()));
        handle
    }

    /// Whether a handle for `key` is currently cached.
    pub fn contains(&self, key: &AssetKey) -> bool {
        self.inner
            .entries
            .lock()
            .as_ref()
            .is_some_and(|map| map.contains_key(key))
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.entries.lock().is_none()
    }

    /// Request URL for `key`.
    pub fn url_for(&self, key: &AssetKey) -> String {
        self.inner.locator.url(key)
    }

    pub fn locator(&self) -> &AssetLocator {
        &self.inner.locator
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.lock().clone()
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            total_requests = stats.total_requests,
            coalesced = stats.coalesced_requests,
            fetch_attempts = stats.fetch_attempts,
            retries = stats.retries,
            failures = stats.failures,
            aborted = stats.aborted,
            cached = self.len(),
            coalescing_ratio = format!("{:.1}%", stats.coalescing_ratio() * 100.0),
            "Asset cache statistics"
        );
    }

    /// Drops every cached handle. Handles already given out stay abortable.
    pub fn destroy(&self) {
        if let Some(map) = self.inner.entries.lock().take() {
            debug!(cached = map.len(), "Asset cache destroyed");
        }
    }

    async fn fetch_with_retry(&self, key: AssetKey, url: &str) -> Result<Bytes, AssetError> {
        let policy = &self.inner.settings.retry;
        let max_attempts = policy.max_attempts();

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.inner.stats.lock().fetch_attempts += 1;

            match self.inner.transport.fetch(url).await {
                Ok(data) => {
                    trace!(key = %key, attempt = attempt, bytes = data.len(), "Asset fetched");
                    return Ok(data);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    self.inner.stats.lock().retries += 1;
                    let delay = policy.delay_for(attempt);
                    warn!(
                        key = %key,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Asset fetch failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    return Err(AssetError::Transport {
                        key,
                        url: url.to_string(),
                        message: e.message,
                        status: e.status,
                        attempts: attempt,
                    });
                }
            }
        }
    }

    async fn fetch_and_process(&self, key: AssetKey) -> AssetResult {
        let url = self.inner.locator.url(&key);
        let data = self.fetch_with_retry(key, &url).await?;
        let limits = &self.inner.settings.limits;
        let options = &self.inner.options;

        match key.kind {
            AssetKind::Metadata => process::metadata(key, data),
            AssetKind::Stylesheet => process::stylesheet(key, data, options),
            AssetKind::PageSvg => {
                let svg = process::prepare_svg(key, data, limits, &self.inner.locator)?;
                let css = self.stylesheet_for(key).await?;
                Ok(process::embed_stylesheet(&svg, &css, options))
            }
            AssetKind::PageText => process::text_layer(key, data, limits),
            AssetKind::PageImg => process::image(key, data),
        }
    }

    /// Waits for the shared stylesheet on behalf of `dependent`.
    async fn stylesheet_for(&self, dependent: AssetKey) -> Result<Arc<str>, AssetError> {
        match self.get(AssetKey::stylesheet()).wait().await {
            Settled::Done(Ok(Asset::Stylesheet(css))) => Ok(css),
            Settled::Done(Ok(other)) => Err(AssetError::processing(
                dependent,
                format!("expected stylesheet, got {}", other.kind()),
            )),
            Settled::Done(Err(e)) => Err(AssetError::processing(
                dependent,
                format!("stylesheet unavailable: {}", e),
            )),
            Settled::Cancelled => Err(AssetError::processing(
                dependent,
                "stylesheet request was cancelled",
            )),
        }
    }
}

async fn run_pipeline(cache: AssetCache, handle: AssetHandle) {
    let key = handle.key();
    let token = handle.token();

    let outcome = tokio::select! {
        biased;

        _ = token.cancelled() => {
            trace!(key = %key, "Asset pipeline cancelled");
            return;
        }
        outcome = cache.fetch_and_process(key) => outcome,
    };

    if let Err(e) = &outcome {
        cache.inner.stats.lock().failures += 1;
        warn!(key = %key, error = %e, "Asset request failed");
    }
    if !handle.resolve(outcome) {
        trace!(key = %key, "Asset settled after abort, outcome dropped");
    }
}
