//! Transport abstraction for fetching raw asset bytes.
//!
//! The cache only ever sees [`AssetTransport`]; concrete transports are
//! injected at build time:
//!
//! - [`ReqwestTransport`] - async HTTP via reqwest
//! - [`FileTransport`] - `file://` URLs and plain paths via tokio fs
//! - [`MemoryTransport`] - in-memory routes with a request log

use super::error::TransportError;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Boxed future returned by [`AssetTransport::fetch`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Bytes, TransportError>> + Send + 'a>>;

/// Fetches the raw bytes behind an asset URL.
///
/// Object-safe so a session can hold `Arc<dyn AssetTransport>`.
pub trait AssetTransport: Send + Sync {
    /// Performs a single fetch attempt. Retries are the cache's concern.
    fn fetch<'a>(&'a self, url: &'a str) -> TransportFuture<'a>;

    /// Short name for logging.
    fn name(&self) -> &str {
        "transport"
    }
}

/// Default User-Agent string for asset requests.
const DEFAULT_USER_AGENT: &str = concat!("docview/", env!("CARGO_PKG_VERSION"));

/// HTTP transport backed by an async reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a 30 second request timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                TransportError::permanent(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl AssetTransport for ReqwestTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> TransportFuture<'a> {
        Box::pin(async move {
            trace!(url = url, "HTTP GET request starting");

            let response = match self.client.get(url).send().await {
                Ok(resp) => {
                    debug!(
                        url = url,
                        status = resp.status().as_u16(),
                        "HTTP response received"
                    );
                    resp
                }
                Err(e) => {
                    warn!(
                        url = url,
                        error = %e,
                        is_connect = e.is_connect(),
                        is_timeout = e.is_timeout(),
                        "HTTP request failed"
                    );
                    if e.is_builder() {
                        return Err(TransportError::permanent(format!("Invalid request: {}", e)));
                    }
                    return Err(TransportError::network(format!("Request failed: {}", e)));
                }
            };

            let status = response.status();
            if !status.is_success() {
                warn!(url = url, status = status.as_u16(), "HTTP error status");
                return Err(TransportError::status(
                    status.as_u16(),
                    format!("HTTP {} from {}", status, url),
                ));
            }

            match response.bytes().await {
                Ok(bytes) => {
                    trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                    Ok(bytes)
                }
                Err(e) => {
                    warn!(url = url, error = %e, "Failed to read response body");
                    Err(TransportError::network(format!(
                        "Failed to read response: {}",
                        e
                    )))
                }
            }
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Reads assets from the local filesystem.
///
/// Accepts `file://` URLs and plain paths; any query string is ignored.
#[derive(Debug, Clone, Default)]
pub struct FileTransport;

impl FileTransport {
    pub fn new() -> Self {
        Self
    }

    fn path_for(url: &str) -> &str {
        let path = url.strip_prefix("file://").unwrap_or(url);
        match path.find('?') {
            Some(idx) => &path[..idx],
            None => path,
        }
    }
}

impl AssetTransport for FileTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> TransportFuture<'a> {
        Box::pin(async move {
            let path = Self::path_for(url);
            match tokio::fs::read(path).await {
                Ok(data) => {
                    trace!(path = path, bytes = data.len(), "Asset file read");
                    Ok(Bytes::from(data))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(TransportError::permanent(format!("{}: not found", path)))
                }
                Err(e) => Err(TransportError::network(format!("{}: {}", path, e))),
            }
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Serves assets from memory.
///
/// Every fetch is recorded, so callers can assert how many transport
/// requests a URL received. Failures can be scripted per URL; they are
/// consumed before the route body is served.
#[derive(Default)]
pub struct MemoryTransport {
    routes: Mutex<HashMap<String, Bytes>>,
    failures: Mutex<HashMap<String, VecDeque<TransportError>>>,
    log: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for `url`, ignoring any query string on lookup.
    pub fn route(self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<Bytes>) {
        self.routes.lock().insert(url.into(), body.into());
    }

    /// Makes the next fetches of `url` fail with `errors`, in order.
    pub fn fail_next(&self, url: impl Into<String>, errors: Vec<TransportError>) {
        let mut failures = self.failures.lock();
        let queue = failures.entry(url.into()).or_default();
        queue.extend(errors);
    }

    /// Number of fetches issued for `url` (query string ignored).
    pub fn requests_for(&self, url: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|logged| Self::strip_query(logged) == url)
            .count()
    }

    /// Every fetched URL in request order.
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn strip_query(url: &str) -> &str {
        match url.find('?') {
            Some(idx) => &url[..idx],
            None => url,
        }
    }

    fn respond(&self, url: &str) -> Result<Bytes, TransportError> {
        self.log.lock().push(url.to_string());
        let path = Self::strip_query(url);

        if let Some(err) = self.failures.lock().get_mut(path).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        self.routes
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::status(404, format!("HTTP 404 Not Found from {}", url)))
    }
}

impl AssetTransport for MemoryTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> TransportFuture<'a> {
        Box::pin(async move { self.respond(url) })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
