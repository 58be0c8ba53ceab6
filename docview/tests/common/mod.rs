//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use docview::asset::{AssetTransport, MemoryTransport, TransportFuture};
use docview::capability::CapabilitySet;
use docview::page::HeadlessSurface;
use docview::{Message, Viewer, ViewerConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

pub const BASE: &str = "https://assets/doc1/";

/// A minimal valid PNG header.
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

pub fn page_svg(page: u32) -> String {
    format!(
        "<svg><xhtml:link href=\"stylesheet.css\"/><text>page {}</text></svg>",
        page
    )
}

/// Routes for a paged document of `num_pages` 800x1000 pages.
pub fn paged_document(num_pages: u32) -> MemoryTransport {
    let transport = MemoryTransport::new()
        .route(
            url("info.json"),
            format!(
                r#"{{"numpages": {}, "dimensions": {{"width": 800, "height": 1000}}}}"#,
                num_pages
            ),
        )
        .route(url("stylesheet.css"), ".p { font-family: f1; }");
    for page in 1..=num_pages {
        transport.insert(url(&format!("page-{}.svg", page)), page_svg(page));
        transport.insert(url(&format!("page-{}.png", page)), PNG);
        transport.insert(
            url(&format!("text-{}.html", page)),
            format!("<div>text {}</div>", page),
        );
    }
    transport
}

/// Routes for a reflowed text document.
pub fn text_document(num_pages: u32) -> MemoryTransport {
    let transport = MemoryTransport::new()
        .route(
            url("info.json"),
            format!(r#"{{"numpages": {}, "type": "text"}}"#, num_pages),
        )
        .route(url("stylesheet.css"), "");
    for page in 1..=num_pages {
        transport.insert(
            url(&format!("text-{}.html", page)),
            format!("<div>text {}</div>", page),
        );
    }
    transport
}

/// Holds every fetch until [`open`](Self::open) is called.
pub struct GatedTransport {
    inner: MemoryTransport,
    open: watch::Sender<bool>,
    started: AtomicUsize,
}

impl GatedTransport {
    pub fn new(inner: MemoryTransport) -> Self {
        let (open, _) = watch::channel(false);
        Self {
            inner,
            open,
            started: AtomicUsize::new(0),
        }
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    /// Fetches that reached the gate.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Fetches of `url` that passed the gate.
    pub fn requests_for(&self, url: &str) -> usize {
        self.inner.requests_for(url)
    }
}

impl AssetTransport for GatedTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> TransportFuture<'a> {
        Box::pin(async move {
            self.started.fetch_add(1, Ordering::SeqCst);
            let mut rx = self.open.subscribe();
            let _ = rx.wait_for(|open| *open).await;
            self.inner.fetch(url).await
        })
    }

    fn name(&self) -> &str {
        "gated"
    }
}

pub struct Session {
    pub viewer: Viewer,
    pub surface: Arc<HeadlessSurface>,
    pub events: broadcast::Receiver<Message>,
}

pub fn session(
    transport: Arc<dyn AssetTransport>,
    caps: CapabilitySet,
    config: ViewerConfig,
) -> Session {
    let surface = Arc::new(HeadlessSurface::new());
    let viewer = Viewer::builder(config)
        .transport(transport)
        .capabilities(Arc::new(caps))
        .surface(surface.clone())
        .build()
        .unwrap();
    let events = viewer.subscribe();
    Session {
        viewer,
        surface,
        events,
    }
}

/// Every event received so far.
pub fn drain(events: &mut broadcast::Receiver<Message>) -> Vec<Message> {
    let mut received = Vec::new();
    while let Ok(message) = events.try_recv() {
        received.push(message);
    }
    received
}

/// Polls `condition` until it holds, failing after two seconds.
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}
