//! Integration tests for the viewer lifecycle.
//!
//! These tests drive a complete session against in-memory documents:
//! - Synchronous configuration validation
//! - Document load, readiness and failure reporting
//! - Layout switching and its no-op and error paths
//! - Page window loading as focus moves
//! - Plugins, toggles and teardown

mod common;

use common::*;
use docview::asset::{
    AssetKey, AssetKind, AssetSettings, AssetTransport, MemoryTransport, RetryPolicy, Settled,
    TransportError, TransportFuture,
};
use docview::bus::{Component, LinkTarget, MessageKind, SessionFailure};
use docview::capability::CapabilitySet;
use docview::layout::{LayoutError, ZoomValue};
use docview::page::{HeadlessSurface, Layer};
use docview::viewer::{ConfigError, Scope, SessionState};
use docview::{Message, SessionOutcome, Viewer, ViewerConfig, ViewerError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Test Helpers
// =============================================================================

fn config() -> ViewerConfig {
    ViewerConfig::new("https://assets/doc1")
}

async fn ready_session(transport: MemoryTransport, caps: CapabilitySet) -> Session {
    let s = session(Arc::new(transport), caps, config());
    s.viewer.init().unwrap();
    s.viewer.load_assets().unwrap();
    assert!(s.viewer.ready().await.is_ready());
    s
}

/// Pages whose `layer` container is currently shown.
fn visible_pages(surface: &HeadlessSurface, layer: Layer, num_pages: u32) -> Vec<u32> {
    (1..=num_pages)
        .filter(|page| {
            surface
                .memory_container(*page, layer)
                .is_some_and(|c| c.content().is_some() && c.is_visible())
        })
        .collect()
}

fn kinds(messages: &[Message]) -> Vec<MessageKind> {
    messages.iter().map(Message::kind).collect()
}

fn count(messages: &[Message], kind: MessageKind) -> usize {
    messages.iter().filter(|m| m.kind() == kind).count()
}

/// Plugin recording its config slice and every message it sees.
struct Recorder {
    config: Arc<Mutex<Option<serde_json::Value>>>,
    seen: Arc<Mutex<Vec<MessageKind>>>,
}

impl Component for Recorder {
    fn name(&self) -> &str {
        "plugin-recorder"
    }

    fn messages(&self) -> &[MessageKind] {
        &[MessageKind::Ready, MessageKind::PageFocus]
    }

    fn init(&self, config: &serde_json::Value) {
        *self.config.lock() = Some(config.clone());
    }

    fn on_message(&self, message: &Message) {
        self.seen.lock().push(message.kind());
    }
}

// =============================================================================
// Init
// =============================================================================

#[tokio::test]
async fn test_init_without_url_fails_synchronously() {
    let transport = Arc::new(paged_document(3));
    let s = session(transport.clone(), CapabilitySet::desktop(), ViewerConfig::default());

    assert_eq!(
        s.viewer.init(),
        Err(ViewerError::Config(ConfigError::MissingUrl))
    );
    assert_eq!(s.viewer.state(), SessionState::Uninitialized);
    assert_eq!(s.viewer.load_assets(), Err(ViewerError::NotInitialized));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_init_twice_is_rejected() {
    let s = session(Arc::new(paged_document(3)), CapabilitySet::desktop(), config());
    s.viewer.init().unwrap();
    assert_eq!(s.viewer.init(), Err(ViewerError::AlreadyInitialized));
}

// =============================================================================
// Document load
// =============================================================================

#[tokio::test]
async fn test_document_becomes_ready() {
    let mut s = ready_session(paged_document(5), CapabilitySet::desktop()).await;

    assert_eq!(s.viewer.state(), SessionState::Ready);
    assert_eq!(s.viewer.metadata().unwrap().num_pages, 5);
    assert_eq!(s.viewer.layout().as_deref(), Some("vertical"));
    assert_eq!(s.surface.layout().as_deref(), Some("vertical"));
    assert_eq!(s.surface.stylesheets(), vec![".p { font-family: f1; }".to_string()]);
    assert!(s.surface.flags().unwrap().text_layer);
    assert!(s.surface.text_selection());
    assert!(s.surface.links());

    let events = drain(&mut s.events);
    let order = kinds(&events);
    let layout = order.iter().position(|k| *k == MessageKind::LayoutChange).unwrap();
    let ready = order.iter().position(|k| *k == MessageKind::Ready).unwrap();
    assert!(layout < ready);
    assert_eq!(
        events[ready],
        Message::Ready {
            page: 1,
            num_pages: 5
        }
    );
    assert_eq!(count(&events, MessageKind::Fail), 0);
}

#[tokio::test]
async fn test_ready_resolves_for_late_waiters() {
    let s = ready_session(paged_document(2), CapabilitySet::desktop()).await;
    assert_eq!(
        s.viewer.ready().await,
        SessionOutcome::Ready {
            page: 1,
            num_pages: 2
        }
    );
}

#[tokio::test]
async fn test_initial_page_from_config() {
    let s = session(
        Arc::new(paged_document(6)),
        CapabilitySet::desktop(),
        config().with_page(4).with_layout("horizontal"),
    );
    s.viewer.init().unwrap();
    s.viewer.load_assets().unwrap();

    assert_eq!(
        s.viewer.ready().await,
        SessionOutcome::Ready {
            page: 4,
            num_pages: 6
        }
    );
    assert_eq!(s.viewer.layout().as_deref(), Some("horizontal"));
}

#[tokio::test]
async fn test_load_assets_twice_requests_once() {
    let transport = Arc::new(GatedTransport::new(paged_document(3)));
    let s = session(transport.clone(), CapabilitySet::desktop(), config());
    s.viewer.init().unwrap();

    assert_eq!(s.viewer.load_assets(), Ok(true));
    assert_eq!(s.viewer.load_assets(), Ok(false));
    assert_eq!(s.viewer.state(), SessionState::LoadingAssets);

    transport.open();
    assert!(s.viewer.ready().await.is_ready());
    assert_eq!(transport.requests_for(&url("info.json")), 1);
    assert_eq!(transport.requests_for(&url("stylesheet.css")), 1);
}

#[tokio::test]
async fn test_first_page_prefetched_with_document_assets() {
    let transport = Arc::new(GatedTransport::new(paged_document(3)));
    let s = session(transport.clone(), CapabilitySet::desktop(), config());
    s.viewer.init().unwrap();
    s.viewer.load_assets().unwrap();

    let assets = s.viewer.scope().unwrap().assets().clone();
    assert!(assets.contains(&AssetKey::metadata()));
    assert!(assets.contains(&AssetKey::stylesheet()));
    assert!(assets.contains(&AssetKey::page(AssetKind::PageSvg, 1)));
    assert!(assets.contains(&AssetKey::page(AssetKind::PageText, 1)));
    transport.open();
}

#[tokio::test]
async fn test_stylesheet_failure_fails_session() {
    let transport = paged_document(3);
    transport.fail_next(
        url("stylesheet.css"),
        vec![
            TransportError::status(503, "unavailable"),
            TransportError::status(503, "unavailable"),
            TransportError::status(503, "unavailable"),
        ],
    );
    let transport = Arc::new(transport);
    let settings = AssetSettings {
        retry: RetryPolicy {
            max_retries: 2,
            backoff: Duration::ZERO,
        },
        ..AssetSettings::default()
    };
    let mut cfg = config().with_assets(settings);
    cfg.autoload_first_page = false;
    let mut s = session(transport.clone(), CapabilitySet::desktop(), cfg);
    s.viewer.init().unwrap();
    s.viewer.load_assets().unwrap();

    match s.viewer.ready().await {
        SessionOutcome::Failed(SessionFailure::Asset(err)) => {
            assert_eq!(err.key(), AssetKey::stylesheet());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(s.viewer.state(), SessionState::Failed);
    assert_eq!(transport.requests_for(&url("stylesheet.css")), 3);

    let events = drain(&mut s.events);
    let order = kinds(&events);
    let asset_error = order
        .iter()
        .position(|k| *k == MessageKind::AssetError)
        .unwrap();
    let fail = order.iter().position(|k| *k == MessageKind::Fail).unwrap();
    assert!(asset_error < fail);
    assert_eq!(count(&events, MessageKind::Fail), 1);
    assert_eq!(count(&events, MessageKind::Ready), 0);

    // The outcome is terminal: teardown does not replace it.
    s.viewer.destroy();
    assert!(matches!(s.viewer.ready().await, SessionOutcome::Failed(_)));
}

/// Fails the stylesheet at once and holds every other request forever.
struct StylesheetUnavailable;

impl AssetTransport for StylesheetUnavailable {
    fn fetch<'a>(&'a self, url: &'a str) -> TransportFuture<'a> {
        Box::pin(async move {
            if url.ends_with("stylesheet.css") {
                return Err(TransportError::status(404, "not found"));
            }
            std::future::pending::<Result<bytes::Bytes, TransportError>>().await
        })
    }

    fn name(&self) -> &str {
        "stylesheet-unavailable"
    }
}

#[tokio::test]
async fn test_load_failure_aborts_first_page_prefetch() {
    let s = session(
        Arc::new(StylesheetUnavailable),
        CapabilitySet::desktop(),
        config(),
    );
    s.viewer.init().unwrap();
    s.viewer.load_assets().unwrap();

    let assets = s.viewer.scope().unwrap().assets().clone();
    let page_keys = [
        AssetKey::page(AssetKind::PageSvg, 1),
        AssetKey::page(AssetKind::PageText, 1),
    ];
    let prefetched: Vec<_> = page_keys.iter().map(|key| assets.get(*key)).collect();
    assert!(prefetched.iter().all(|handle| handle.peek().is_none()));

    match s.viewer.ready().await {
        SessionOutcome::Failed(SessionFailure::Asset(err)) => {
            assert_eq!(err.key(), AssetKey::stylesheet());
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    for (key, handle) in page_keys.iter().zip(&prefetched) {
        assert_eq!(handle.peek(), Some(Settled::Cancelled), "{}", key);
        assert!(!assets.contains(key), "{} still cached", key);
    }
    assert!(!assets.contains(&AssetKey::metadata()));
}

#[tokio::test]
async fn test_cancelled_metadata_request_fails_session() {
    let transport = Arc::new(GatedTransport::new(paged_document(3)));
    let mut s = session(transport.clone(), CapabilitySet::desktop(), config());
    s.viewer.init().unwrap();
    s.viewer.load_assets().unwrap();

    let assets = s.viewer.scope().unwrap().assets().clone();
    assets.get(AssetKey::metadata()).abort();
    transport.open();

    let outcome = tokio::time::timeout(Duration::from_secs(2), s.viewer.ready())
        .await
        .expect("session outcome");
    assert_eq!(
        outcome,
        SessionOutcome::Failed(SessionFailure::Cancelled(AssetKey::metadata()))
    );
    assert_eq!(s.viewer.state(), SessionState::Failed);

    let events = drain(&mut s.events);
    assert_eq!(count(&events, MessageKind::Fail), 1);
    assert_eq!(count(&events, MessageKind::Ready), 0);
}

#[tokio::test]
async fn test_missing_metadata_fails_session() {
    let transport = MemoryTransport::new().route(url("stylesheet.css"), "");
    let s = session(Arc::new(transport), CapabilitySet::desktop(), config());
    s.viewer.init().unwrap();
    s.viewer.load_assets().unwrap();

    match s.viewer.ready().await {
        SessionOutcome::Failed(SessionFailure::Asset(err)) => {
            assert_eq!(err.key(), AssetKey::metadata());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_text_document_uses_text_layout() {
    let s = session(
        Arc::new(text_document(2)),
        CapabilitySet::desktop(),
        config().with_layout("presentation"),
    );
    s.viewer.init().unwrap();
    s.viewer.load_assets().unwrap();
    assert!(s.viewer.ready().await.is_ready());

    assert_eq!(s.viewer.layout().as_deref(), Some("text"));
    assert_eq!(s.viewer.loaded_pages(), vec![1, 2]);
    eventually("text pages to load", || {
        visible_pages(&s.surface, Layer::Text, 2) == vec![1, 2]
    })
    .await;
    assert!(s.surface.loaded_pages().is_empty());
}

// =============================================================================
// Layout
// =============================================================================

#[tokio::test]
async fn test_invalid_layout_leaves_state_unchanged() {
    let mut s = ready_session(paged_document(5), CapabilitySet::desktop()).await;
    s.viewer.scroll_to(3).unwrap();
    s.viewer.zoom(ZoomValue::Level(1.5)).unwrap();
    let before = s.viewer.layout_state().unwrap();
    drain(&mut s.events);

    assert_eq!(
        s.viewer.set_layout("sideways"),
        Err(ViewerError::Layout(LayoutError::UnknownMode(
            "sideways".into()
        )))
    );

    assert_eq!(s.viewer.layout().as_deref(), Some("vertical"));
    assert_eq!(s.viewer.layout_state().unwrap(), before);
    assert_eq!(before.current_page, 3);
    assert_eq!(count(&drain(&mut s.events), MessageKind::LayoutChange), 0);
}

#[tokio::test]
async fn test_repeated_set_layout_is_noop() {
    let mut s = ready_session(paged_document(5), CapabilitySet::desktop()).await;
    s.viewer.scroll_to(3).unwrap();
    drain(&mut s.events);

    s.viewer.set_layout("horizontal").unwrap();
    let events = drain(&mut s.events);
    assert_eq!(count(&events, MessageKind::LayoutChange), 1);
    assert!(events.contains(&Message::LayoutChange {
        previous_layout: Some("vertical".into()),
        layout: "horizontal".into(),
    }));
    assert_eq!(s.viewer.layout_state().unwrap().current_page, 3);

    let bus = s.viewer.scope().unwrap().bus().clone();
    assert_eq!(
        bus.subscribers(MessageKind::Resize),
        vec!["viewer-base", "layout-horizontal"]
    );

    s.viewer.set_layout("horizontal").unwrap();
    assert_eq!(count(&drain(&mut s.events), MessageKind::LayoutChange), 0);
    assert_eq!(
        bus.subscribers(MessageKind::Resize),
        vec!["viewer-base", "layout-horizontal"]
    );
    assert_eq!(s.surface.layout().as_deref(), Some("horizontal"));
}

#[tokio::test]
async fn test_resize_recomputes_auto_zoom() {
    let s = ready_session(paged_document(3), CapabilitySet::desktop()).await;
    assert_eq!(s.viewer.layout_state().unwrap().zoom.zoom, 1.0);

    s.viewer.resize(400.0, 600.0).unwrap();
    assert_eq!(s.viewer.layout_state().unwrap().zoom.zoom, 0.5);
}

#[tokio::test]
async fn test_zoom_reported_with_page_scale() {
    let mut cfg = config();
    cfg.page_scale = 2.0;
    let mut s = session(Arc::new(paged_document(3)), CapabilitySet::desktop(), cfg);
    s.viewer.init().unwrap();
    s.viewer.load_assets().unwrap();
    assert!(s.viewer.ready().await.is_ready());
    drain(&mut s.events);

    let event = s.viewer.zoom(ZoomValue::Level(1.5)).unwrap().unwrap();
    assert_eq!(event.zoom, 1.5);

    match drain(&mut s.events).as_slice() {
        [Message::Zoom(reported)] => assert_eq!(reported.zoom, 3.0),
        other => panic!("unexpected events {:?}", other),
    }
}

// =============================================================================
// Pages
// =============================================================================

#[tokio::test]
async fn test_focus_moves_page_window() {
    let caps = CapabilitySet {
        page_load_range: 2,
        ..CapabilitySet::desktop()
    };
    let s = ready_session(paged_document(5), caps).await;
    assert_eq!(s.viewer.loaded_pages(), vec![1, 2]);
    eventually("pages 1 and 2", || {
        visible_pages(&s.surface, Layer::Content, 5) == vec![1, 2]
    })
    .await;

    s.viewer.scroll_to(5).unwrap();
    assert_eq!(s.viewer.loaded_pages(), vec![4, 5]);
    eventually("pages 4 and 5", || {
        visible_pages(&s.surface, Layer::Content, 5) == vec![4, 5]
    })
    .await;
    // Hidden, not removed, on desktop hosts.
    assert!(s.surface.loaded_pages().contains(&1));
}

#[tokio::test]
async fn test_link_click_scrolls_to_page() {
    let s = ready_session(paged_document(5), CapabilitySet::desktop()).await;
    s.viewer
        .notify(Message::LinkClick(LinkTarget::Page(4)))
        .unwrap();
    assert_eq!(s.viewer.layout_state().unwrap().current_page, 4);

    s.viewer.disable_links().unwrap();
    s.viewer
        .notify(Message::LinkClick(LinkTarget::Page(2)))
        .unwrap();
    assert_eq!(s.viewer.layout_state().unwrap().current_page, 4);
    assert!(!s.surface.links());
}

#[tokio::test]
async fn test_text_selection_toggle() {
    let s = ready_session(paged_document(2), CapabilitySet::desktop()).await;
    s.viewer.disable_text_selection().unwrap();
    assert!(!s.surface.text_selection());
    assert!(!s.viewer.scope().unwrap().toggles().text_selection());

    s.viewer.enable_text_selection().unwrap();
    assert!(s.surface.text_selection());
}

#[tokio::test]
async fn test_legacy_host_disables_text_layer_features() {
    let s = ready_session(paged_document(2), CapabilitySet::for_host(true, false, true)).await;
    assert!(!s.surface.text_selection());
    assert!(!s.surface.links());
    assert!(!s
        .viewer
        .scope()
        .unwrap()
        .assets()
        .contains(&AssetKey::page(AssetKind::PageText, 1)));
}

// =============================================================================
// Plugins
// =============================================================================

#[tokio::test]
async fn test_plugin_receives_config_and_messages() {
    let config_slot = Arc::new(Mutex::new(None));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (c, s) = (Arc::clone(&config_slot), Arc::clone(&seen));

    let viewer = Viewer::builder(
        config()
            .with_plugin("recorder", serde_json::json!({ "verbose": true }))
            .with_plugin("missing", serde_json::Value::Null),
    )
    .transport(Arc::new(paged_document(2)))
    .plugin("recorder", move |_: &Scope| -> Arc<dyn Component> {
        Arc::new(Recorder {
            config: Arc::clone(&c),
            seen: Arc::clone(&s),
        })
    })
    .build()
    .unwrap();

    viewer.init().unwrap();
    viewer.load_assets().unwrap();
    assert!(viewer.ready().await.is_ready());

    assert_eq!(
        *config_slot.lock(),
        Some(serde_json::json!({ "verbose": true }))
    );
    assert_eq!(
        *seen.lock(),
        vec![MessageKind::PageFocus, MessageKind::Ready]
    );
}

// =============================================================================
// Teardown
// =============================================================================

#[tokio::test]
async fn test_destroy_before_ready() {
    let transport = Arc::new(GatedTransport::new(paged_document(3)));
    let s = session(transport.clone(), CapabilitySet::desktop(), config());
    s.viewer.init().unwrap();
    s.viewer.load_assets().unwrap();

    s.viewer.destroy();
    assert_eq!(s.viewer.ready().await, SessionOutcome::Destroyed);
    assert_eq!(s.viewer.state(), SessionState::Destroyed);
    assert_eq!(s.viewer.scroll_to(2), Err(ViewerError::Destroyed));
    assert_eq!(s.viewer.init(), Err(ViewerError::Destroyed));

    transport.open();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(s.viewer.state(), SessionState::Destroyed);
    assert_eq!(transport.requests_for(&url("info.json")), 0);
}

#[tokio::test]
async fn test_destroy_clears_surface_and_components() {
    let mut s = ready_session(paged_document(3), CapabilitySet::desktop()).await;
    eventually("first page", || s.surface.loaded_pages().contains(&1)).await;
    drain(&mut s.events);

    s.viewer.destroy();
    s.viewer.destroy();

    let scope = s.viewer.scope().unwrap();
    assert!(scope.bus().is_empty());
    assert!(scope.assets().is_destroyed());
    assert!(s.surface.loaded_pages().is_empty());
    assert!(s.surface.layout().is_none());
    assert_eq!(drain(&mut s.events), vec![Message::Destroy]);
}
