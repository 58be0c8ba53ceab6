//! The viewer orchestrator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              Viewer                              │
//! │                                                                  │
//! │  init() ──► SessionConfig ──► Scope ──► viewer-base, plugins     │
//! │                                                                  │
//! │  load_assets() ──► metadata + stylesheet ──when_all──┐           │
//! │                                                      ▼           │
//! │        complete: controller ─► set_layout ─► ready ─► gate       │
//! │        failure:  abort ─► asseterror ─► fail ─► gate             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! 1. **Build**: [`Viewer::builder`] injects transport, host capabilities,
//!    render surface and registries
//! 2. **Init**: [`Viewer::init`] validates the configuration synchronously
//! 3. **Load**: [`Viewer::load_assets`] starts the document load
//! 4. **Ready**: [`Viewer::ready`] resolves once with the session outcome
//! 5. **Destroy**: [`Viewer::destroy`] tears everything down

use super::base::ViewerBase;
use super::builder::ViewerBuilder;
use super::controller::{Controller, ControllerKind};
use super::error::ViewerError;
use super::scope::{ComponentRegistry, Scope};
use super::session::{SessionConfig, SessionState};
use crate::asset::{
    when_all, Asset, AssetCache, AssetError, AssetHandle, AssetKey, AssetKind, AssetTransport,
    CacheStats, DocumentMetadata, JoinFailure, ProcessingOptions,
};
use crate::bus::{Message, SessionFailure, SessionOutcome, ReadyGate, ZoomEvent};
use crate::capability::{Capabilities, CapabilitySet};
use crate::config::{ViewerConfig, DEFAULT_PAGE_HEIGHT, DEFAULT_PAGE_WIDTH};
use crate::layout::{
    LayoutComponent, LayoutContext, LayoutError, LayoutRegistry, LayoutState, Viewport,
    ZoomValue, LAYOUT_TEXT,
};
use crate::page::{RenderSurface, ViewerFlags};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct ViewerInner {
    config: ViewerConfig,
    transport: Arc<dyn AssetTransport>,
    capabilities: Arc<dyn Capabilities>,
    surface: Arc<dyn RenderSurface>,
    components: Arc<ComponentRegistry>,
    layouts: LayoutRegistry,

    events: broadcast::Sender<Message>,
    gate: ReadyGate,
    state: Mutex<SessionState>,
    scope: OnceLock<Scope>,
    flags: OnceLock<ViewerFlags>,
    controller: Mutex<Option<Arc<Controller>>>,
    viewport: Mutex<Viewport>,

    load_started: AtomicBool,
    load_handles: Mutex<Vec<AssetHandle>>,
    load_task: Mutex<Option<JoinHandle<()>>>,
}

/// A document viewer session.
///
/// Cloning is cheap; every clone controls the same session.
#[derive(Clone)]
pub struct Viewer {
    inner: Arc<ViewerInner>,
}

impl Viewer {
    pub fn builder(config: ViewerConfig) -> ViewerBuilder {
        ViewerBuilder::new(config)
    }

    pub(super) fn from_parts(
        config: ViewerConfig,
        transport: Arc<dyn AssetTransport>,
        capabilities: Arc<dyn Capabilities>,
        surface: Arc<dyn RenderSurface>,
        components: ComponentRegistry,
        layouts: LayoutRegistry,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(ViewerInner {
                config,
                transport,
                capabilities,
                surface,
                components: Arc::new(components),
                layouts,
                events,
                gate: ReadyGate::new(),
                state: Mutex::new(SessionState::Uninitialized),
                scope: OnceLock::new(),
                flags: OnceLock::new(),
                controller: Mutex::new(None),
                viewport: Mutex::new(Viewport::default()),
                load_started: AtomicBool::new(false),
                load_handles: Mutex::new(Vec::new()),
                load_task: Mutex::new(None),
            }),
        }
    }

    /// Validates the configuration and builds the session scope.
    ///
    /// Fails synchronously, before any request is made, when the base URL
    /// is missing or the query parameters are invalid. The viewer then
    /// stays uninitialized.
    pub fn init(&self) -> Result<(), ViewerError> {
        {
            let mut state = self.inner.state.lock();
            match *state {
                SessionState::Uninitialized => *state = SessionState::Initializing,
                SessionState::Destroyed => return Err(ViewerError::Destroyed),
                _ => return Err(ViewerError::AlreadyInitialized),
            }
        }

        let config = match SessionConfig::from_config(&self.inner.config) {
            Ok(config) => Arc::new(config),
            Err(e) => {
                *self.inner.state.lock() = SessionState::Uninitialized;
                warn!(error = %e, "Viewer configuration rejected");
                return Err(e.into());
            }
        };

        let caps = CapabilitySet::capture(self.inner.capabilities.as_ref());
        let options = ProcessingOptions {
            font_namespace: caps.namespace_fonts.then(|| config.id.clone()),
            geometric_precision: caps.geometric_precision,
        };
        let assets = AssetCache::new(
            Arc::clone(&self.inner.transport),
            config.locator(),
            config.assets.clone(),
            options,
        );
        let scope = Scope::new(
            Arc::clone(&config),
            caps,
            assets,
            Arc::clone(&self.inner.surface),
            Arc::clone(&self.inner.components),
        );
        if self.inner.scope.set(scope.clone()).is_err() {
            return Err(ViewerError::AlreadyInitialized);
        }

        scope.bus().attach(Arc::new(ViewerBase::new(
            scope.clone(),
            self.inner.events.clone(),
        )));

        for (name, slice) in &config.plugins {
            match scope.create_component(&format!("plugin-{}", name)) {
                Some((_, plugin)) => plugin.init(slice),
                None => warn!(plugin = %name, "Plugin is not registered, skipping"),
            }
        }

        info!(
            id = %config.id,
            url = %config.base_url,
            layout = %config.layout,
            plugins = config.plugins.len(),
            "Viewer initialized"
        );
        Ok(())
    }

    /// Starts loading the document metadata and stylesheet.
    ///
    /// Returns `Ok(true)` when this call started the load and `Ok(false)`
    /// when a load was already started; the second call requests nothing.
    /// Must be called from within a Tokio runtime.
    pub fn load_assets(&self) -> Result<bool, ViewerError> {
        let scope = self.inner.scope()?;
        if self.inner.load_started.swap(true, Ordering::SeqCst) {
            debug!("Document load already started");
            return Ok(false);
        }
        {
            let mut state = self.inner.state.lock();
            if *state == SessionState::Destroyed {
                return Err(ViewerError::Destroyed);
            }
            *state = SessionState::LoadingAssets;
        }

        let config = scope.config();
        let caps = scope.capabilities();
        let assets = scope.assets();

        let metadata = assets.get(AssetKey::metadata());
        let stylesheet = if caps.use_text_layer {
            assets.get(AssetKey::stylesheet())
        } else {
            AssetHandle::resolved(AssetKey::stylesheet(), Ok(Asset::Stylesheet(Arc::from(""))))
        };

        let mut handles = vec![metadata.clone(), stylesheet.clone()];
        if config.prefetches_first_page() {
            if !caps.use_png_fallback {
                handles.push(assets.get(AssetKey::page(AssetKind::PageSvg, 1)));
            } else if config.conversion_is_complete {
                handles.push(assets.get(AssetKey::page(AssetKind::PageImg, 1)));
            }
            if config.enable_text_selection && caps.use_text_layer {
                handles.push(assets.get(AssetKey::page(AssetKind::PageText, 1)));
            }
        }
        debug!(requests = handles.len(), "Document load started");
        *self.inner.load_handles.lock() = handles;

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = when_all(&[metadata, stylesheet]).await;
            inner.finish_load(result);
        });
        *self.inner.load_task.lock() = Some(task);
        Ok(true)
    }

    /// Waits for the session's single startup outcome.
    pub async fn ready(&self) -> SessionOutcome {
        self.inner.gate.wait().await
    }

    /// Receives every message forwarded to external listeners.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.inner.scope.get()
    }

    pub fn metadata(&self) -> Option<Arc<DocumentMetadata>> {
        self.inner.scope.get()?.metadata().cloned()
    }

    /// Flags written to the surface when the document became ready.
    pub fn flags(&self) -> Option<ViewerFlags> {
        self.inner.flags.get().copied()
    }

    /// Mode of the active layout.
    pub fn layout(&self) -> Option<String> {
        self.inner.scope.get()?.active_layout().mode()
    }

    /// Current page and zoom of the active layout.
    pub fn layout_state(&self) -> Option<LayoutState> {
        Some(self.inner.scope.get()?.active_layout().get()?.state())
    }

    pub fn stats(&self) -> Option<CacheStats> {
        Some(self.inner.scope.get()?.assets().stats())
    }

    /// Switches to layout `mode`.
    ///
    /// A no-op if `mode` is already active. The candidate is constructed
    /// before anything changes, so an unknown mode or a construction error
    /// leaves the current layout, page and zoom untouched.
    pub fn set_layout(&self, mode: &str) -> Result<(), ViewerError> {
        self.inner.set_layout(mode)
    }

    /// Focuses `page`. Returns whether focus moved.
    pub fn scroll_to(&self, page: u32) -> Result<bool, ViewerError> {
        Ok(self.inner.require_layout()?.scroll_to(page))
    }

    pub fn zoom(&self, value: ZoomValue) -> Result<Option<ZoomEvent>, ViewerError> {
        Ok(self.inner.require_layout()?.set_zoom(value))
    }

    /// Records the new viewport size and broadcasts `resize`.
    pub fn resize(&self, width: f64, height: f64) -> Result<(), ViewerError> {
        let scope = self.inner.scope()?;
        *self.inner.viewport.lock() = Viewport { width, height };
        scope.broadcast(Message::Resize { width, height });
        Ok(())
    }

    /// Publishes a host-originated message such as `linkclick`,
    /// `scrollstart` or `dragstart` on the session bus.
    pub fn notify(&self, message: Message) -> Result<usize, ViewerError> {
        Ok(self.inner.scope()?.broadcast(message))
    }

    pub fn load_page(&self, page: u32) -> Result<bool, ViewerError> {
        Ok(self.inner.require_controller()?.load_page(page))
    }

    pub fn preload_page(&self, page: u32) -> Result<bool, ViewerError> {
        Ok(self.inner.require_controller()?.preload_page(page))
    }

    pub fn unload_page(&self, page: u32) -> Result<bool, ViewerError> {
        Ok(self.inner.require_controller()?.unload_page(page))
    }

    /// Pages the controller currently keeps loaded.
    pub fn loaded_pages(&self) -> Vec<u32> {
        self.inner
            .controller
            .lock()
            .as_ref()
            .map(|c| c.loaded_pages())
            .unwrap_or_default()
    }

    pub fn enable_text_selection(&self) -> Result<(), ViewerError> {
        self.inner.set_text_selection(true)
    }

    pub fn disable_text_selection(&self) -> Result<(), ViewerError> {
        self.inner.set_text_selection(false)
    }

    pub fn enable_links(&self) -> Result<(), ViewerError> {
        self.inner.set_links(true)
    }

    pub fn disable_links(&self) -> Result<(), ViewerError> {
        self.inner.set_links(false)
    }

    /// Tears the session down.
    ///
    /// Broadcasts `destroy`, cancels the document load, removes all page
    /// content, destroys every component and the asset cache, and clears
    /// the surface. A pending [`ready`](Self::ready) resolves with
    /// [`SessionOutcome::Destroyed`]. Idempotent.
    pub fn destroy(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state == SessionState::Destroyed {
                return;
            }
            *state = SessionState::Destroyed;
        }

        if let Some(scope) = self.inner.scope.get() {
            scope.broadcast(Message::Destroy);
        }
        self.inner.abort_load();

        let controller = self.inner.controller.lock().take();
        if let Some(controller) = controller {
            controller.destroy_pages();
        }

        if let Some(scope) = self.inner.scope.get() {
            scope.active_layout().replace(None);
            scope.bus().destroy_all();
            scope.assets().log_stats();
            scope.assets().destroy();
        }
        self.inner.surface.clear();
        self.inner.gate.signal(SessionOutcome::Destroyed);
        info!("Viewer destroyed");
    }
}

impl ViewerInner {
    fn scope(&self) -> Result<Scope, ViewerError> {
        if *self.state.lock() == SessionState::Destroyed {
            return Err(ViewerError::Destroyed);
        }
        self.scope.get().cloned().ok_or(ViewerError::NotInitialized)
    }

    fn require_layout(&self) -> Result<Arc<LayoutComponent>, ViewerError> {
        self.scope()?
            .active_layout()
            .get()
            .ok_or(ViewerError::NotInitialized)
    }

    fn require_controller(&self) -> Result<Arc<Controller>, ViewerError> {
        self.scope()?;
        self.controller
            .lock()
            .clone()
            .ok_or(ViewerError::NotInitialized)
    }

    fn set_state(&self, next: SessionState) -> bool {
        let mut state = self.state.lock();
        if *state == SessionState::Destroyed {
            return false;
        }
        *state = next;
        true
    }

    fn abort_load(&self) {
        if let Some(task) = self.load_task.lock().take() {
            task.abort();
        }
        let handles = std::mem::take(&mut *self.load_handles.lock());
        for handle in handles {
            handle.abort();
        }
    }

    fn finish_load(&self, result: Result<Vec<Asset>, JoinFailure>) {
        if *self.state.lock() == SessionState::Destroyed {
            return;
        }
        match result {
            Ok(assets) => {
                let metadata = assets.first().and_then(Asset::as_metadata).cloned();
                let css = assets.get(1).and_then(Asset::as_text).unwrap_or_default();
                match metadata {
                    Some(metadata) => self.complete_init(metadata, css),
                    None => self.fail_load(SessionFailure::Asset(AssetError::processing(
                        AssetKey::metadata(),
                        "metadata request produced no metadata",
                    ))),
                }
            }
            Err(JoinFailure::Failed(err)) => self.fail_load(SessionFailure::Asset(err)),
            Err(JoinFailure::Cancelled(key)) => {
                debug!(key = %key, "Document load cancelled");
                self.fail_load(SessionFailure::Cancelled(key));
            }
        }
    }

    fn fail_load(&self, failure: SessionFailure) {
        let handles = std::mem::take(&mut *self.load_handles.lock());
        for handle in handles {
            handle.abort();
        }
        warn!(error = %failure, "Document failed to load");

        if let Some(scope) = self.scope.get() {
            if let SessionFailure::Asset(err) = &failure {
                scope.broadcast(Message::AssetError(err.clone()));
            }
            scope.broadcast(Message::Fail(failure.clone()));
        }
        if self.set_state(SessionState::Failed) {
            self.gate.signal(SessionOutcome::Failed(failure));
        }
    }

    fn complete_init(&self, metadata: Arc<DocumentMetadata>, css: &str) {
        let Some(scope) = self.scope.get().cloned() else {
            return;
        };
        let config = Arc::clone(scope.config());
        let caps = *scope.capabilities();

        scope.set_metadata(Arc::clone(&metadata));
        self.load_handles.lock().clear();
        self.surface.insert_stylesheet(css);
        let flags = *self.flags.get_or_init(|| ViewerFlags::from_capabilities(&caps));
        self.surface.apply_flags(&flags);

        let kind = ControllerKind::for_document(metadata.document_type());
        let controller = Arc::new(Controller::new(kind, metadata.num_pages, &scope));
        if scope.bus().attach(controller.clone()).is_none() {
            return;
        }
        *self.controller.lock() = Some(controller);

        let layout = match kind {
            ControllerKind::Text => LAYOUT_TEXT.to_string(),
            ControllerKind::Paged => config.layout.clone(),
        };
        let text_selection = match kind {
            ControllerKind::Text => config.enable_text_selection,
            ControllerKind::Paged => config.enable_text_selection && caps.use_text_layer,
        };
        self.apply_text_selection(&scope, text_selection);
        self.apply_links(&scope, config.enable_links && caps.enable_links);

        if let Err(e) = self.set_layout(&layout) {
            self.fail_load(SessionFailure::Layout(e.to_string()));
            return;
        }

        let page = scope
            .active_layout()
            .get()
            .map(|layout| layout.state().current_page)
            .unwrap_or(1);
        if !self.set_state(SessionState::Ready) {
            return;
        }
        info!(
            pages = metadata.num_pages,
            page = page,
            layout = %layout,
            controller = kind.name(),
            "Document ready"
        );
        scope.broadcast(Message::Ready {
            page,
            num_pages: metadata.num_pages,
        });
        self.gate.signal(SessionOutcome::Ready {
            page,
            num_pages: metadata.num_pages,
        });
    }

    fn layout_context(&self, scope: &Scope) -> Result<LayoutContext, ViewerError> {
        let metadata = scope.metadata().ok_or(ViewerError::NotInitialized)?;
        let (page_width, page_height) = match metadata.dimensions {
            Some(dims) => (dims.width, dims.height),
            None => (DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT),
        };
        Ok(LayoutContext {
            num_pages: metadata.num_pages,
            page_width,
            page_height,
            viewport: *self.viewport.lock(),
        })
    }

    fn set_layout(&self, mode: &str) -> Result<(), ViewerError> {
        let scope = self.scope()?;
        let active = scope.active_layout();
        let previous = active.get();
        if previous.as_ref().is_some_and(|layout| layout.mode() == mode) {
            return Ok(());
        }

        let factory = self
            .layouts
            .resolve(mode)
            .ok_or_else(|| LayoutError::UnknownMode(mode.to_string()))?;
        let ctx = self.layout_context(&scope)?;
        let strategy = factory(&ctx)?;
        let candidate = Arc::new(LayoutComponent::new(strategy, Arc::clone(scope.bus())));

        let config = scope.config();
        let (page, zoom) = match &previous {
            Some(layout) => {
                let state = layout.state();
                (state.current_page, state.zoom.as_request())
            }
            None => (
                config.page.unwrap_or(1),
                config.zoom.unwrap_or(ZoomValue::Auto),
            ),
        };

        if let Some((id, _)) = active.replace(None) {
            scope.destroy_component(id);
        }
        let id = scope
            .bus()
            .attach(candidate.clone())
            .ok_or(ViewerError::Destroyed)?;
        active.replace(Some((id, Arc::clone(&candidate))));

        candidate.set_zoom(zoom);
        candidate.scroll_to(page);

        let previous_layout = previous.map(|layout| layout.mode().to_string());
        debug!(
            previous = previous_layout.as_deref().unwrap_or("none"),
            layout = mode,
            "Layout changed"
        );
        scope.broadcast(Message::LayoutChange {
            previous_layout,
            layout: mode.to_string(),
        });
        Ok(())
    }

    fn apply_text_selection(&self, scope: &Scope, enabled: bool) {
        scope.toggles().set_text_selection(enabled);
        self.surface.set_text_selection(enabled);
    }

    fn apply_links(&self, scope: &Scope, enabled: bool) {
        scope.toggles().set_links(enabled);
        self.surface.set_links(enabled);
    }

    fn set_text_selection(&self, enabled: bool) -> Result<(), ViewerError> {
        let scope = self.scope()?;
        self.apply_text_selection(&scope, enabled);
        Ok(())
    }

    fn set_links(&self, enabled: bool) -> Result<(), ViewerError> {
        let scope = self.scope()?;
        self.apply_links(&scope, enabled);
        Ok(())
    }
}

impl Drop for ViewerInner {
    fn drop(&mut self) {
        if let Some(scope) = self.scope.get() {
            scope.active_layout().replace(None);
            scope.bus().destroy_all();
            scope.assets().destroy();
        }
    }
}
