//! Per-session composition root.

use super::session::SessionConfig;
use crate::asset::{AssetCache, DocumentMetadata};
use crate::bus::{Component, ComponentId, Message, MessageBus, Registry};
use crate::capability::CapabilitySet;
use crate::layout::LayoutComponent;
use crate::page::{PageContext, RenderSurface};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Component factories keyed by component name.
pub type ComponentRegistry = Registry<Scope, Arc<dyn Component>>;

/// Feature switches that the host may flip after startup.
#[derive(Debug)]
pub struct Toggles {
    text_selection: AtomicBool,
    links: AtomicBool,
}

impl Toggles {
    fn new(text_selection: bool, links: bool) -> Self {
        Self {
            text_selection: AtomicBool::new(text_selection),
            links: AtomicBool::new(links),
        }
    }

    pub fn text_selection(&self) -> bool {
        self.text_selection.load(Ordering::SeqCst)
    }

    pub fn set_text_selection(&self, enabled: bool) {
        self.text_selection.store(enabled, Ordering::SeqCst);
    }

    pub fn links(&self) -> bool {
        self.links.load(Ordering::SeqCst)
    }

    pub fn set_links(&self, enabled: bool) {
        self.links.store(enabled, Ordering::SeqCst);
    }
}

/// The currently installed layout, if any.
#[derive(Default)]
pub struct ActiveLayout {
    slot: Mutex<Option<(ComponentId, Arc<LayoutComponent>)>>,
}

impl ActiveLayout {
    pub fn get(&self) -> Option<Arc<LayoutComponent>> {
        self.slot.lock().as_ref().map(|(_, layout)| Arc::clone(layout))
    }

    pub fn mode(&self) -> Option<String> {
        self.slot.lock().as_ref().map(|(_, l)| l.mode().to_string())
    }

    /// Installs `next`, returning the previous layout.
    pub(crate) fn replace(
        &self,
        next: Option<(ComponentId, Arc<LayoutComponent>)>,
    ) -> Option<(ComponentId, Arc<LayoutComponent>)> {
        std::mem::replace(&mut *self.slot.lock(), next)
    }
}

/// Everything a component may depend on, injected at creation.
///
/// One scope exists per session. Cloning is cheap and every clone refers to
/// the same session.
#[derive(Clone)]
pub struct Scope {
    config: Arc<SessionConfig>,
    caps: CapabilitySet,
    bus: Arc<MessageBus>,
    assets: AssetCache,
    surface: Arc<dyn RenderSurface>,
    registry: Arc<ComponentRegistry>,
    toggles: Arc<Toggles>,
    layout: Arc<ActiveLayout>,
    metadata: Arc<OnceLock<Arc<DocumentMetadata>>>,
}

impl Scope {
    pub fn new(
        config: Arc<SessionConfig>,
        caps: CapabilitySet,
        assets: AssetCache,
        surface: Arc<dyn RenderSurface>,
        registry: Arc<ComponentRegistry>,
    ) -> Self {
        let toggles = Toggles::new(config.enable_text_selection, config.enable_links);
        Self {
            config,
            caps,
            bus: Arc::new(MessageBus::new()),
            assets,
            surface,
            registry,
            toggles: Arc::new(toggles),
            layout: Arc::new(ActiveLayout::default()),
            metadata: Arc::new(OnceLock::new()),
        }
    }

    pub fn config(&self) -> &Arc<SessionConfig> {
        &self.config
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.caps
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub fn surface(&self) -> &Arc<dyn RenderSurface> {
        &self.surface
    }

    pub fn toggles(&self) -> &Toggles {
        &self.toggles
    }

    pub fn active_layout(&self) -> &ActiveLayout {
        &self.layout
    }

    /// Document metadata, once loaded.
    pub fn metadata(&self) -> Option<&Arc<DocumentMetadata>> {
        self.metadata.get()
    }

    /// Stores the document metadata. Only the first call has effect.
    pub(crate) fn set_metadata(&self, metadata: Arc<DocumentMetadata>) -> bool {
        self.metadata.set(metadata).is_ok()
    }

    /// Services handed to page components.
    pub fn page_context(&self) -> PageContext {
        PageContext {
            assets: self.assets.clone(),
            surface: Arc::clone(&self.surface),
            bus: Arc::clone(&self.bus),
            caps: self.caps,
        }
    }

    /// Builds the component registered as `name` and attaches it to the bus.
    ///
    /// Returns `None` if no factory is registered under `name` or the bus
    /// has been torn down.
    pub fn create_component(&self, name: &str) -> Option<(ComponentId, Arc<dyn Component>)> {
        let Some(factory) = self.registry.resolve(name) else {
            warn!(component = name, "No component registered under this name");
            return None;
        };
        let component = factory(self);
        let id = self.bus.attach(Arc::clone(&component))?;
        debug!(component = name, id = %id, "Component created");
        Some((id, component))
    }

    /// Unsubscribes and tears down a component.
    pub fn destroy_component(&self, id: ComponentId) -> bool {
        self.bus.destroy_component(id)
    }

    pub fn broadcast(&self, message: Message) -> usize {
        self.bus.broadcast(message)
    }
}
