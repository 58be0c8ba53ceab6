//! Render surface contract and an in-memory implementation.
//!
//! The viewer core never renders anything itself. It asks a
//! [`RenderSurface`] for one [`PageContainer`] per page and layer, and
//! toggles presentation state on the surface as the session changes.

use crate::asset::Asset;
use crate::capability::CapabilitySet;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Which layer of a page a container holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Vector markup or raster fallback.
    Content,
    /// Selectable text overlay.
    Text,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Content => f.write_str("content"),
            Layer::Text => f.write_str("text"),
        }
    }
}

/// Host element holding one layer of one page.
pub trait PageContainer: Send + Sync {
    /// Inserts the asset's rendered form.
    fn insert(&self, asset: &Asset);
    fn show(&self);
    fn hide(&self);
    /// Removes the inserted asset; a later `insert` starts over.
    fn remove(&self);
}

/// Presentation flags written once when the document is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewerFlags {
    pub text_layer: bool,
    pub png_fallback: bool,
    pub mobile: bool,
    pub legacy_host: bool,
    pub subpixel_text: bool,
    pub links: bool,
}

impl ViewerFlags {
    pub fn from_capabilities(caps: &CapabilitySet) -> Self {
        Self {
            text_layer: caps.use_text_layer,
            png_fallback: caps.use_png_fallback,
            mobile: caps.is_mobile,
            legacy_host: caps.is_legacy_host,
            subpixel_text: caps.supports_subpixel_text,
            links: caps.enable_links,
        }
    }
}

/// The host's view of the document.
pub trait RenderSurface: Send + Sync {
    /// Container for `layer` of `page`. Repeated calls return the same one.
    fn container(&self, page: u32, layer: Layer) -> Arc<dyn PageContainer>;

    fn apply_flags(&self, flags: &ViewerFlags);

    /// Switches the layout class to `mode`.
    fn set_layout(&self, mode: &str);

    fn set_draggable(&self, draggable: bool);

    fn set_dragging(&self, dragging: bool);

    fn set_text_selection(&self, enabled: bool);

    fn set_links(&self, enabled: bool);

    fn insert_stylesheet(&self, css: &str);

    /// Removes everything the viewer put on the surface.
    fn clear(&self);
}

#[derive(Default)]
struct ContainerState {
    content: Option<Asset>,
    visible: bool,
    inserts: usize,
    removals: usize,
}

/// Container that keeps the inserted asset in memory.
#[derive(Default)]
pub struct MemoryContainer {
    state: Mutex<ContainerState>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> Option<Asset> {
        self.state.lock().content.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    /// Number of times an asset was inserted.
    pub fn inserts(&self) -> usize {
        self.state.lock().inserts
    }

    /// Number of times the asset was removed.
    pub fn removals(&self) -> usize {
        self.state.lock().removals
    }
}

impl PageContainer for MemoryContainer {
    fn insert(&self, asset: &Asset) {
        let mut state = self.state.lock();
        state.content = Some(asset.clone());
        state.inserts += 1;
    }

    fn show(&self) {
        self.state.lock().visible = true;
    }

    fn hide(&self) {
        self.state.lock().visible = false;
    }

    fn remove(&self) {
        let mut state = self.state.lock();
        if state.content.take().is_some() {
            state.removals += 1;
        }
        state.visible = false;
    }
}

#[derive(Default)]
struct SurfaceState {
    containers: HashMap<(u32, Layer), Arc<MemoryContainer>>,
    flags: Option<ViewerFlags>,
    layout: Option<String>,
    draggable: bool,
    dragging: bool,
    text_selection: bool,
    links: bool,
    stylesheets: Vec<String>,
}

/// Render surface with no output device.
///
/// Used by the CLI and by tests to observe what the viewer did.
#[derive(Default)]
pub struct HeadlessSurface {
    state: Mutex<SurfaceState>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Container for `(page, layer)` if one was ever requested.
    pub fn memory_container(&self, page: u32, layer: Layer) -> Option<Arc<MemoryContainer>> {
        self.state.lock().containers.get(&(page, layer)).cloned()
    }

    pub fn flags(&self) -> Option<ViewerFlags> {
        self.state.lock().flags
    }

    pub fn layout(&self) -> Option<String> {
        self.state.lock().layout.clone()
    }

    pub fn is_draggable(&self) -> bool {
        self.state.lock().draggable
    }

    pub fn is_dragging(&self) -> bool {
        self.state.lock().dragging
    }

    pub fn text_selection(&self) -> bool {
        self.state.lock().text_selection
    }

    pub fn links(&self) -> bool {
        self.state.lock().links
    }

    pub fn stylesheets(&self) -> Vec<String> {
        self.state.lock().stylesheets.clone()
    }

    /// Pages whose content layer currently holds an asset, sorted.
    pub fn loaded_pages(&self) -> Vec<u32> {
        let state = self.state.lock();
        let mut pages: Vec<u32> = state
            .containers
            .iter()
            .filter(|((_, layer), c)| *layer == Layer::Content && c.content().is_some())
            .map(|((page, _), _)| *page)
            .collect();
        pages.sort_unstable();
        pages
    }
}

impl RenderSurface for HeadlessSurface {
    fn container(&self, page: u32, layer: Layer) -> Arc<dyn PageContainer> {
        let mut state = self.state.lock();
        let container = state.containers.entry((page, layer)).or_default();
        Arc::clone(container) as Arc<dyn PageContainer>
    }

    fn apply_flags(&self, flags: &ViewerFlags) {
        self.state.lock().flags = Some(*flags);
    }

    fn set_layout(&self, mode: &str) {
        self.state.lock().layout = Some(mode.to_string());
    }

    fn set_draggable(&self, draggable: bool) {
        self.state.lock().draggable = draggable;
    }

    fn set_dragging(&self, dragging: bool) {
        self.state.lock().dragging = dragging;
    }

    fn set_text_selection(&self, enabled: bool) {
        self.state.lock().text_selection = enabled;
    }

    fn set_links(&self, enabled: bool) {
        self.state.lock().links = enabled;
    }

    fn insert_stylesheet(&self, css: &str) {
        self.state.lock().stylesheets.push(css.to_string());
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        for container in state.containers.values() {
            container.remove();
        }
        *state = SurfaceState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg(text: &str) -> Asset {
        Asset::PageSvg(Arc::from(text))
    }

    #[test]
    fn test_container_is_stable_per_page_and_layer() {
        let surface = HeadlessSurface::new();
        let a = surface.container(1, Layer::Content);
        a.insert(&svg("<svg/>"));

        let again = surface.memory_container(1, Layer::Content).unwrap();
        assert_eq!(again.inserts(), 1);
        assert!(surface.memory_container(1, Layer::Text).is_none());
    }

    #[test]
    fn test_memory_container_lifecycle() {
        let container = MemoryContainer::new();
        container.insert(&svg("<svg/>"));
        container.show();
        assert!(container.is_visible());

        container.hide();
        assert!(!container.is_visible());
        assert!(container.content().is_some());

        container.remove();
        container.remove();
        assert_eq!(container.removals(), 1);
        assert!(container.content().is_none());
    }

    #[test]
    fn test_loaded_pages_and_clear() {
        let surface = HeadlessSurface::new();
        surface.container(3, Layer::Content).insert(&svg("3"));
        surface.container(1, Layer::Content).insert(&svg("1"));
        surface.container(2, Layer::Text).insert(&Asset::PageText(Arc::from("t")));
        surface.set_layout("vertical");
        assert_eq!(surface.loaded_pages(), vec![1, 3]);

        surface.clear();
        assert!(surface.loaded_pages().is_empty());
        assert!(surface.layout().is_none());
    }

    #[test]
    fn test_flags_from_capabilities() {
        let flags = ViewerFlags::from_capabilities(&CapabilitySet::for_host(false, true, false));
        assert!(flags.png_fallback);
        assert!(flags.mobile);
        assert!(flags.text_layer);
    }
}
