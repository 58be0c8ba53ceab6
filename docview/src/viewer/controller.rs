//! Document controllers: keep the pages around the focused page loaded.

use super::scope::Scope;
use crate::asset::DocumentType;
use crate::bus::{Component, Message, MessageKind};
use crate::page::{Page, PageLayers};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use tracing::{debug, trace};

const SUBSCRIPTIONS: &[MessageKind] = &[MessageKind::PageFocus];

/// Controller variant, chosen from the document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    /// Fixed pages: content layer plus an optional text layer.
    Paged,
    /// Reflowed text: text layer only.
    Text,
}

impl ControllerKind {
    pub fn for_document(doc_type: DocumentType) -> Self {
        match doc_type {
            DocumentType::Paged => ControllerKind::Paged,
            DocumentType::Text => ControllerKind::Text,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControllerKind::Paged => "controller-paged",
            ControllerKind::Text => "controller-text",
        }
    }
}

/// Owns the document's pages and loads them as focus moves.
///
/// On every `pagefocus` the pages inside the load window around the focused
/// page are loaded, nearest first, and every other loaded page is unloaded.
/// The page right after the window is preloaded.
pub struct Controller {
    kind: ControllerKind,
    pages: Vec<Page>,
    range: u32,
    loaded: Mutex<BTreeSet<u32>>,
}

impl Controller {
    pub fn new(kind: ControllerKind, num_pages: u32, scope: &Scope) -> Self {
        let caps = scope.capabilities();
        let layers = match kind {
            ControllerKind::Paged => PageLayers::paged(caps),
            ControllerKind::Text => PageLayers::text_only(),
        };
        let ctx = scope.page_context();
        let pages = (1..=num_pages)
            .map(|index| Page::new(index, layers, &ctx))
            .collect();

        Self {
            kind,
            pages,
            range: caps.page_load_range_for(num_pages),
            loaded: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    pub fn num_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn page(&self, index: u32) -> Option<&Page> {
        let slot = index.checked_sub(1)?;
        self.pages.get(slot as usize)
    }

    /// Pages currently requested for display, sorted.
    pub fn loaded_pages(&self) -> Vec<u32> {
        self.loaded.lock().iter().copied().collect()
    }

    /// Pages kept loaded while `focus` is focused.
    pub fn window_for(&self, focus: u32) -> RangeInclusive<u32> {
        let num_pages = self.num_pages();
        if num_pages == 0 {
            return 1..=0;
        }
        let span = self.range.max(1) - 1;
        let focus = focus.clamp(1, num_pages);
        let start = focus.saturating_sub(span / 2).max(1);
        let end = (start + span).min(num_pages);
        let start = end.saturating_sub(span).max(1);
        start..=end
    }

    pub fn load_page(&self, index: u32) -> bool {
        let Some(page) = self.page(index) else {
            return false;
        };
        self.loaded.lock().insert(index);
        page.load();
        true
    }

    pub fn preload_page(&self, index: u32) -> bool {
        match self.page(index) {
            Some(page) => {
                page.preload();
                true
            }
            None => false,
        }
    }

    pub fn unload_page(&self, index: u32) -> bool {
        let Some(page) = self.page(index) else {
            return false;
        };
        self.loaded.lock().remove(&index);
        page.unload();
        true
    }

    fn focus(&self, focus: u32) {
        let window = self.window_for(focus);
        let (unload, mut load) = {
            let mut loaded = self.loaded.lock();
            let unload: Vec<u32> = loaded
                .iter()
                .copied()
                .filter(|page| !window.contains(page))
                .collect();
            let load: Vec<u32> = window.clone().filter(|page| !loaded.contains(page)).collect();
            for page in &unload {
                loaded.remove(page);
            }
            loaded.extend(load.iter().copied());
            (unload, load)
        };
        load.sort_by_key(|page| (page.abs_diff(focus), *page));

        debug!(
            controller = self.kind.name(),
            focus = focus,
            loading = load.len(),
            unloading = unload.len(),
            "Page window moved"
        );

        for index in unload {
            if let Some(page) = self.page(index) {
                page.unload();
            }
        }
        for index in load {
            if let Some(page) = self.page(index) {
                page.load();
            }
        }
        let next = window.end() + 1;
        if self.preload_page(next) {
            trace!(page = next, "Preloading page after window");
        }
    }

    /// Destroys every page, forcing removal of their content.
    pub fn destroy_pages(&self) {
        self.loaded.lock().clear();
        for page in &self.pages {
            page.destroy();
        }
    }
}

impl Component for Controller {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn messages(&self) -> &[MessageKind] {
        SUBSCRIPTIONS
    }

    fn on_message(&self, message: &Message) {
        if let Message::PageFocus { page, .. } = message {
            self.focus(*page);
        }
    }

    fn destroy(&self) {
        self.destroy_pages();
    }
}
