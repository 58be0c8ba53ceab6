//! A document page: a content layer plus an optional text layer.

use super::asset::PageAsset;
use super::surface::{Layer, RenderSurface};
use crate::asset::{AssetCache, AssetKey, AssetKind};
use crate::bus::{Message, MessageBus};
use crate::capability::CapabilitySet;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Load status of a whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Which layers a page is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayers {
    /// `page-svg` or `page-img`; `None` for text documents.
    pub content: Option<AssetKind>,
    pub text: bool,
}

impl PageLayers {
    /// Layers of a paged document on this host.
    pub fn paged(caps: &CapabilitySet) -> Self {
        Self {
            content: Some(if caps.use_png_fallback {
                AssetKind::PageImg
            } else {
                AssetKind::PageSvg
            }),
            text: caps.use_text_layer,
        }
    }

    /// Layers of a reflowed text document.
    pub fn text_only() -> Self {
        Self {
            content: None,
            text: true,
        }
    }
}

/// Session services a page needs.
#[derive(Clone)]
pub struct PageContext {
    pub assets: AssetCache,
    pub surface: Arc<dyn RenderSurface>,
    pub bus: Arc<MessageBus>,
    pub caps: CapabilitySet,
}

/// One page of the document.
///
/// Broadcasts `pageload` or `pagefail` when the primary layer settles and
/// `pageunload` when a loaded page is unloaded. The primary layer is the
/// content layer, or the text layer for text documents.
pub struct Page {
    index: u32,
    content: Option<PageAsset>,
    text: Option<PageAsset>,
    bus: Arc<MessageBus>,
    status: Arc<Mutex<PageStatus>>,
}

impl Page {
    pub fn new(index: u32, layers: PageLayers, ctx: &PageContext) -> Self {
        let content = layers.content.map(|kind| {
            let remove = match kind {
                AssetKind::PageImg => ctx.caps.remove_img_on_unload,
                _ => ctx.caps.remove_svg_on_unload,
            };
            PageAsset::new(
                AssetKey::page(kind, index),
                Layer::Content,
                ctx.assets.clone(),
                ctx.surface.container(index, Layer::Content),
                Arc::clone(&ctx.bus),
                remove,
            )
        });
        let text = layers.text.then(|| {
            PageAsset::new(
                AssetKey::page(AssetKind::PageText, index),
                Layer::Text,
                ctx.assets.clone(),
                ctx.surface.container(index, Layer::Text),
                Arc::clone(&ctx.bus),
                ctx.caps.remove_svg_on_unload,
            )
        });

        Self {
            index,
            content,
            text,
            bus: Arc::clone(&ctx.bus),
            status: Arc::new(Mutex::new(PageStatus::Unloaded)),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn status(&self) -> PageStatus {
        *self.status.lock()
    }

    pub fn is_loaded(&self) -> bool {
        self.status() == PageStatus::Loaded
    }

    fn layers(&self) -> impl Iterator<Item = &PageAsset> {
        self.content.iter().chain(self.text.iter())
    }

    /// Requests every layer without showing it.
    pub fn preload(&self) {
        for layer in self.layers() {
            layer.preload();
        }
    }

    /// Loads and shows every layer.
    pub fn load(&self) {
        let mut primary = None;
        for layer in self.layers() {
            let started = layer.load();
            if primary.is_none() {
                primary = Some(started);
            }
        }

        let Some(Some(handle)) = primary else {
            return;
        };
        *self.status.lock() = PageStatus::Loading;

        let page = self.index;
        let status = Arc::clone(&self.status);
        let bus = Arc::clone(&self.bus);
        handle.on_settle(move |result| {
            let message = match result {
                Ok(_) => {
                    *status.lock() = PageStatus::Loaded;
                    Message::PageLoad { page }
                }
                Err(err) => {
                    *status.lock() = PageStatus::Failed;
                    Message::PageFail {
                        page,
                        error: err.clone(),
                    }
                }
            };
            bus.broadcast(message);
        });
    }

    /// Unloads every layer.
    pub fn unload(&self) {
        let was = std::mem::replace(&mut *self.status.lock(), PageStatus::Unloaded);
        for layer in self.layers() {
            layer.unload();
        }
        if matches!(was, PageStatus::Loading | PageStatus::Loaded) {
            debug!(page = self.index, "Page unloaded");
            self.bus.broadcast(Message::PageUnload { page: self.index });
        }
    }

    /// Tears the page down, removing all content.
    pub fn destroy(&self) {
        *self.status.lock() = PageStatus::Unloaded;
        for layer in self.layers() {
            layer.destroy();
        }
    }
}
