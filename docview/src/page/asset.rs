//! Lifecycle of one asset layer of one page.

use super::surface::{Layer, PageContainer};
use crate::asset::{Asset, AssetCache, AssetHandle, AssetKey};
use crate::bus::{Message, MessageBus};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Where a page asset is in its load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAssetState {
    Unloaded,
    /// Requested but not shown.
    Preloading,
    /// Shown, or shown as soon as the asset arrives.
    Loaded,
    /// Unloaded with its content kept in the container.
    Hidden,
}

struct Slot {
    state: PageAssetState,
    handle: Option<AssetHandle>,
    /// `load` was called in the current cycle.
    requested: bool,
    /// The container currently holds this asset.
    inserted: bool,
    /// Bumped on every unload so late continuations can be told apart.
    cycle: u64,
}

/// One layer (`page-svg`, `page-img` or `page-text`) of a page.
///
/// ```text
///   Unloaded ──preload──► Preloading ──load──► Loaded ◄──load── Hidden
///      ▲                                          │              ▲
///      └────────── unload (remove) ◄──────────────┴─unload(hide)─┘
/// ```
pub struct PageAsset {
    key: AssetKey,
    layer: Layer,
    assets: AssetCache,
    container: Arc<dyn PageContainer>,
    bus: Arc<MessageBus>,
    remove_on_unload: bool,
    slot: Arc<Mutex<Slot>>,
}

impl PageAsset {
    /// Creates a page asset.
    ///
    /// # Arguments
    ///
    /// * `key` - Page-level asset key
    /// * `layer` - Layer the asset renders into
    /// * `assets` - Session asset cache
    /// * `container` - Host container for the layer
    /// * `bus` - Session bus, for non-fatal `asseterror`
    /// * `remove_on_unload` - Remove content on unload instead of hiding it
    pub fn new(
        key: AssetKey,
        layer: Layer,
        assets: AssetCache,
        container: Arc<dyn PageContainer>,
        bus: Arc<MessageBus>,
        remove_on_unload: bool,
    ) -> Self {
        Self {
            key,
            layer,
            assets,
            container,
            bus,
            remove_on_unload,
            slot: Arc::new(Mutex::new(Slot {
                state: PageAssetState::Unloaded,
                handle: None,
                requested: false,
                inserted: false,
                cycle: 0,
            })),
        }
    }

    pub fn key(&self) -> AssetKey {
        self.key
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn state(&self) -> PageAssetState {
        self.slot.lock().state
    }

    /// Requests the asset without showing it.
    ///
    /// Idempotent within a load cycle: the same handle is returned until
    /// the next `unload`.
    pub fn preload(&self) -> AssetHandle {
        let mut slot = self.slot.lock();
        if let Some(handle) = &slot.handle {
            return handle.clone();
        }
        let handle = self.assets.get(self.key);
        slot.handle = Some(handle.clone());
        if matches!(slot.state, PageAssetState::Unloaded | PageAssetState::Hidden) {
            slot.state = PageAssetState::Preloading;
        }
        trace!(key = %self.key, cycle = slot.cycle, "Page asset preloading");
        handle
    }

    /// Requests the asset and shows it once it arrives.
    ///
    /// Returns the handle when this call started the load, or `None` if
    /// the asset was already loading or loaded in this cycle.
    pub fn load(&self) -> Option<AssetHandle> {
        let handle = self.preload();
        let cycle = {
            let mut slot = self.slot.lock();
            if slot.requested {
                return None;
            }
            slot.requested = true;
            slot.state = PageAssetState::Loaded;
            slot.cycle
        };

        let slot = Arc::clone(&self.slot);
        let container = Arc::clone(&self.container);
        handle.on_success(move |asset: &Asset| {
            // Held across the container calls so an unload cannot interleave.
            let mut slot = slot.lock();
            if slot.cycle != cycle {
                return;
            }
            if !slot.inserted {
                slot.inserted = true;
                container.insert(asset);
            }
            container.show();
        });

        let slot = Arc::clone(&self.slot);
        let bus = Arc::clone(&self.bus);
        handle.on_failure(move |err| {
            {
                let mut slot = slot.lock();
                if slot.cycle != cycle {
                    return;
                }
                slot.state = PageAssetState::Unloaded;
                slot.requested = false;
                slot.handle = None;
            }
            debug!(key = %err.key(), error = %err, "Page asset failed");
            bus.broadcast(Message::AssetError(err.clone()));
        });

        Some(handle)
    }

    /// Ends the load cycle: aborts the request, then removes or hides the
    /// content according to the host's unload policy.
    pub fn unload(&self) {
        let handle = {
            let mut slot = self.slot.lock();
            slot.cycle += 1;
            slot.requested = false;
            if self.remove_on_unload {
                slot.inserted = false;
                slot.state = PageAssetState::Unloaded;
                self.container.remove();
            } else {
                slot.state = if slot.inserted {
                    PageAssetState::Hidden
                } else {
                    PageAssetState::Unloaded
                };
                self.container.hide();
            }
            slot.handle.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
        trace!(key = %self.key, removed = self.remove_on_unload, "Page asset unloaded");
    }

    /// Aborts any request and always removes the content.
    pub fn destroy(&self) {
        let handle = {
            let mut slot = self.slot.lock();
            slot.cycle += 1;
            slot.requested = false;
            slot.inserted = false;
            slot.state = PageAssetState::Unloaded;
            self.container.remove();
            slot.handle.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{
        AssetKind, AssetLocator, AssetSettings, MemoryTransport, ProcessingOptions, Settled,
        TransportError, UrlTemplates,
    };
    use crate::bus::{Component, MessageKind};
    use crate::page::surface::MemoryContainer;

    const BASE: &str = "https://assets/doc1/";

    /// A minimal valid PNG header.
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    struct Errors {
        log: Arc<Mutex<Vec<AssetKey>>>,
    }

    impl Component for Errors {
        fn name(&self) -> &str {
            "errors"
        }
        fn messages(&self) -> &[MessageKind] {
            &[MessageKind::AssetError]
        }
        fn on_message(&self, message: &Message) {
            if let Message::AssetError(err) = message {
                self.log.lock().push(err.key());
            }
        }
    }

    struct Fixture {
        transport: Arc<MemoryTransport>,
        container: Arc<MemoryContainer>,
        errors: Arc<Mutex<Vec<AssetKey>>>,
        asset: PageAsset,
    }

    fn fixture(remove_on_unload: bool) -> Fixture {
        let transport = Arc::new(MemoryTransport::new().route(format!("{}page-3.png", BASE), PNG));
        let assets = AssetCache::new(
            transport.clone(),
            AssetLocator::new(BASE, "", UrlTemplates::default()),
            AssetSettings::default(),
            ProcessingOptions::default(),
        );
        let bus = Arc::new(MessageBus::new());
        let errors = Arc::new(Mutex::new(Vec::new()));
        bus.attach(Arc::new(Errors {
            log: Arc::clone(&errors),
        }));
        let container = Arc::new(MemoryContainer::new());
        let asset = PageAsset::new(
            AssetKey::page(AssetKind::PageImg, 3),
            Layer::Content,
            assets,
            container.clone(),
            bus,
            remove_on_unload,
        );
        Fixture {
            transport,
            container,
            errors,
            asset,
        }
    }

    async fn settle(handle: &AssetHandle) -> Settled {
        handle.wait().await
    }

    #[tokio::test]
    async fn test_preload_is_idempotent() {
        let f = fixture(true);
        let a = f.asset.preload();
        let b = f.asset.preload();
        assert!(a.ptr_eq(&b));
        assert_eq!(f.asset.state(), PageAssetState::Preloading);

        settle(&a).await;
        assert_eq!(f.transport.requests_for(&format!("{}page-3.png", BASE)), 1);
        assert!(f.container.content().is_none());
    }

    #[tokio::test]
    async fn test_load_inserts_and_shows() {
        let f = fixture(true);
        let handle = f.asset.load().unwrap();
        assert!(f.asset.load().is_none());

        settle(&handle).await;
        assert_eq!(f.asset.state(), PageAssetState::Loaded);
        assert_eq!(f.container.inserts(), 1);
        assert!(f.container.is_visible());
    }

    #[tokio::test]
    async fn test_one_fetch_per_load_cycle() {
        let f = fixture(true);
        let url = format!("{}page-3.png", BASE);

        f.asset.preload();
        let first = f.asset.load().unwrap();
        settle(&first).await;
        f.asset.unload();
        assert!(f.container.content().is_none());

        let second = f.asset.load().unwrap();
        assert!(!second.ptr_eq(&first));
        settle(&second).await;

        assert_eq!(f.transport.requests_for(&url), 2);
        assert_eq!(f.container.inserts(), 2);
        assert_eq!(f.container.removals(), 1);
    }

    #[tokio::test]
    async fn test_hide_policy_keeps_content() {
        let f = fixture(false);
        let first = f.asset.load().unwrap();
        settle(&first).await;

        f.asset.unload();
        assert_eq!(f.asset.state(), PageAssetState::Hidden);
        assert!(!f.container.is_visible());
        assert!(f.container.content().is_some());

        let second = f.asset.load().unwrap();
        settle(&second).await;
        assert_eq!(f.container.inserts(), 1);
        assert!(f.container.is_visible());
    }

    #[tokio::test]
    async fn test_unload_before_arrival_suppresses_insert() {
        let f = fixture(true);
        let handle = f.asset.load().unwrap();
        f.asset.unload();

        assert_eq!(settle(&handle).await, Settled::Cancelled);
        assert_eq!(f.container.inserts(), 0);
        assert!(f.errors.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failure_broadcasts_asset_error() {
        let f = fixture(true);
        let url = format!("{}page-3.png", BASE);
        f.transport
            .fail_next(url, vec![TransportError::status(404, "not found")]);

        let handle = f.asset.load().unwrap();
        settle(&handle).await;

        assert_eq!(f.asset.state(), PageAssetState::Unloaded);
        assert_eq!(*f.errors.lock(), vec![AssetKey::page(AssetKind::PageImg, 3)]);
        assert_eq!(f.container.inserts(), 0);
    }

    /// Container that unloads its page from another thread while the
    /// asset is being inserted.
    struct UnloadDuringInsert {
        inner: MemoryContainer,
        page: std::sync::OnceLock<Arc<PageAsset>>,
        unloader: Mutex<Option<std::thread::JoinHandle<()>>>,
    }

    impl PageContainer for UnloadDuringInsert {
        fn insert(&self, asset: &Asset) {
            self.inner.insert(asset);
            if let Some(page) = self.page.get() {
                let page = Arc::clone(page);
                *self.unloader.lock() = Some(std::thread::spawn(move || page.unload()));
                std::thread::sleep(std::time::Duration::from_millis(30));
            }
        }
        fn show(&self) {
            self.inner.show();
        }
        fn hide(&self) {
            self.inner.hide();
        }
        fn remove(&self) {
            self.inner.remove();
        }
    }

    #[tokio::test]
    async fn test_concurrent_unload_wins_over_late_show() {
        let transport = Arc::new(MemoryTransport::new().route(format!("{}page-3.png", BASE), PNG));
        let assets = AssetCache::new(
            transport,
            AssetLocator::new(BASE, "", UrlTemplates::default()),
            AssetSettings::default(),
            ProcessingOptions::default(),
        );
        let container = Arc::new(UnloadDuringInsert {
            inner: MemoryContainer::new(),
            page: std::sync::OnceLock::new(),
            unloader: Mutex::new(None),
        });
        let page = Arc::new(PageAsset::new(
            AssetKey::page(AssetKind::PageImg, 3),
            Layer::Content,
            assets,
            container.clone(),
            Arc::new(MessageBus::new()),
            true,
        ));
        let _ = container.page.set(Arc::clone(&page));

        let handle = page.load().unwrap();
        settle(&handle).await;
        let unloader = container.unloader.lock().take().unwrap();
        unloader.join().unwrap();

        assert_eq!(page.state(), PageAssetState::Unloaded);
        assert!(container.inner.content().is_none());
        assert!(!container.inner.is_visible());
    }

    #[tokio::test]
    async fn test_destroy_forces_removal() {
        let f = fixture(false);
        let handle = f.asset.load().unwrap();
        settle(&handle).await;

        f.asset.destroy();
        assert!(f.container.content().is_none());
        assert_eq!(f.asset.state(), PageAssetState::Unloaded);
    }
}
