//! Cancellable, shareable asset handles.
//!
//! An [`AssetHandle`] is the single object callers hold for an in-flight or
//! settled asset request. Every clone observes the same outcome.
//!
//! ```text
//!   pending ──resolve──► resolved(Ok | Err)     continuations run once, in order
//!      │
//!      └──abort──► cancelled                    continuations dropped, never run
//! ```
//!
//! Abort and resolve race under the slot lock: whichever runs first wins.
//! Aborting an already resolved handle keeps the outcome and only detaches
//! the handle from the cache that produced it.

use super::error::AssetError;
use super::types::{Asset, AssetKey};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Outcome of a resolved handle.
pub type AssetResult = Result<Asset, AssetError>;

type Continuation = Box<dyn FnOnce(&AssetResult) + Send>;
type AbortHook = Box<dyn FnOnce(&AssetHandle) + Send>;

/// Terminal state observed by [`AssetHandle::wait`].
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    Done(AssetResult),
    Cancelled,
}

enum Slot {
    Pending(Vec<Continuation>),
    Resolved(AssetResult),
    Cancelled,
}

struct Shared {
    key: AssetKey,
    slot: Mutex<Slot>,
    token: CancellationToken,
    settled: watch::Sender<Option<Settled>>,
    aborted: AtomicBool,
    on_abort: Mutex<Option<AbortHook>>,
}

/// Handle to a cached asset pipeline.
#[derive(Clone)]
pub struct AssetHandle {
    shared: Arc<Shared>,
}

impl AssetHandle {
    pub(crate) fn pending(key: AssetKey) -> Self {
        let (settled, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                key,
                slot: Mutex::new(Slot::Pending(Vec::new())),
                token: CancellationToken::new(),
                settled,
                aborted: AtomicBool::new(false),
                on_abort: Mutex::new(None),
            }),
        }
    }

    /// Creates a handle that is already resolved with `result`.
    pub fn resolved(key: AssetKey, result: AssetResult) -> Self {
        let handle = Self::pending(key);
        handle.resolve(result);
        handle
    }

    /// Creates a handle that is already cancelled and will never resolve.
    pub fn cancelled(key: AssetKey) -> Self {
        let handle = Self::pending(key);
        handle.abort();
        handle
    }

    pub fn key(&self) -> AssetKey {
        self.shared.key
    }

    /// Token cancelled when the handle is aborted.
    pub(crate) fn token(&self) -> CancellationToken {
        self.shared.token.clone()
    }

    /// Installs the hook run on the first `abort()`.
    pub(crate) fn set_abort_hook(&self, hook: impl FnOnce(&AssetHandle) + Send + 'static) {
        *self.shared.on_abort.lock() = Some(Box::new(hook));
    }

    /// Whether both handles refer to the same request.
    pub fn ptr_eq(&self, other: &AssetHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.aborted.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Pending(_))
    }

    /// Current outcome without waiting.
    pub fn peek(&self) -> Option<Settled> {
        match &*self.shared.slot.lock() {
            Slot::Pending(_) => None,
            Slot::Resolved(result) => Some(Settled::Done(result.clone())),
            Slot::Cancelled => Some(Settled::Cancelled),
        }
    }

    /// Runs `f` with the asset if the handle resolves successfully.
    pub fn on_success(&self, f: impl FnOnce(&Asset) + Send + 'static) -> &Self {
        self.attach(Box::new(move |result| {
            if let Ok(asset) = result {
                f(asset)
            }
        }));
        self
    }

    /// Runs `f` with the error if the handle resolves with a failure.
    pub fn on_failure(&self, f: impl FnOnce(&AssetError) + Send + 'static) -> &Self {
        self.attach(Box::new(move |result| {
            if let Err(err) = result {
                f(err)
            }
        }));
        self
    }

    /// Runs `f` with whichever outcome the handle resolves to.
    pub fn on_settle(&self, f: impl FnOnce(&AssetResult) + Send + 'static) -> &Self {
        self.attach(Box::new(f));
        self
    }

    fn attach(&self, continuation: Continuation) {
        let ready = {
            let mut slot = self.shared.slot.lock();
            match &mut *slot {
                Slot::Pending(queue) => {
                    queue.push(continuation);
                    return;
                }
                Slot::Resolved(result) => result.clone(),
                Slot::Cancelled => return,
            }
        };
        continuation(&ready);
    }

    /// Resolves the handle and runs queued continuations in attachment order.
    ///
    /// Returns `false` if the handle was already aborted or resolved.
    pub(crate) fn resolve(&self, result: AssetResult) -> bool {
        let queued = {
            let mut slot = self.shared.slot.lock();
            if !matches!(*slot, Slot::Pending(_)) {
                return false;
            }
            match std::mem::replace(&mut *slot, Slot::Resolved(result.clone())) {
                Slot::Pending(queue) => queue,
                _ => Vec::new(),
            }
        };

        for continuation in queued {
            continuation(&result);
        }

        self.shared.settled.send_replace(Some(Settled::Done(result)));
        true
    }

    /// Cancels the request.
    ///
    /// Idempotent. Stops the transport task, drops pending continuations and
    /// removes the cache entry if it still refers to this handle.
    pub fn abort(&self) {
        if self.shared.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.token.cancel();

        let dropped = {
            let mut slot = self.shared.slot.lock();
            if matches!(*slot, Slot::Pending(_)) {
                Some(std::mem::replace(&mut *slot, Slot::Cancelled))
            } else {
                None
            }
        };
        if dropped.is_some() {
            self.shared.settled.send_replace(Some(Settled::Cancelled));
        }
        drop(dropped);

        let hook = self.shared.on_abort.lock().take();
        if let Some(hook) = hook {
            hook(self);
        }
    }

    /// Waits until the handle is resolved or cancelled.
    pub async fn wait(&self) -> Settled {
        let mut rx = self.shared.settled.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(settled) = current {
                return settled;
            }
            if rx.changed().await.is_err() {
                return Settled::Cancelled;
            }
        }
    }
}

impl fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.shared.slot.lock() {
            Slot::Pending(queue) => format!("pending({} waiting)", queue.len()),
            Slot::Resolved(Ok(_)) => "resolved".to_string(),
            Slot::Resolved(Err(_)) => "failed".to_string(),
            Slot::Cancelled => "cancelled".to_string(),
        };
        f.debug_struct("AssetHandle")
            .field("key", &self.shared.key)
            .field("state", &state)
            .finish()
    }
}

/// Why a [`when_all`] wait did not produce every asset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JoinFailure {
    #[error(transparent)]
    Failed(AssetError),

    #[error("request for {0} was cancelled")]
    Cancelled(AssetKey),
}

/// Waits for every handle, returning the assets in input order.
///
/// Fails as soon as any handle fails or is cancelled.
pub async fn when_all(handles: &[AssetHandle]) -> Result<Vec<Asset>, JoinFailure> {
    let waits = handles.iter().map(|handle| async move {
        match handle.wait().await {
            Settled::Done(Ok(asset)) => Ok(asset),
            Settled::Done(Err(err)) => Err(JoinFailure::Failed(err)),
            Settled::Cancelled => Err(JoinFailure::Cancelled(handle.key())),
        }
    });
    futures::future::try_join_all(waits).await
}
