//! Synchronous publish-subscribe bus.

use super::component::{Component, ComponentId};
use super::message::{Message, MessageKind};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

struct Attached {
    name: String,
    component: Arc<dyn Component>,
}

#[derive(Default)]
struct BusState {
    components: BTreeMap<ComponentId, Attached>,
    subscriptions: HashMap<MessageKind, Vec<ComponentId>>,
    closed: bool,
}

/// Message bus for one viewer session.
///
/// Delivery is synchronous and in subscription order. The subscriber list
/// is snapshotted when a broadcast starts and no lock is held while a
/// handler runs, so handlers may broadcast, attach or destroy components.
/// Nested broadcasts are delivered depth-first: a broadcast issued from a
/// handler reaches all of its subscribers before the outer broadcast moves
/// on. Components destroyed mid-broadcast are skipped.
pub struct MessageBus {
    state: Mutex<BusState>,
    next_id: AtomicU64,
    depth: AtomicUsize,
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BusState::default()),
            next_id: AtomicU64::new(1),
            depth: AtomicUsize::new(0),
        }
    }

    /// Attaches a component and registers its subscriptions.
    ///
    /// Returns `None` if the bus has already been torn down.
    pub fn attach(&self, component: Arc<dyn Component>) -> Option<ComponentId> {
        let id = ComponentId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let name = component.name().to_string();
        let mut kinds: Vec<MessageKind> = Vec::new();
        for kind in component.messages() {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }

        let mut state = self.state.lock();
        if state.closed {
            debug!(component = %name, "Attach after bus teardown ignored");
            return None;
        }
        for kind in &kinds {
            state.subscriptions.entry(*kind).or_default().push(id);
        }
        state.components.insert(id, Attached { name, component });
        trace!(id = %id, subscriptions = kinds.len(), "Component attached");
        Some(id)
    }

    /// Unregisters a component without running its teardown hook.
    pub fn detach(&self, id: ComponentId) -> Option<Arc<dyn Component>> {
        let mut state = self.state.lock();
        let attached = state.components.remove(&id)?;
        for subscribers in state.subscriptions.values_mut() {
            subscribers.retain(|sub| *sub != id);
        }
        Some(attached.component)
    }

    /// Unregisters a component, then runs its teardown hook.
    pub fn destroy_component(&self, id: ComponentId) -> bool {
        match self.detach(id) {
            Some(component) => {
                debug!(id = %id, component = component.name(), "Component destroyed");
                component.destroy();
                true
            }
            None => false,
        }
    }

    /// Delivers `message` to every current subscriber of its kind.
    ///
    /// Returns the number of components that received it.
    pub fn broadcast(&self, message: Message) -> usize {
        let kind = message.kind();
        let recipients: Vec<(ComponentId, Arc<dyn Component>)> = {
            let state = self.state.lock();
            if state.closed {
                trace!(message = %kind, "Broadcast after bus teardown dropped");
                return 0;
            }
            state
                .subscriptions
                .get(&kind)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| {
                            state
                                .components
                                .get(id)
                                .map(|a| (*id, Arc::clone(&a.component)))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(message = %kind, recipients = recipients.len(), depth = depth, "Broadcast");

        let mut delivered = 0;
        for (id, component) in recipients {
            if !self.is_attached(id) {
                continue;
            }
            component.on_message(&message);
            delivered += 1;
        }

        self.depth.fetch_sub(1, Ordering::SeqCst);
        delivered
    }

    /// Tears down every component in reverse attach order and closes the bus.
    pub fn destroy_all(&self) {
        let components: Vec<Attached> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.subscriptions.clear();
            std::mem::take(&mut state.components).into_values().rev().collect()
        };
        debug!(components = components.len(), "Message bus torn down");
        for attached in components {
            trace!(component = %attached.name, "Component destroyed");
            attached.component.destroy();
        }
    }

    pub fn is_attached(&self, id: ComponentId) -> bool {
        self.state.lock().components.contains_key(&id)
    }

    pub fn component(&self, id: ComponentId) -> Option<Arc<dyn Component>> {
        self.state
            .lock()
            .components
            .get(&id)
            .map(|a| Arc::clone(&a.component))
    }

    /// Names of the subscribers of `kind`, in delivery order.
    pub fn subscribers(&self, kind: MessageKind) -> Vec<String> {
        let state = self.state.lock();
        state
            .subscriptions
            .get(&kind)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.components.get(id).map(|a| a.name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MessageBus")
            .field("components", &state.components.len())
            .field("closed", &state.closed)
            .finish()
    }
}
