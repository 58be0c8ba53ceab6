//! The component contract.

use super::message::{Message, MessageKind};
use std::fmt;

/// Identifier assigned to a component when it is attached to a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component-{}", self.0)
    }
}

/// A named unit attached to the message bus.
///
/// Handlers take `&self`; components keep mutable state behind their own
/// locks and must release them before broadcasting, because delivery is
/// synchronous and re-entrant.
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    /// Messages this component subscribes to, in registration order.
    fn messages(&self) -> &[MessageKind] {
        &[]
    }

    /// One-time initialization with the component's config slice.
    fn init(&self, _config: &serde_json::Value) {}

    fn on_message(&self, _message: &Message) {}

    /// Teardown hook, called after the component is unsubscribed.
    fn destroy(&self) {}
}
