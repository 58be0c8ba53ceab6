//! Message bus and component framework.
//!
//! # Architecture
//!
//! ```text
//!                    broadcast(Message)
//!   ┌───────────┐ ─────────────────────► ┌─────────────┐
//!   │ Component │                        │ MessageBus  │── snapshot subscribers(kind)
//!   └───────────┘ ◄───── on_message ──── └─────────────┘
//!         ▲                                     │
//!         │ factory(&Scope)                     │ attach / destroy_component
//!   ┌───────────┐                               ▼
//!   │ Registry  │                        subscriptions per MessageKind
//!   └───────────┘
//! ```
//!
//! Components are resolved by name from an explicit [`Registry`] and
//! attached to the session's [`MessageBus`]. The [`ReadyGate`] records the
//! session's single startup outcome.

#[allow(clippy::module_inception)]
mod bus;
mod component;
mod message;
mod ready;
mod registry;

pub use bus::MessageBus;
pub use component::{Component, ComponentId};
pub use message::{
    LinkTarget, Message, MessageKind, ScrollPosition, SessionFailure, ZoomEvent,
};
pub use ready::{ReadyGate, SessionOutcome};
pub use registry::{Factory, Registry};
