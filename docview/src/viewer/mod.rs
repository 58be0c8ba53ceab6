//! The viewer: one document session.
//!
//! A [`Viewer`] owns a session [`Scope`] (configuration, capabilities,
//! asset cache, message bus and render surface) and drives it through
//! init, document load, layout selection and teardown.
//!
//! ```text
//!            ┌──────────────┐
//!            │    Viewer    │── ready() ──► SessionOutcome
//!            └──────┬───────┘
//!                   │ owns
//!            ┌──────▼───────┐
//!            │    Scope     │
//!            └──────┬───────┘
//!       ┌───────────┼────────────┬──────────────┐
//!       ▼           ▼            ▼              ▼
//!  viewer-base  controller   layout-<mode>   plugins
//!  (forwards)   (pages)      (navigation)
//! ```

mod base;
mod builder;
mod controller;
mod error;
mod orchestrator;
mod scope;
mod session;

pub use base::{Dragger, ViewerBase, DRAGGER, VIEWER_BASE};
pub use builder::{builtin_components, ViewerBuilder};
pub use controller::{Controller, ControllerKind};
pub use error::{ConfigError, ViewerError};
pub use orchestrator::Viewer;
pub use scope::{ActiveLayout, ComponentRegistry, Scope, Toggles};
pub use session::{SessionConfig, SessionState};
