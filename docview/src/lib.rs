//! docview - document viewer core
//!
//! Loads a converted document's assets (metadata, stylesheet and per-page
//! SVG, PNG and text markup) and drives navigation, zoom and page loading
//! on a render surface supplied by the host.
//!
//! # High-Level API
//!
//! ```ignore
//! use docview::config::ViewerConfig;
//! use docview::viewer::Viewer;
//!
//! let viewer = Viewer::builder(ViewerConfig::new("https://assets.example.com/doc1"))
//!     .build()?;
//! viewer.init()?;
//! viewer.load_assets()?;
//!
//! match viewer.ready().await {
//!     SessionOutcome::Ready { num_pages, .. } => viewer.scroll_to(num_pages)?,
//!     other => eprintln!("document failed: {:?}", other),
//! }
//! viewer.destroy();
//! ```

pub mod asset;
pub mod bus;
pub mod capability;
pub mod config;
pub mod layout;
pub mod logging;
pub mod page;
pub mod viewer;

pub use bus::{Message, MessageKind, SessionOutcome};
pub use config::ViewerConfig;
pub use viewer::{Viewer, ViewerBuilder, ViewerError};

/// Version of the docview library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
