//! Asset fetching, processing and caching.
//!
//! This module is a leaf: it knows nothing about the message bus, layouts or
//! the viewer. The viewer builds one [`AssetCache`] per session and every
//! component requests assets through it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   get(key)   ┌──────────────┐  fetch(url)  ┌────────────────┐
//! │  Components  │ ───────────► │  AssetCache  │ ───────────► │ AssetTransport │
//! └──────────────┘ ◄─────────── └──────────────┘ ◄─────────── └────────────────┘
//!                  AssetHandle        │ process(kind)
//!                                     ▼
//!                              metadata | stylesheet | page-svg | page-text | page-img
//! ```

mod cache;
mod error;
mod handle;
pub mod process;
mod transport;
mod types;
mod url;

pub use cache::{AssetCache, AssetSettings, CacheStats, RetryPolicy};
pub use error::{AssetError, TransportError};
pub use handle::{when_all, AssetHandle, AssetResult, JoinFailure, Settled};
pub use process::{ProcessingLimits, ProcessingOptions};
pub use transport::{
    AssetTransport, FileTransport, MemoryTransport, ReqwestTransport, TransportFuture,
};
pub use types::{Asset, AssetKey, AssetKind, DocumentMetadata, DocumentType, PageDimensions};
pub use url::{normalize_base_url, AssetLocator, QueryParams, UrlTemplates};
