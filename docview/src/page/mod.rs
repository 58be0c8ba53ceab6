//! Page asset components and the render surface contract.
//!
//! ```text
//!   Page ─┬─ PageAsset(page-svg | page-img) ──► PageContainer(Content)
//!         └─ PageAsset(page-text)           ──► PageContainer(Text)
//! ```
//!
//! Each [`PageAsset`] drives one layer through its load cycle against the
//! session [`AssetCache`](crate::asset::AssetCache). Containers come from
//! the host's [`RenderSurface`].

mod asset;
#[allow(clippy::module_inception)]
mod page;
mod surface;

pub use asset::{PageAsset, PageAssetState};
pub use page::{Page, PageContext, PageLayers, PageStatus};
pub use surface::{
    HeadlessSurface, Layer, MemoryContainer, PageContainer, RenderSurface, ViewerFlags,
};
