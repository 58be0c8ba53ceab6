//! Layouts: navigation state machines selected by mode name.
//!
//! A layout owns the current page and zoom. Strategies are resolved from a
//! [`LayoutRegistry`] by mode name and hosted on the bus by a
//! [`LayoutComponent`].
//!
//! ```text
//!   set_layout("presentation")
//!          │
//!          ▼
//!   LayoutRegistry::resolve ──► factory(&LayoutContext) ──► Box<dyn LayoutStrategy>
//!                                                                  │
//!                                       LayoutComponent ◄──────────┘
//!                                        │ zoom / pagefocus
//!                                        ▼
//!                                    MessageBus
//! ```

mod component;
mod flow;
mod strategy;

pub use component::LayoutComponent;
pub use flow::{
    FlowKind, FlowLayout, LAYOUT_HORIZONTAL, LAYOUT_PRESENTATION, LAYOUT_PRESENTATION_TWO_PAGE,
    LAYOUT_TEXT, LAYOUT_VERTICAL, MAX_ZOOM, MIN_ZOOM, ZOOM_LEVELS,
};
pub use strategy::{
    LayoutContext, LayoutError, LayoutState, LayoutStrategy, Viewport, ZoomMode, ZoomState,
    ZoomValue,
};

use crate::bus::Registry;

/// Output of a layout factory.
pub type LayoutResult = Result<Box<dyn LayoutStrategy>, LayoutError>;

/// Layout factories keyed by mode name.
pub type LayoutRegistry = Registry<LayoutContext, LayoutResult>;

/// A registry holding every built-in layout.
pub fn builtin_layouts() -> LayoutRegistry {
    let mut registry = LayoutRegistry::new();
    for kind in FlowKind::ALL {
        registry.register(kind.mode(), move |ctx: &LayoutContext| -> LayoutResult {
            Ok(Box::new(FlowLayout::new(kind, *ctx)?))
        });
    }
    registry
}
