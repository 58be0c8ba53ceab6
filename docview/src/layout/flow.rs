//! Built-in page flow layouts.

use super::strategy::{
    LayoutContext, LayoutError, LayoutState, LayoutStrategy, Viewport, ZoomMode, ZoomValue,
};
use crate::bus::{Message, ZoomEvent};

pub const LAYOUT_VERTICAL: &str = "vertical";
pub const LAYOUT_HORIZONTAL: &str = "horizontal";
pub const LAYOUT_PRESENTATION: &str = "presentation";
pub const LAYOUT_PRESENTATION_TWO_PAGE: &str = "presentation-two-page";
pub const LAYOUT_TEXT: &str = "text";

/// Preset levels stepped through by zoom in/out.
pub const ZOOM_LEVELS: [f64; 8] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 3.0];
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 3.0;

const EPSILON: f64 = 1e-6;

/// How pages flow through the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// Pages stacked top to bottom.
    Vertical,
    /// Pages side by side.
    Horizontal,
    /// One page per view.
    Presentation,
    /// Two facing pages per view.
    PresentationTwoPage,
    /// Reflowed text, scrolled vertically.
    Text,
}

impl FlowKind {
    pub const ALL: [FlowKind; 5] = [
        FlowKind::Vertical,
        FlowKind::Horizontal,
        FlowKind::Presentation,
        FlowKind::PresentationTwoPage,
        FlowKind::Text,
    ];

    pub fn mode(&self) -> &'static str {
        match self {
            FlowKind::Vertical => LAYOUT_VERTICAL,
            FlowKind::Horizontal => LAYOUT_HORIZONTAL,
            FlowKind::Presentation => LAYOUT_PRESENTATION,
            FlowKind::PresentationTwoPage => LAYOUT_PRESENTATION_TWO_PAGE,
            FlowKind::Text => LAYOUT_TEXT,
        }
    }

    fn pages_per_view(&self) -> f64 {
        match self {
            FlowKind::PresentationTwoPage => 2.0,
            _ => 1.0,
        }
    }

    fn is_paginated(&self) -> bool {
        matches!(
            self,
            FlowKind::Presentation | FlowKind::PresentationTwoPage
        )
    }
}

/// A layout parameterized by its [`FlowKind`].
#[derive(Debug, Clone)]
pub struct FlowLayout {
    kind: FlowKind,
    ctx: LayoutContext,
    state: LayoutState,
    /// Whether a page has been focused yet.
    positioned: bool,
}

impl FlowLayout {
    pub fn new(kind: FlowKind, ctx: LayoutContext) -> Result<Self, LayoutError> {
        if ctx.num_pages == 0 {
            return Err(LayoutError::Construction {
                mode: kind.mode().to_string(),
                reason: "document has no pages".to_string(),
            });
        }
        Ok(Self {
            kind,
            ctx,
            state: LayoutState::default(),
            positioned: false,
        })
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    fn fit_width(&self) -> f64 {
        let content = self.ctx.page_width * self.kind.pages_per_view();
        if self.ctx.viewport.width > 0.0 && content > 0.0 {
            self.ctx.viewport.width / content
        } else {
            1.0
        }
    }

    fn fit_height(&self) -> f64 {
        if self.ctx.viewport.height > 0.0 && self.ctx.page_height > 0.0 {
            self.ctx.viewport.height / self.ctx.page_height
        } else {
            1.0
        }
    }

    fn auto_zoom(&self) -> f64 {
        match self.kind {
            FlowKind::Vertical | FlowKind::Text => self.fit_width().min(1.0),
            FlowKind::Horizontal => self.fit_height().min(1.0),
            FlowKind::Presentation | FlowKind::PresentationTwoPage => {
                self.fit_width().min(self.fit_height())
            }
        }
    }

    fn zoom_for_mode(&self, mode: ZoomMode) -> f64 {
        match mode {
            ZoomMode::Auto => self.auto_zoom(),
            ZoomMode::FitWidth => self.fit_width(),
            ZoomMode::FitHeight => self.fit_height(),
        }
    }

    fn next_level_above(zoom: f64) -> Option<f64> {
        ZOOM_LEVELS.iter().copied().find(|level| *level > zoom + EPSILON)
    }

    fn next_level_below(zoom: f64) -> Option<f64> {
        ZOOM_LEVELS
            .iter()
            .rev()
            .copied()
            .find(|level| *level < zoom - EPSILON)
    }

    fn overflows(&self, zoom: f64) -> bool {
        let vp = self.ctx.viewport;
        if vp.width <= 0.0 || vp.height <= 0.0 {
            return false;
        }
        let width = self.ctx.page_width * self.kind.pages_per_view() * zoom;
        let height = self.ctx.page_height * zoom;
        match self.kind {
            FlowKind::Horizontal => height > vp.height + EPSILON,
            kind if kind.is_paginated() => {
                width > vp.width + EPSILON || height > vp.height + EPSILON
            }
            _ => width > vp.width + EPSILON,
        }
    }

    fn apply_zoom(&mut self, zoom: f64, mode: Option<ZoomMode>) -> Option<ZoomEvent> {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let current = &mut self.state.zoom;
        current.zoom_mode = mode;
        if (zoom - current.zoom).abs() < EPSILON {
            return None;
        }
        current.prev_zoom = current.zoom;
        current.zoom = zoom;
        self.state.zoom.is_draggable = self.overflows(zoom);
        Some(self.zoom_event())
    }

    fn zoom_event(&self) -> ZoomEvent {
        let zoom = self.state.zoom;
        ZoomEvent {
            zoom: zoom.zoom,
            prev_zoom: zoom.prev_zoom,
            is_draggable: zoom.is_draggable,
            can_zoom_in: Self::next_level_above(zoom.zoom).is_some(),
            can_zoom_out: Self::next_level_below(zoom.zoom).is_some(),
        }
    }

    fn align(&self, page: u32) -> u32 {
        let page = page.clamp(1, self.ctx.num_pages);
        match self.kind {
            FlowKind::PresentationTwoPage => page - (page - 1) % 2,
            _ => page,
        }
    }
}

impl LayoutStrategy for FlowLayout {
    fn mode(&self) -> &str {
        self.kind.mode()
    }

    fn state(&self) -> LayoutState {
        self.state
    }

    fn set_zoom(&mut self, value: ZoomValue) -> Option<ZoomEvent> {
        let current = self.state.zoom.zoom;
        match value {
            ZoomValue::Auto => self.apply_zoom(self.zoom_for_mode(ZoomMode::Auto), Some(ZoomMode::Auto)),
            ZoomValue::FitWidth => {
                self.apply_zoom(self.zoom_for_mode(ZoomMode::FitWidth), Some(ZoomMode::FitWidth))
            }
            ZoomValue::FitHeight => {
                self.apply_zoom(self.zoom_for_mode(ZoomMode::FitHeight), Some(ZoomMode::FitHeight))
            }
            ZoomValue::In => {
                let level = Self::next_level_above(current)?;
                self.apply_zoom(level, None)
            }
            ZoomValue::Out => {
                let level = Self::next_level_below(current)?;
                self.apply_zoom(level, None)
            }
            ZoomValue::Level(level) => self.apply_zoom(level, None),
        }
    }

    fn scroll_to(&mut self, page: u32) -> Option<Message> {
        let page = self.align(page);
        if self.positioned && page == self.state.current_page {
            return None;
        }
        let prev_page = self.state.current_page;
        self.state.current_page = page;
        self.positioned = true;
        Some(Message::PageFocus {
            page,
            prev_page,
            num_pages: self.ctx.num_pages,
        })
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Option<ZoomEvent> {
        self.ctx.viewport = viewport;
        match self.state.zoom.zoom_mode {
            Some(mode) => self.apply_zoom(self.zoom_for_mode(mode), Some(mode)),
            None => {
                self.state.zoom.is_draggable = self.overflows(self.state.zoom.zoom);
                None
            }
        }
    }
}
