//! Layout strategy contract and shared state types.

use crate::bus::{Message, ZoomEvent};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Zoom modes that are recomputed when the viewport changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomMode {
    Auto,
    FitWidth,
    FitHeight,
}

/// A zoom request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomValue {
    Auto,
    FitWidth,
    FitHeight,
    /// Next preset level above the current zoom.
    In,
    /// Next preset level below the current zoom.
    Out,
    Level(f64),
}

impl From<ZoomMode> for ZoomValue {
    fn from(mode: ZoomMode) -> Self {
        match mode {
            ZoomMode::Auto => ZoomValue::Auto,
            ZoomMode::FitWidth => ZoomValue::FitWidth,
            ZoomMode::FitHeight => ZoomValue::FitHeight,
        }
    }
}

impl FromStr for ZoomValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ZoomValue::Auto),
            "fitwidth" => Ok(ZoomValue::FitWidth),
            "fitheight" => Ok(ZoomValue::FitHeight),
            "in" => Ok(ZoomValue::In),
            "out" => Ok(ZoomValue::Out),
            other => match other.parse::<f64>() {
                Ok(level) if level > 0.0 && level.is_finite() => Ok(ZoomValue::Level(level)),
                _ => Err("must be auto, fitwidth, fitheight, in, out or a positive number".into()),
            },
        }
    }
}

impl fmt::Display for ZoomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoomValue::Auto => f.write_str("auto"),
            ZoomValue::FitWidth => f.write_str("fitwidth"),
            ZoomValue::FitHeight => f.write_str("fitheight"),
            ZoomValue::In => f.write_str("in"),
            ZoomValue::Out => f.write_str("out"),
            ZoomValue::Level(level) => write!(f, "{}", level),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    pub zoom: f64,
    pub prev_zoom: f64,
    /// Set while the zoom tracks the viewport.
    pub zoom_mode: Option<ZoomMode>,
    pub is_draggable: bool,
}

impl ZoomState {
    /// The request that reproduces this state in another layout.
    pub fn as_request(&self) -> ZoomValue {
        match self.zoom_mode {
            Some(mode) => mode.into(),
            None => ZoomValue::Level(self.zoom),
        }
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            prev_zoom: 1.0,
            zoom_mode: None,
            is_draggable: false,
        }
    }
}

/// Navigation state held by the active layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutState {
    pub current_page: u32,
    pub zoom: ZoomState,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            current_page: 1,
            zoom: ZoomState::default(),
        }
    }
}

/// Visible area of the render surface, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Everything a layout needs to know about the document and surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutContext {
    pub num_pages: u32,
    pub page_width: f64,
    pub page_height: f64,
    pub viewport: Viewport,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Invalid layout: {0}")]
    UnknownMode(String),

    #[error("layout '{mode}' could not be constructed: {reason}")]
    Construction { mode: String, reason: String },
}

/// A navigation strategy.
///
/// Strategies are pure state machines: they never touch the bus. Operations
/// that change observable state return the message to broadcast, and the
/// hosting component broadcasts it after releasing its lock.
pub trait LayoutStrategy: Send {
    fn mode(&self) -> &str;

    fn state(&self) -> LayoutState;

    /// Applies a zoom request. Returns the zoom event if the zoom changed.
    fn set_zoom(&mut self, value: ZoomValue) -> Option<ZoomEvent>;

    /// Focuses `page`. Returns a `pagefocus` message if focus changed.
    fn scroll_to(&mut self, page: u32) -> Option<Message>;

    /// Records a new viewport, re-fitting tracked zoom modes.
    fn set_viewport(&mut self, viewport: Viewport) -> Option<ZoomEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_value_parsing() {
        assert_eq!("auto".parse::<ZoomValue>().unwrap(), ZoomValue::Auto);
        assert_eq!("FitWidth".parse::<ZoomValue>().unwrap(), ZoomValue::FitWidth);
        assert_eq!("1.5".parse::<ZoomValue>().unwrap(), ZoomValue::Level(1.5));
        assert!("0".parse::<ZoomValue>().is_err());
        assert!("huge".parse::<ZoomValue>().is_err());
    }

    #[test]
    fn test_zoom_state_request_prefers_mode() {
        let tracked = ZoomState {
            zoom: 0.8,
            zoom_mode: Some(ZoomMode::FitWidth),
            ..ZoomState::default()
        };
        assert_eq!(tracked.as_request(), ZoomValue::FitWidth);

        let fixed = ZoomState {
            zoom: 2.0,
            ..ZoomState::default()
        };
        assert_eq!(fixed.as_request(), ZoomValue::Level(2.0));
    }
}
