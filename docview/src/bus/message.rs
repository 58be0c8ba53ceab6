//! Message catalogue.

use crate::asset::{AssetError, AssetKey};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name of a message in the catalogue, used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    AssetError,
    Destroy,
    DragEnd,
    DragStart,
    Fail,
    LayoutChange,
    LinkClick,
    PageFail,
    PageFocus,
    PageLoad,
    PageUnload,
    Ready,
    Resize,
    ScrollStart,
    ScrollEnd,
    Zoom,
}

impl MessageKind {
    /// The whole catalogue.
    pub const ALL: [MessageKind; 16] = [
        MessageKind::AssetError,
        MessageKind::Destroy,
        MessageKind::DragEnd,
        MessageKind::DragStart,
        MessageKind::Fail,
        MessageKind::LayoutChange,
        MessageKind::LinkClick,
        MessageKind::PageFail,
        MessageKind::PageFocus,
        MessageKind::PageLoad,
        MessageKind::PageUnload,
        MessageKind::Ready,
        MessageKind::Resize,
        MessageKind::ScrollStart,
        MessageKind::ScrollEnd,
        MessageKind::Zoom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::AssetError => "asseterror",
            MessageKind::Destroy => "destroy",
            MessageKind::DragEnd => "dragend",
            MessageKind::DragStart => "dragstart",
            MessageKind::Fail => "fail",
            MessageKind::LayoutChange => "layoutchange",
            MessageKind::LinkClick => "linkclick",
            MessageKind::PageFail => "pagefail",
            MessageKind::PageFocus => "pagefocus",
            MessageKind::PageLoad => "pageload",
            MessageKind::PageUnload => "pageunload",
            MessageKind::Ready => "ready",
            MessageKind::Resize => "resize",
            MessageKind::ScrollStart => "scrollstart",
            MessageKind::ScrollEnd => "scrollend",
            MessageKind::Zoom => "zoom",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown message '{}'", s))
    }
}

/// Why a session ended in the failed state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionFailure {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("initial layout could not be applied: {0}")]
    Layout(String),

    /// A required document request was aborted outside of `destroy`.
    #[error("document request {0} was cancelled")]
    Cancelled(AssetKey),
}

/// Destination of a clicked link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// External URI, opened by the host.
    Uri(String),
    /// Page inside the document.
    Page(u32),
}

/// Zoom state reported after a zoom change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomEvent {
    pub zoom: f64,
    pub prev_zoom: f64,
    /// Content overflows the viewport and can be dragged.
    pub is_draggable: bool,
    pub can_zoom_in: bool,
    pub can_zoom_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollPosition {
    pub scroll_top: f64,
    pub scroll_left: f64,
}

/// A message delivered over the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Ready { page: u32, num_pages: u32 },
    Fail(SessionFailure),
    /// Non-fatal asset failure.
    AssetError(AssetError),
    LayoutChange {
        previous_layout: Option<String>,
        layout: String,
    },
    LinkClick(LinkTarget),
    Zoom(ZoomEvent),
    DragStart,
    DragEnd,
    Resize { width: f64, height: f64 },
    ScrollStart(ScrollPosition),
    ScrollEnd(ScrollPosition),
    PageLoad { page: u32 },
    PageUnload { page: u32 },
    PageFocus {
        page: u32,
        prev_page: u32,
        num_pages: u32,
    },
    PageFail { page: u32, error: AssetError },
    Destroy,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Ready { .. } => MessageKind::Ready,
            Message::Fail(_) => MessageKind::Fail,
            Message::AssetError(_) => MessageKind::AssetError,
            Message::LayoutChange { .. } => MessageKind::LayoutChange,
            Message::LinkClick(_) => MessageKind::LinkClick,
            Message::Zoom(_) => MessageKind::Zoom,
            Message::DragStart => MessageKind::DragStart,
            Message::DragEnd => MessageKind::DragEnd,
            Message::Resize { .. } => MessageKind::Resize,
            Message::ScrollStart(_) => MessageKind::ScrollStart,
            Message::ScrollEnd(_) => MessageKind::ScrollEnd,
            Message::PageLoad { .. } => MessageKind::PageLoad,
            Message::PageUnload { .. } => MessageKind::PageUnload,
            Message::PageFocus { .. } => MessageKind::PageFocus,
            Message::PageFail { .. } => MessageKind::PageFail,
            Message::Destroy => MessageKind::Destroy,
        }
    }
}
