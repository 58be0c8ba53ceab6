//! Settings structs for the viewer and the config file.

use crate::asset::{AssetSettings, QueryParams, UrlTemplates};
use crate::capability::CapabilitySet;
use crate::layout::ZoomValue;

/// User-supplied viewer configuration.
///
/// Validated and normalized into a `SessionConfig` by `Viewer::init`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Base URL of the document's asset store. Required.
    pub url: Option<String>,
    /// Session id used to namespace fonts; generated when unset.
    pub id: Option<String>,
    pub templates: UrlTemplates,
    /// Query parameters appended to every asset request.
    pub query: Option<QueryParams>,
    /// Initial layout mode.
    pub layout: String,
    /// Initial page, 1-based.
    pub page: Option<u32>,
    /// First page of a page range view; the first page is only prefetched
    /// when this is unset or 1.
    pub page_start: Option<u32>,
    pub zoom: Option<ZoomValue>,
    /// Factor applied to zoom levels reported to external listeners.
    pub page_scale: f64,
    pub enable_text_selection: bool,
    pub enable_links: bool,
    pub enable_dragging: bool,
    /// Prefetch page 1 together with metadata and stylesheet.
    pub autoload_first_page: bool,
    /// Raster fallbacks exist for every page.
    pub conversion_is_complete: bool,
    /// Plugins in initialization order, with their config slices.
    pub plugins: Vec<(String, serde_json::Value)>,
    pub assets: AssetSettings,
    /// Capacity of the external event channel.
    pub event_capacity: usize,
}

impl ViewerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_zoom(mut self, zoom: ZoomValue) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_plugin(mut self, name: impl Into<String>, config: serde_json::Value) -> Self {
        self.plugins.push((name.into(), config));
        self
    }

    pub fn with_assets(mut self, assets: AssetSettings) -> Self {
        self.assets = assets;
        self
    }
}

/// Log output location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: String,
    pub file: String,
}

/// Everything read from `config.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub viewer: ViewerConfig,
    /// Host description used when no capability provider is injected.
    pub host: CapabilitySet,
    pub logging: LoggingSettings,
}
