//! Validated per-session configuration and session state.

use super::error::ConfigError;
use crate::asset::{AssetLocator, AssetSettings, QueryParams, UrlTemplates};
use crate::config::ViewerConfig;
use crate::layout::ZoomValue;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Immutable configuration of one viewer session.
///
/// Built from a [`ViewerConfig`] by `Viewer::init` and shared read-only
/// through the session scope.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Session id; also the font namespace suffix.
    pub id: String,
    /// Base URL, always ending with `/`.
    pub base_url: String,
    /// Serialized query string, `?...` or empty.
    pub query_string: String,
    pub templates: UrlTemplates,
    pub layout: String,
    pub page: Option<u32>,
    pub page_start: Option<u32>,
    pub zoom: Option<ZoomValue>,
    pub page_scale: f64,
    pub enable_text_selection: bool,
    pub enable_links: bool,
    pub enable_dragging: bool,
    pub autoload_first_page: bool,
    pub conversion_is_complete: bool,
    pub plugins: Vec<(String, serde_json::Value)>,
    pub assets: AssetSettings,
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Validates `config` and normalizes its URL and query parameters.
    pub fn from_config(config: &ViewerConfig) -> Result<Self, ConfigError> {
        let url = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingUrl)?;

        let query_string = match &config.query {
            Some(query) => {
                validate_query(query)?;
                query.to_query_string()
            }
            None => String::new(),
        };

        let id = match &config.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => format!("docview-{}", NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
        };

        Ok(Self {
            id,
            base_url: crate::asset::normalize_base_url(url),
            query_string,
            templates: config.templates.clone(),
            layout: config.layout.clone(),
            page: config.page,
            page_start: config.page_start,
            zoom: config.zoom,
            page_scale: config.page_scale,
            enable_text_selection: config.enable_text_selection,
            enable_links: config.enable_links,
            enable_dragging: config.enable_dragging,
            autoload_first_page: config.autoload_first_page,
            conversion_is_complete: config.conversion_is_complete,
            plugins: config.plugins.clone(),
            assets: config.assets.clone(),
            event_capacity: config.event_capacity.max(1),
        })
    }

    pub fn locator(&self) -> AssetLocator {
        AssetLocator::new(&self.base_url, &self.query_string, self.templates.clone())
    }

    /// Whether page 1 is fetched together with the document assets.
    pub fn prefetches_first_page(&self) -> bool {
        self.autoload_first_page && matches!(self.page_start, None | Some(1))
    }
}

fn validate_query(query: &QueryParams) -> Result<(), ConfigError> {
    match query {
        QueryParams::Raw(raw) if raw.contains('#') => Err(ConfigError::InvalidQuery(
            "query string must not contain a fragment".into(),
        )),
        QueryParams::Raw(raw) if raw.chars().any(char::is_whitespace) => Err(
            ConfigError::InvalidQuery("query string must not contain whitespace".into()),
        ),
        QueryParams::Pairs(pairs) if pairs.iter().any(|(k, _)| k.is_empty()) => Err(
            ConfigError::InvalidQuery("query parameter names must not be empty".into()),
        ),
        _ => Ok(()),
    }
}

/// Lifecycle state of a viewer session.
///
/// ```text
///   Uninitialized ─init─► Initializing ─load_assets─► LoadingAssets ─┬─► Ready
///                                                                    └─► Failed
///   (any) ─destroy─► Destroyed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    LoadingAssets,
    Ready,
    Failed,
    Destroyed,
}

impl SessionState {
    /// No further startup transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Ready | SessionState::Failed | SessionState::Destroyed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initializing => "initializing",
            SessionState::LoadingAssets => "loading-assets",
            SessionState::Ready => "ready",
            SessionState::Failed => "failed",
            SessionState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}
