//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `Default` implementations of
//! the settings structs.

use std::path::PathBuf;

use super::settings::*;
use crate::asset::{AssetSettings, UrlTemplates};
use crate::capability::CapabilitySet;

// =============================================================================
// Asset URL templates
// =============================================================================

pub const DEFAULT_METADATA_TEMPLATE: &str = "info.json";
pub const DEFAULT_STYLESHEET_TEMPLATE: &str = "stylesheet.css";
pub const DEFAULT_SVG_TEMPLATE: &str = "page-{{page}}.svg";
pub const DEFAULT_IMG_TEMPLATE: &str = "page-{{page}}.png";
pub const DEFAULT_TEXT_TEMPLATE: &str = "text-{{page}}.html";

// =============================================================================
// Asset requests and processing
// =============================================================================

/// Retries after the first failed attempt of any asset request.
pub const DEFAULT_ASSET_REQUEST_RETRIES: u32 = 1;

/// Base backoff between retries, doubled per retry.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;

/// Inline images above this count get stripped from page markup.
pub const DEFAULT_MAX_INLINE_IMAGES: usize = 1000;

/// Inline images whose data URL is at most this many bytes are stripped.
pub const DEFAULT_INLINE_IMAGE_SIZE_CUTOFF: usize = 5120;

/// Text layers with more boxes than this are dropped.
pub const DEFAULT_MAX_TEXT_BOXES: usize = 256;

// =============================================================================
// Viewer
// =============================================================================

pub const DEFAULT_LAYOUT: &str = "vertical";
pub const DEFAULT_PAGE_SCALE: f64 = 1.0;

/// Page size assumed when the metadata carries no dimensions (US letter).
pub const DEFAULT_PAGE_WIDTH: f64 = 612.0;
pub const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

/// Pages kept loaded around the focused page.
pub const DEFAULT_PAGE_LOAD_RANGE: u32 = 32;
pub const DEFAULT_MOBILE_PAGE_LOAD_RANGE: u32 = 8;

/// Buffered external events per subscriber before lagging.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// =============================================================================
// Logging
// =============================================================================

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "docview.log";

// =============================================================================
// Paths
// =============================================================================

/// Get the configuration directory (~/.docview).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docview")
}

/// Get the path to the config file (~/.docview/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

// =============================================================================
// Default impls
// =============================================================================

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            url: None,
            id: None,
            templates: UrlTemplates::default(),
            query: None,
            layout: DEFAULT_LAYOUT.to_string(),
            page: None,
            page_start: None,
            zoom: None,
            page_scale: DEFAULT_PAGE_SCALE,
            enable_text_selection: true,
            enable_links: true,
            enable_dragging: false,
            autoload_first_page: true,
            conversion_is_complete: false,
            plugins: Vec::new(),
            assets: AssetSettings::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: DEFAULT_LOG_DIR.to_string(),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            viewer: ViewerConfig::default(),
            host: CapabilitySet::default(),
            logging: LoggingSettings::default(),
        }
    }
}
