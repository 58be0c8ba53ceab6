//! Viewer configuration.
//!
//! [`ViewerConfig`] is what a host hands to `Viewer::builder`. It can be
//! built in code or loaded from an INI file with [`ConfigFile::load_from`]:
//!
//! ```ini
//! [viewer]
//! url = https://assets.example.com/doc1
//! layout = vertical
//! zoom = auto
//!
//! [query]
//! token = abc123
//!
//! [features]
//! enable_dragging = true
//!
//! [plugin.analytics]
//! endpoint = https://stats.example.com
//! ```

mod defaults;
mod file;
mod parser;
mod settings;

pub use defaults::*;
pub use file::ConfigFileError;
pub use settings::{ConfigFile, LoggingSettings, ViewerConfig};
