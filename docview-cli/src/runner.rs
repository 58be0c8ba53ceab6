//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and viewer creation.

use crate::error::CliError;
use docview::asset::{AssetTransport, FileTransport, ReqwestTransport};
use docview::config::ConfigFile;
use docview::logging::{init_logging, LoggingGuard};
use docview::viewer::Viewer;
use docview::ViewerConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runner that manages the CLI lifecycle.
pub struct CliRunner {
    /// Logging guard - keeps logging active while the runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Loads the config file (or defaults) and initializes logging.
    ///
    /// `log_dir` overrides the configured log directory.
    pub fn new(config_path: Option<&Path>, log_dir: Option<&str>) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let dir = log_dir.unwrap_or(&config.logging.directory);
        let logging_guard = init_logging(dir, &config.logging.file)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, url: &str) {
        info!("docview v{}", docview::VERSION);
        info!(url = url, "Opening document");
    }

    /// Builds a viewer with a transport matching the URL scheme.
    ///
    /// `http://` and `https://` locations use HTTP; anything else is read
    /// from the local filesystem.
    pub fn create_viewer(&self, viewer: ViewerConfig) -> Result<Viewer, CliError> {
        let url = viewer.url.clone().unwrap_or_default();
        let transport: Arc<dyn AssetTransport> = if is_remote(&url) {
            Arc::new(ReqwestTransport::new()?)
        } else {
            Arc::new(FileTransport::new())
        };
        info!(transport = transport.name(), "Transport selected");

        Ok(Viewer::builder(viewer)
            .transport(transport)
            .capabilities(Arc::new(self.config.host))
            .build()?)
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://assets.example.com/doc1"));
        assert!(is_remote("http://localhost:8080/doc"));
        assert!(!is_remote("file:///tmp/doc"));
        assert!(!is_remote("./converted/doc1"));
    }
}
