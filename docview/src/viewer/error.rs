//! Viewer errors.

use crate::layout::LayoutError;
use thiserror::Error;

/// Invalid viewer configuration, reported synchronously by `init`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no URL given for viewer assets")]
    MissingUrl,

    #[error("invalid query parameters: {0}")]
    InvalidQuery(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("viewer has not been initialized")]
    NotInitialized,

    #[error("viewer is already initialized")]
    AlreadyInitialized,

    #[error("viewer has been destroyed")]
    Destroyed,
}
