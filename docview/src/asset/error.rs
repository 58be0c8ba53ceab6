//! Asset pipeline errors.

use super::types::AssetKey;
use thiserror::Error;

/// Failure of a single transport attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// HTTP status when the server answered.
    pub status: Option<u16>,
    retryable: bool,
}

impl TransportError {
    /// Connection, timeout or body read failure. Always retryable.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            retryable: true,
        }
    }

    /// Non-success HTTP status.
    ///
    /// 5xx, 408 and 429 are retryable; every other status fails at once.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        let retryable = status >= 500 || status == 408 || status == 429;
        Self {
            message: message.into(),
            status: Some(status),
            retryable,
        }
    }

    /// Permanent failure that retrying cannot fix (bad URL, missing file).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            retryable: false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Terminal failure of an asset handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// The asset could not be fetched within the retry bound.
    #[error("failed to fetch {key} from {url} after {attempts} attempt(s): {message}")]
    Transport {
        key: AssetKey,
        url: String,
        message: String,
        status: Option<u16>,
        attempts: u32,
    },

    /// The payload arrived but could not be processed.
    #[error("failed to process {key}: {message}")]
    Processing { key: AssetKey, message: String },
}

impl AssetError {
    pub fn processing(key: AssetKey, message: impl Into<String>) -> Self {
        AssetError::Processing {
            key,
            message: message.into(),
        }
    }

    pub fn key(&self) -> AssetKey {
        match self {
            AssetError::Transport { key, .. } | AssetError::Processing { key, .. } => *key,
        }
    }
}
