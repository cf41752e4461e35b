use std::path::PathBuf;

use pntp_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid record: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid storage key {0:?}")]
    InvalidKey(String),

    #[error("stored record {key} is malformed: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("remote store error: {0}")]
    Remote(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Whether the stored data exists but could not be understood.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}
