//! Storage layer: the assessment store capability and its local file backend.
//!
//! Every backend addresses records by [`derive_key`], so a record saved
//! through one backend is found under the same key by any other.

mod error;
mod local;

pub use error::StoreError;
pub use local::LocalStore;

use async_trait::async_trait;
use pntp_core::{AssessmentRecord, EntityType, derive_key};

/// Where a save landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub key: String,
    /// File path or URL of the written document.
    pub location: String,
}

/// Persistence capability shared by the local and remote backends.
///
/// Saves are full overwrites. Loads distinguish "absent" (`Ok(None)`) from
/// "present but malformed" ([`StoreError::Corrupt`]); callers decide whether
/// a corrupt record should be treated as absent.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Validate and write the whole record under its derived key.
    async fn save(&self, record: &AssessmentRecord) -> Result<SaveReceipt, StoreError>;

    /// Point read by derived key.
    async fn load_key(&self, key: &str) -> Result<Option<AssessmentRecord>, StoreError>;

    /// Point read by natural key.
    async fn load(
        &self,
        entity_name: &str,
        entity_type: EntityType,
    ) -> Result<Option<AssessmentRecord>, StoreError> {
        self.load_key(&derive_key(entity_name, entity_type)).await
    }

    /// Keys of all saved records, sorted.
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// Serialize a record the way every backend stores it.
pub fn encode_record(record: &AssessmentRecord) -> Result<String, StoreError> {
    serde_json::to_string_pretty(record).map_err(StoreError::Encode)
}

/// Parse a stored document, reporting failures as [`StoreError::Corrupt`].
pub fn decode_record(key: &str, raw: &str) -> Result<AssessmentRecord, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}

/// Reject keys that could escape the storage namespace.
pub fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
