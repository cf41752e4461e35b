//! Local JSON file backend: one `<key>.json` file per record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pntp_core::AssessmentRecord;
use tokio::fs;
use tracing::{debug, info};

use crate::{AssessmentStore, SaveReceipt, StoreError, check_key, decode_record, encode_record};

/// File-backed store rooted at a single directory.
///
/// Writes go through a temporary file that is then renamed over the target,
/// so a crash mid-write leaves the previous version intact.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl AssessmentStore for LocalStore {
    async fn save(&self, record: &AssessmentRecord) -> Result<SaveReceipt, StoreError> {
        record.validate()?;
        let key = record.key();
        let body = encode_record(record)?;

        fs::create_dir_all(&self.root)
            .await
            .map_err(io_error(&self.root))?;

        let path = self.path_for(&key);
        let tmp = self.root.join(format!("{key}.json.tmp"));
        fs::write(&tmp, body).await.map_err(io_error(&tmp))?;
        fs::rename(&tmp, &path).await.map_err(io_error(&path))?;

        info!(key = %key, path = %path.display(), "saved assessment");
        Ok(SaveReceipt {
            key,
            location: path.display().to_string(),
        })
    }

    async fn load_key(&self, key: &str) -> Result<Option<AssessmentRecord>, StoreError> {
        check_key(key)?;
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key = %key, path = %path.display(), "no saved assessment");
                return Ok(None);
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let record = decode_record(key, &raw)?;
        debug!(key = %key, "loaded assessment");
        Ok(Some(record))
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error(&self.root))? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
