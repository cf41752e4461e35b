//! Sync layer: the remote key-value backend for assessment records.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{RECORDS_ROOT, RemoteStore, SyncError};
