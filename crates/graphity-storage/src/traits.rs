//! File store abstraction
//!
//! A [`FileStore`] moves uploaded bytes from transient storage to the
//! permanent directory configured for their content type, and deletes them
//! again when a request is rolled back.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use graphity_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Persist failed: {0}")]
    PersistFailed(String),

    #[error("Remove failed: {0}")]
    RemoveFailed(String),

    #[error("No storage directory configured for content type {0}")]
    NoDirectory(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        AppError::persistence(message, err)
    }
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Copy the file at `source` into permanent storage for `content_type`
    /// and return its final path. Never overwrites an existing file.
    async fn persist(
        &self,
        source: &Path,
        content_type: &str,
        original_filename: &str,
    ) -> StorageResult<PathBuf>;

    /// Delete a previously persisted file. Removing a missing file succeeds.
    async fn remove(&self, path: &Path) -> StorageResult<()>;
}
