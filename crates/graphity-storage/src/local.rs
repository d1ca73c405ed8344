use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use graphity_core::Config;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::keys::staged_file_name;
use crate::traits::{FileStore, StorageError, StorageResult};

/// Attempts at drawing a fresh name when the chosen one already exists.
const MAX_NAME_ATTEMPTS: usize = 3;

/// Local filesystem store routing each content type to its own directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    dirs: HashMap<String, PathBuf>,
    default_dir: Option<PathBuf>,
}

impl LocalFileStore {
    /// Create a store, creating every configured directory.
    ///
    /// # Arguments
    /// * `dirs` - content type to directory, e.g. `image/png -> /var/lib/graphity/pictures`
    /// * `default_dir` - directory for content types missing from `dirs`
    pub async fn new(
        dirs: HashMap<String, PathBuf>,
        default_dir: Option<PathBuf>,
    ) -> StorageResult<Self> {
        if dirs.is_empty() && default_dir.is_none() {
            return Err(StorageError::ConfigError(
                "at least one storage directory is required".to_string(),
            ));
        }

        let dirs: HashMap<String, PathBuf> = dirs
            .into_iter()
            .map(|(content_type, dir)| (content_type.to_lowercase(), dir))
            .collect();

        for dir in dirs.values().chain(default_dir.iter()) {
            fs::create_dir_all(dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(Self { dirs, default_dir })
    }

    pub async fn from_config(config: &Config) -> StorageResult<Self> {
        Self::new(
            config.storage_dirs.clone(),
            config.default_storage_dir.clone(),
        )
        .await
    }

    /// Directory files of `content_type` are stored in.
    pub fn dir_for(&self, content_type: &str) -> StorageResult<&Path> {
        self.dirs
            .get(&content_type.to_lowercase())
            .or(self.default_dir.as_ref())
            .map(PathBuf::as_path)
            .ok_or_else(|| StorageError::NoDirectory(content_type.to_string()))
    }

    /// Open a new file in `dir` under a fresh staged name.
    async fn create_unique(
        dir: &Path,
        original_filename: &str,
    ) -> StorageResult<(PathBuf, fs::File)> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = dir.join(staged_file_name(original_filename));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::warn!(path = %path.display(), "Staged file name collision, retrying");
                }
                Err(e) => {
                    return Err(StorageError::PersistFailed(format!(
                        "Failed to create file {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        Err(StorageError::PersistFailed(format!(
            "Could not find a free file name in {}",
            dir.display()
        )))
    }

    async fn copy_into(source: &Path, target: &mut fs::File) -> std::io::Result<u64> {
        let mut reader = fs::File::open(source).await?;
        let written = tokio::io::copy(&mut reader, target).await?;
        target.flush().await?;
        target.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn persist(
        &self,
        source: &Path,
        content_type: &str,
        original_filename: &str,
    ) -> StorageResult<PathBuf> {
        let dir = self.dir_for(content_type)?;
        let start = std::time::Instant::now();

        let (path, mut file) = Self::create_unique(dir, original_filename).await?;

        let size = match Self::copy_into(source, &mut file).await {
            Ok(size) => size,
            Err(e) => {
                drop(file);
                if let Err(remove_err) = fs::remove_file(&path).await {
                    tracing::warn!(
                        path = %path.display(),
                        error = %remove_err,
                        "Failed to remove partially written file"
                    );
                }
                return Err(StorageError::PersistFailed(format!(
                    "Failed to write file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        tracing::info!(
            path = %path.display(),
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage persist successful"
        );

        Ok(path)
    }

    async fn remove(&self, path: &Path) -> StorageResult<()> {
        let start = std::time::Instant::now();

        match fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StorageError::RemoveFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage remove successful"
        );

        Ok(())
    }
}
