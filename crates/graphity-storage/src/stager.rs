//! Request-scoped staging of uploaded files.
//!
//! [`FileStager::stage`] promotes the uploads a template declares to
//! permanent storage and returns a [`StagedFiles`] guard. Until the guard is
//! committed, every failure path removes what was written: explicitly through
//! [`StagedFiles::rollback`], or from `Drop` if the guard is abandoned.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use graphity_core::models::{FormItemSet, TemplateDefinition};
use graphity_core::AppError;

use crate::traits::FileStore;

#[derive(Clone)]
pub struct FileStager {
    store: Arc<dyn FileStore>,
}

impl FileStager {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Stage every file slot of `template` found in `items`.
    ///
    /// All declared content types are checked before anything is written. A
    /// slot without an upload is skipped; the status update factory reports
    /// it. On failure nothing staged by this call remains on disk.
    #[tracing::instrument(skip_all, fields(template = %template.identifier))]
    pub async fn stage(
        &self,
        template: &TemplateDefinition,
        items: &mut FormItemSet,
    ) -> Result<StagedFiles, AppError> {
        for slot in &template.files {
            if let Some(file) = items.file(&slot.name) {
                if file.content_type() != slot.content_type {
                    return Err(AppError::ContentTypeMismatch {
                        slot: slot.name.clone(),
                        expected: slot.content_type.clone(),
                        actual: file.content_type().to_string(),
                    });
                }
            }
        }

        let mut staged = StagedFiles::new(self.store.clone());

        for slot in &template.files {
            let Some(file) = items.file_mut(&slot.name) else {
                tracing::debug!(slot = %slot.name, "No upload for file slot");
                continue;
            };

            let persisted = self
                .store
                .persist(
                    file.transient_path(),
                    file.content_type(),
                    file.original_filename(),
                )
                .await;

            match persisted {
                Ok(path) => {
                    file.set_persisted_path(path.clone());
                    staged.paths.insert(slot.name.clone(), path);
                }
                Err(e) => {
                    tracing::error!(slot = %slot.name, error = %e, "Failed to stage file");
                    staged.rollback(items).await;
                    return Err(e.into());
                }
            }
        }

        Ok(staged)
    }
}

impl fmt::Debug for FileStager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStager").finish_non_exhaustive()
    }
}

/// Files persisted for one request, keyed by template slot.
#[must_use = "staged files are removed on drop unless committed"]
pub struct StagedFiles {
    store: Arc<dyn FileStore>,
    paths: BTreeMap<String, PathBuf>,
}

impl StagedFiles {
    fn new(store: Arc<dyn FileStore>) -> Self {
        Self {
            store,
            paths: BTreeMap::new(),
        }
    }

    pub fn paths(&self) -> &BTreeMap<String, PathBuf> {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Keep the files. Ownership passes to whoever holds the returned paths.
    pub fn commit(mut self) -> BTreeMap<String, PathBuf> {
        std::mem::take(&mut self.paths)
    }

    /// Delete every staged file and clear the persisted paths in `items`.
    pub async fn rollback(mut self, items: &mut FormItemSet) {
        let paths = std::mem::take(&mut self.paths);
        if paths.is_empty() {
            return;
        }

        tracing::info!(files = paths.len(), "Rolling back staged files");
        for (slot, path) in paths {
            if let Some(file) = items.file_mut(&slot) {
                file.clear_persisted_path();
            }
            if let Err(e) = self.store.remove(&path).await {
                tracing::error!(
                    slot = %slot,
                    path = %path.display(),
                    error = %e,
                    "Failed to remove staged file during rollback"
                );
            }
        }
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        if self.paths.is_empty() {
            return;
        }

        let paths: Vec<PathBuf> = std::mem::take(&mut self.paths).into_values().collect();
        tracing::warn!(
            files = paths.len(),
            "Staged files dropped without commit or rollback, removing"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = self.store.clone();
                handle.spawn(async move {
                    for path in paths {
                        if let Err(e) = store.remove(&path).await {
                            tracing::error!(path = %path.display(), error = %e, "Failed to remove staged file");
                        }
                    }
                });
            }
            Err(_) => {
                for path in paths {
                    if let Err(e) = std::fs::remove_file(&path) {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            tracing::error!(path = %path.display(), error = %e, "Failed to remove staged file");
                        }
                    }
                }
            }
        }
    }
}

impl fmt::Debug for StagedFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedFiles")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}
