//! Application state shared by every handler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use graphity_core::Config;

use crate::services::CreatePipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: CreatePipeline,
    pub upload: UploadConfig,
}

/// Limits applied while decoding create requests.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub temp_dir: PathBuf,
    pub max_size_bytes: usize,
    /// How long a handler waits for the responder's terminal call.
    pub response_timeout: Duration,
}

impl UploadConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temp_dir: config.upload_temp_dir.clone(),
            max_size_bytes: config.max_upload_size_bytes,
            response_timeout: Duration::from_secs(config.response_timeout_secs),
        }
    }
}
