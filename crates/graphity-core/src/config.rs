//! Process configuration, read once from the environment at startup.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8080;
const MAX_UPLOAD_SIZE_MB: usize = 10;
const COMMAND_QUEUE_CAPACITY: usize = 1024;
const COMMAND_WORKERS: usize = 4;
const COMMAND_MAX_RETRIES: u32 = 3;
const RESPONSE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    /// Directory multipart file parts are streamed into before staging.
    pub upload_temp_dir: PathBuf,
    /// Content type to permanent storage directory.
    pub storage_dirs: HashMap<String, PathBuf>,
    /// Directory for content types missing from `storage_dirs`.
    pub default_storage_dir: Option<PathBuf>,
    pub templates_path: Option<PathBuf>,
    pub max_upload_size_bytes: usize,
    /// Queue bound; `None` means unbounded.
    pub command_queue_capacity: Option<usize>,
    pub command_workers: usize,
    pub command_max_retries: u32,
    pub response_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_dirs = match env::var("STORAGE_DIRS") {
            Ok(raw) => parse_storage_dirs(&raw)?,
            Err(_) => HashMap::new(),
        };

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let command_queue_capacity = env::var("COMMAND_QUEUE_CAPACITY")
            .unwrap_or_else(|_| COMMAND_QUEUE_CAPACITY.to_string())
            .parse::<usize>()
            .unwrap_or(COMMAND_QUEUE_CAPACITY);

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            upload_temp_dir: env::var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            storage_dirs,
            default_storage_dir: env::var("DEFAULT_STORAGE_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            templates_path: env::var("TEMPLATES_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            command_queue_capacity: (command_queue_capacity > 0).then_some(command_queue_capacity),
            command_workers: env::var("COMMAND_WORKERS")
                .unwrap_or_else(|_| COMMAND_WORKERS.to_string())
                .parse()
                .unwrap_or(COMMAND_WORKERS),
            command_max_retries: env::var("COMMAND_MAX_RETRIES")
                .unwrap_or_else(|_| COMMAND_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(COMMAND_MAX_RETRIES),
            response_timeout_secs: env::var("RESPONSE_TIMEOUT_SECS")
                .unwrap_or_else(|_| RESPONSE_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(RESPONSE_TIMEOUT_SECS),
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_dirs.is_empty() && self.default_storage_dir.is_none() {
            return Err(anyhow::anyhow!(
                "No storage directory configured. Set STORAGE_DIRS and/or DEFAULT_STORAGE_DIR"
            ));
        }
        if self.command_workers == 0 {
            return Err(anyhow::anyhow!("COMMAND_WORKERS must be at least 1"));
        }
        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be at least 1"));
        }
        Ok(())
    }
}

/// Parse a `content/type=/dir,other/type=/dir2` routing table.
///
/// Content types are matched case-insensitively, so keys are lowercased.
pub fn parse_storage_dirs(raw: &str) -> Result<HashMap<String, PathBuf>, anyhow::Error> {
    let mut dirs = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (content_type, dir) = entry.split_once('=').ok_or_else(|| {
            anyhow::anyhow!(
                "STORAGE_DIRS entry \"{}\" must look like content/type=/path",
                entry
            )
        })?;
        let content_type = content_type.trim().to_lowercase();
        let dir = dir.trim();
        if content_type.is_empty() || !content_type.contains('/') || dir.is_empty() {
            return Err(anyhow::anyhow!(
                "STORAGE_DIRS entry \"{}\" must look like content/type=/path",
                entry
            ));
        }
        if dirs.insert(content_type.clone(), PathBuf::from(dir)).is_some() {
            return Err(anyhow::anyhow!(
                "STORAGE_DIRS routes {} more than once",
                content_type
            ));
        }
    }
    Ok(dirs)
}
