//! Staged file naming.
//!
//! Name format: `{millis}-{uuid}-{sanitized original filename}`. The random
//! component keeps concurrent uploads of the same file in the same
//! millisecond apart.

use chrono::Utc;
use uuid::Uuid;

const MAX_FILENAME_LENGTH: usize = 200;

/// Generate a fresh staged file name for `original_filename`.
pub fn staged_file_name(original_filename: &str) -> String {
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        sanitize_filename(original_filename)
    )
}

/// Reduce a client supplied filename to a safe single path component.
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]` is
/// replaced. Names that still look like traversal, or end up too short to be
/// meaningful, become `file`.
pub fn sanitize_filename(filename: &str) -> String {
    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    if filename_only.contains("..") {
        return "file".to_string();
    }

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(|c| c == '.' || c == '_').is_empty() || sanitized.len() < 3 {
        return "file".to_string();
    }

    sanitized
}
