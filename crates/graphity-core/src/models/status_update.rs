use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A status update ready to be written to the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Identifier of the template the update was built from
    pub content_type: String,
    pub template_version: String,
    pub timestamp: DateTime<Utc>,
    /// JSON object keyed by template slot name
    pub content: serde_json::Value,
    /// Persisted path per file slot
    pub files: BTreeMap<String, PathBuf>,
}
