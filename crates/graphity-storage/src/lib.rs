//! Graphity Storage Library
//!
//! Moves uploaded files to permanent, content-type specific directories and
//! guarantees that files staged for a request that later fails are removed.
//!
//! # Staged file names
//!
//! Files are stored as `{millis}-{uuid}-{filename}` where `filename` is the
//! sanitized client filename. Names are opened with `create_new`, so an
//! existing file is never overwritten.

pub(crate) mod keys;
pub mod local;
pub mod stager;
pub mod traits;

// Re-export commonly used types
pub use keys::sanitize_filename;
pub use local::LocalFileStore;
pub use stager::{FileStager, StagedFiles};
pub use traits::{FileStore, StorageError, StorageResult};
