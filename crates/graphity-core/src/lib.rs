//! Graphity Core Library
//!
//! Domain models, the error taxonomy, configuration, identifier validation
//! and the status update template machinery shared by every Graphity crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod execution_error;
pub mod factory;
pub mod identifiers;
pub mod models;
pub mod responder;
pub mod templates;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Disposition, ErrorMetadata, LogLevel};
pub use execution_error::{ExecutionError, ExecutionResultExt};
pub use factory::StatusUpdateFactory;
pub use identifiers::{
    AnyPositiveIdentifier, EntityId, IdentifierPredicate, IdentifierRole, IdentifierValidator,
};
pub use responder::{report_error, ClientResponder};
pub use templates::{TemplateRegistry, PLAIN_TEMPLATE};
