//! Error types module
//!
//! All failures of the create pipeline are unified under [`AppError`]. Each
//! variant self-describes how it is reported to the caller through the
//! [`ErrorMetadata`] trait, and the [`Disposition`] table decides whether the
//! caller sees an error status or a normal response carrying a remediation
//! description.

use std::io;

use crate::identifiers::IdentifierRole;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like queue pressure
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// How a failure is delivered to the responder.
///
/// This is a reporting policy, not a technical necessity: domain validation
/// failures are delivered as regular content with a remediation description,
/// everything else as an error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// `error(4xx, message)`
    ClientError,
    /// `error(5xx, message)`
    ServerError,
    /// `add_line(message)`, `add_line(remediation)`, `finish()`
    Soft,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// Status code handed to `ClientResponder::error`
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DUPLICATE_IDENTIFIER")
    fn error_code(&self) -> &'static str;

    /// Whether this error is transient (the same request may succeed later)
    fn is_recoverable(&self) -> bool;

    /// Suggested remediation for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the client
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// Which responder call reports this error
    fn disposition(&self) -> Disposition;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Form item identifier \"{0}\" is used more than once")]
    DuplicateIdentifier(String),

    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    #[error("Missing form field: {0}")]
    MissingField(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid {role} identifier: {reason}")]
    InvalidIdentifier {
        role: IdentifierRole,
        reason: String,
    },

    #[error("There is no status update template named \"{0}\"")]
    UnknownTemplateType(String),

    #[error("File \"{slot}\" must have content type {expected} (got {actual})")]
    ContentTypeMismatch {
        slot: String,
        expected: String,
        actual: String,
    },

    #[error("Status update instantiation failed: {0}")]
    InstantiationFailed(String),

    #[error("Persistence failed: {message}")]
    PersistenceFailed {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Command queue is full")]
    QueueFull,

    #[error("Command queue is closed")]
    QueueClosed,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::PersistenceFailed {
            message: format!("IO error: {}", err),
            source: err.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Configuration(format!("JSON parsing error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level, disposition).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
    Disposition,
) {
    match err {
        AppError::DuplicateIdentifier(_) => (
            400,
            "DUPLICATE_IDENTIFIER",
            false,
            Some("Use every form item identifier exactly once"),
            false,
            LogLevel::Debug,
            Disposition::ClientError,
        ),
        AppError::MalformedUpload(_) => (
            500,
            "MALFORMED_UPLOAD",
            false,
            Some("Send create requests as multipart/form-data"),
            false,
            LogLevel::Warn,
            Disposition::ServerError,
        ),
        AppError::MissingField(_) => (
            400,
            "MISSING_FIELD",
            false,
            Some("Check request fields and try again"),
            false,
            LogLevel::Debug,
            Disposition::ClientError,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce the size of the uploaded files"),
            false,
            LogLevel::Debug,
            Disposition::ClientError,
        ),
        AppError::InvalidIdentifier { .. } => (
            400,
            "INVALID_IDENTIFIER",
            false,
            Some("Identifiers must be positive integers referring to existing users"),
            false,
            LogLevel::Debug,
            Disposition::Soft,
        ),
        AppError::UnknownTemplateType(_) => (
            400,
            "UNKNOWN_TEMPLATE_TYPE",
            false,
            Some("Use the name of a registered status update template"),
            false,
            LogLevel::Debug,
            Disposition::Soft,
        ),
        AppError::ContentTypeMismatch { .. } => (
            400,
            "CONTENT_TYPE_MISMATCH",
            false,
            Some("Upload every file with the content type its template slot declares"),
            false,
            LogLevel::Debug,
            Disposition::Soft,
        ),
        AppError::InstantiationFailed(_) => (
            400,
            "INSTANTIATION_FAILED",
            false,
            Some("Provide every field and file the status update template declares"),
            false,
            LogLevel::Debug,
            Disposition::Soft,
        ),
        AppError::PersistenceFailed { .. } => (
            500,
            "PERSISTENCE_FAILED",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
            Disposition::ServerError,
        ),
        AppError::QueueFull => (
            503,
            "QUEUE_FULL",
            true,
            Some("Wait a few seconds and retry"),
            false,
            LogLevel::Warn,
            Disposition::ServerError,
        ),
        AppError::QueueClosed => (
            503,
            "QUEUE_CLOSED",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Error,
            Disposition::ServerError,
        ),
        AppError::Configuration(_) => (
            500,
            "CONFIGURATION_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
            Disposition::ServerError,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
            Disposition::ServerError,
        ),
    }
}

impl AppError {
    /// Get the error type name for logging
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::DuplicateIdentifier(_) => "DuplicateIdentifier",
            AppError::MalformedUpload(_) => "MalformedUpload",
            AppError::MissingField(_) => "MissingField",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::InvalidIdentifier { .. } => "InvalidIdentifier",
            AppError::UnknownTemplateType(_) => "UnknownTemplateType",
            AppError::ContentTypeMismatch { .. } => "ContentTypeMismatch",
            AppError::InstantiationFailed(_) => "InstantiationFailed",
            AppError::PersistenceFailed { .. } => "PersistenceFailed",
            AppError::QueueFull => "QueueFull",
            AppError::QueueClosed => "QueueClosed",
            AppError::Configuration(_) => "Configuration",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Wrap any IO-level failure as a persistence failure.
    pub fn persistence(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        AppError::PersistenceFailed {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn disposition(&self) -> Disposition {
        app_error_static_metadata(self).6
    }

    fn client_message(&self) -> String {
        match self {
            AppError::MalformedUpload(message) => message.clone(),
            AppError::PersistenceFailed { .. } => "file writing failed!".to_string(),
            AppError::Configuration(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            AppError::QueueFull => "the server is busy, please try again later".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_identifier_is_client_error() {
        let err = AppError::DuplicateIdentifier("photo".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "DUPLICATE_IDENTIFIER");
        assert_eq!(err.disposition(), Disposition::ClientError);
        assert!(err.client_message().contains("photo"));
    }

    #[test]
    fn test_domain_failures_are_soft() {
        let errors = [
            AppError::InvalidIdentifier {
                role: IdentifierRole::Target,
                reason: "not a number".to_string(),
            },
            AppError::UnknownTemplateType("unknown-type".to_string()),
            AppError::ContentTypeMismatch {
                slot: "picture".to_string(),
                expected: "image/png".to_string(),
                actual: "image/jpeg".to_string(),
            },
            AppError::InstantiationFailed("field \"message\" is missing".to_string()),
        ];
        for err in errors {
            assert_eq!(err.disposition(), Disposition::Soft, "{}", err);
            assert!(err.suggested_action().is_some());
            assert_eq!(err.log_level(), LogLevel::Debug);
        }
    }

    #[test]
    fn test_persistence_failure_hides_details() {
        let err = AppError::from(io::Error::new(io::ErrorKind::Other, "disk on fire"));
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.disposition(), Disposition::ServerError);
        assert!(err.is_sensitive());
        assert!(!err.client_message().contains("disk on fire"));
        assert!(err.detailed_message().contains("disk on fire"));
    }

    #[test]
    fn test_queue_full_is_transient() {
        let err = AppError::QueueFull;
        assert_eq!(err.http_status_code(), 503);
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_invalid_identifier_names_role() {
        let err = AppError::InvalidIdentifier {
            role: IdentifierRole::Actor,
            reason: "user identifier has to be greater than zero.".to_string(),
        };
        assert!(err.to_string().starts_with("Invalid actor identifier"));
    }
}
