//! Error taxonomy shared across the crate
//!
//! Every component raises typed errors carrying a stable machine-readable
//! code. The API boundary (`crate::api`) converts them into the uniform
//! response envelope; nothing in the crate reports failures by silently
//! returning defaults, with the single documented exception of settings
//! self-healing in [`crate::workspace::SettingsStore`].

use serde_json::Value;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Typed error raised by the orchestration layer and its components
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input: empty workspace name, out-of-range page size,
    /// a settings patch that fails validation
    #[error("{message}")]
    Validation {
        message: String,
        /// Field-level details for validation failures
        details: Option<Value>,
    },

    /// Duplicate workspace name or id
    #[error("{0}")]
    Conflict(String),

    /// Unknown workspace id, or a database handle that was never opened
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Filesystem or SQLite engine failure
    #[error("{0}")]
    Storage(String),

    /// Malformed or empty column specification
    #[error("{0}")]
    Schema(String),
}

impl Error {
    /// Create a validation error without field details
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Create a validation error carrying field-level details
    pub fn validation_with_details(message: impl Into<String>, details: Value) -> Self {
        Error::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict(message.into())
    }

    /// Create a not-found error for a resource/id pair
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema(message.into())
    }

    /// Stable machine-readable code for the API envelope
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "VALIDATION_ERROR",
            Error::Conflict(_) => "CONFLICT",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Storage(_) => "STORAGE_ERROR",
            Error::Schema(_) => "SCHEMA_ERROR",
        }
    }

    /// HTTP-style status carried by the API envelope
    pub fn status(&self) -> u16 {
        match self {
            Error::Validation { .. } => 400,
            Error::Conflict(_) => 409,
            Error::NotFound { .. } => 404,
            Error::Storage(_) => 500,
            Error::Schema(_) => 400,
        }
    }

    /// Field-level details, present on some validation errors
    pub fn details(&self) -> Option<&Value> {
        match self {
            Error::Validation { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::validation("bad").code(), "VALIDATION_ERROR");
        assert_eq!(Error::conflict("dup").code(), "CONFLICT");
        assert_eq!(Error::not_found("workspace", "abc").code(), "NOT_FOUND");
        assert_eq!(Error::storage("io").code(), "STORAGE_ERROR");
        assert_eq!(Error::schema("empty").code(), "SCHEMA_ERROR");
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(Error::validation("bad").status(), 400);
        assert_eq!(Error::conflict("dup").status(), 409);
        assert_eq!(Error::not_found("workspace", "abc").status(), 404);
        assert_eq!(Error::storage("io").status(), 500);
        assert_eq!(Error::schema("empty").status(), 400);
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("workspace", "42");
        assert_eq!(err.to_string(), "workspace not found: 42");
    }

    #[test]
    fn test_validation_details() {
        let err = Error::validation_with_details(
            "Settings validation failed",
            json!([{"field": "table.pageSize", "message": "must be between 1 and 100"}]),
        );
        assert!(err.details().is_some());
        assert!(Error::validation("plain").details().is_none());
        assert!(Error::conflict("dup").details().is_none());
    }
}
