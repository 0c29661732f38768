//! Response envelope for the dispatch boundary
//!
//! The GUI transport validates inbound parameters and forwards calls to
//! [`crate::workspace::WorkspaceService`]; results and errors travel
//! back in a uniform envelope: `{ data }` on success, `{ error: { type,
//! message, code, details? } }` on failure. Only the envelope shape
//! lives here; the transport itself is out of scope.

use serde::Serialize;
use serde_json::Value;

use crate::errors::{Error, Result};

/// Error payload of the envelope
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Stable machine-readable error kind
    #[serde(rename = "type")]
    pub kind: String,

    /// Human-readable message
    pub message: String,

    /// HTTP-style status code
    pub code: u16,

    /// Field-level details, present on some validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&Error> for ApiError {
    fn from(error: &Error) -> Self {
        ApiError {
            kind: error.code().to_string(),
            message: error.to_string(),
            code: error.status(),
            details: error.details().cloned(),
        }
    }
}

/// Uniform response envelope
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Data { data: Value },
    Error { error: ApiError },
}

impl ApiResponse {
    /// Wrap a successful result
    pub fn data(value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(data) => ApiResponse::Data { data },
            Err(e) => ApiResponse::Error {
                error: ApiError::from(&Error::storage(format!(
                    "Failed to serialize response: {}",
                    e
                ))),
            },
        }
    }

    /// Wrap a typed error
    pub fn error(error: &Error) -> Self {
        ApiResponse::Error {
            error: error.into(),
        }
    }

    /// Wrap either arm of an orchestrator result
    pub fn from_result<T: Serialize>(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::data(value),
            Err(e) => Self::error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_envelope_shape() {
        let response = ApiResponse::data(json!({"id": 1}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"data": {"id": 1}}));
    }

    #[test]
    fn test_error_envelope_shape() {
        let response = ApiResponse::error(&Error::not_found("workspace", "42"));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["error"]["type"], "NOT_FOUND");
        assert_eq!(value["error"]["code"], 404);
        assert_eq!(value["error"]["message"], "workspace not found: 42");
        assert!(value["error"].get("details").is_none());
    }

    #[test]
    fn test_error_envelope_carries_details() {
        let error = Error::validation_with_details(
            "Settings validation failed",
            json!([{"field": "table.pageSize"}]),
        );
        let value = serde_json::to_value(ApiResponse::error(&error)).unwrap();

        assert_eq!(value["error"]["type"], "VALIDATION_ERROR");
        assert_eq!(value["error"]["details"][0]["field"], "table.pageSize");
    }

    #[test]
    fn test_from_result() {
        let ok: crate::errors::Result<u32> = Ok(7);
        assert_eq!(
            serde_json::to_value(ApiResponse::from_result(ok)).unwrap(),
            json!({"data": 7})
        );

        let err: crate::errors::Result<u32> = Err(Error::conflict("duplicate"));
        let value = serde_json::to_value(ApiResponse::from_result(err)).unwrap();
        assert_eq!(value["error"]["type"], "CONFLICT");
        assert_eq!(value["error"]["code"], 409);
    }
}
