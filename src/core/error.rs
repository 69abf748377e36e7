//! Typed error handling for the API boundary
//!
//! Handlers return [`ApiError`], which renders as
//! `{ "success": false, "error": "<message>" }` with the matching HTTP
//! status. Collaborator errors are classified exactly once when they cross
//! into `ApiError`:
//!
//! | Source | Status | Message |
//! |---|---|---|
//! | `StoreError::MalformedId` | 404 | `Resource not found with id of <id>` |
//! | `StoreError::Duplicate` | 400 | `Duplicate field value entered` |
//! | `StoreError::Validation`, `validator` errors | 400 | field messages |
//! | `StoreError::Backend` | 500 | `Server Error` |
//!
//! # Example
//!
//! ```rust,ignore
//! async fn get_bootcamp(id: &str) -> Result<Bootcamp, ApiError> {
//!     service.get(id).await?.ok_or_else(|| ApiError::not_found("Bootcamp", id))
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::store::StoreError;

/// The error type returned by every handler
#[derive(Debug)]
pub enum ApiError {
    /// No record with this identifier
    NotFound { resource: String, id: String },

    /// Lookup by something other than an id came back empty
    Missing { message: String },

    /// Missing or invalid credentials
    Unauthorized { message: String },

    /// Authenticated, but not allowed to do this
    Forbidden { message: String },

    /// Malformed request the engine could not recover from
    BadRequest { message: String },

    /// A unique index rejected the write
    Duplicate,

    /// Schema validation failed
    Validation(Vec<FieldValidationError>),

    /// Store failure that is not the client's fault
    Storage(StoreError),

    /// Internal failure with a message safe to show
    Internal(String),
}

/// A single field validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl FieldValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound { resource, id } => {
                write!(f, "{} not found with id of {}", resource, id)
            }
            ApiError::Missing { message } => write!(f, "{}", message),
            ApiError::Unauthorized { message } => write!(f, "{}", message),
            ApiError::Forbidden { message } => write!(f, "{}", message),
            ApiError::BadRequest { message } => write!(f, "{}", message),
            ApiError::Duplicate => write!(f, "Duplicate field value entered"),
            ApiError::Validation(errors) => {
                let msgs: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
                write!(f, "{}", msgs.join(", "))
            }
            ApiError::Storage(_) => write!(f, "Server Error"),
            ApiError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,

    /// Human-readable error message
    pub error: String,

    /// Individual messages of a validation failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn missing(message: impl Into<String>) -> Self {
        ApiError::Missing {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
        }
    }

    /// A single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldValidationError::new(field, message)])
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } | ApiError::Missing { .. } => StatusCode::NOT_FOUND,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Duplicate => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } | ApiError::Missing { .. } => "NOT_FOUND",
            ApiError::Unauthorized { .. } => "UNAUTHORIZED",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::BadRequest { .. } => "BAD_REQUEST",
            ApiError::Duplicate => "DUPLICATE_VALUE",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        let messages = match self {
            ApiError::Validation(errors) => {
                Some(errors.iter().map(|e| e.message.clone()).collect())
            }
            _ => None,
        };

        ErrorResponse {
            success: false,
            error: self.to_string(),
            messages,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Storage(source) => {
                tracing::error!(code = self.error_code(), error = %source, "store failure");
            }
            ApiError::Internal(msg) => {
                tracing::error!(code = self.error_code(), "{}", msg);
            }
            ApiError::Unauthorized { .. } | ApiError::Forbidden { .. } => {
                tracing::warn!(code = self.error_code(), "{}", self);
            }
            _ => {}
        }
        (status, Json(self.to_response())).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MalformedId { value } => ApiError::not_found("Resource", value),
            StoreError::Duplicate { .. } => ApiError::Duplicate,
            StoreError::Validation(errors) => ApiError::Validation(errors),
            other @ StoreError::Backend { .. } => ApiError::Storage(other),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field));
                    FieldValidationError::new(field.to_string(), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::Validation(fields)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_request(format!("Invalid request body: {}", err))
    }
}
