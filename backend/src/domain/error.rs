//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to response
//! envelopes, CLI exit messages, or any other protocol-specific shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::trace_id::TraceId;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// Authentication failed, is missing, or lacks privilege.
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// The request collides with existing state (duplicates, live relations).
    Conflict,
    /// The update would not change anything.
    NotModified,
    /// A downstream dependency is unavailable.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

impl ErrorCode {
    /// Status an HTTP boundary reports for this code.
    ///
    /// # Examples
    /// ```
    /// use research_backend::domain::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::Conflict.http_status(), 409);
    /// ```
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::NotModified => 304,
            Self::ServiceUnavailable => 503,
            Self::InternalError => 500,
        }
    }

    const fn default_message(self) -> &'static str {
        match self {
            Self::InvalidRequest => "Invalid request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not found",
            Self::Conflict => "Conflict",
            Self::NotModified => "Not modified",
            Self::ServiceUnavailable => "Service unavailable",
            Self::InternalError => "Internal server error",
        }
    }
}

/// Error payload shared by every service and adapter.
///
/// ## Invariants
/// - `message` is non-empty once trimmed of whitespace.
/// - `trace_id`, when present, is non-empty.
///
/// Structured details follow two conventions: a field → message map under
/// `errors`, and a machine-readable sub-code under `code`.
///
/// # Examples
/// ```
/// use research_backend::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("User not found");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// assert_eq!(err.message(), "User not found");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    code: ErrorCode,
    message: String,
    trace_id: Option<String>,
    details: Option<Value>,
}

/// Validation errors emitted by the fallible constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValidationError {
    /// The message was blank.
    #[error("error message must not be empty")]
    EmptyMessage,
    /// The trace identifier was blank.
    #[error("trace identifier must not be empty")]
    EmptyTraceId,
}

impl Error {
    /// Create a new error, capturing the trace identifier in scope.
    ///
    /// A blank message is replaced by the code's generic description.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let text = message.into();
        let message = if text.trim().is_empty() {
            code.default_message().to_owned()
        } else {
            text
        };
        Self {
            code,
            message,
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        }
    }

    /// Fallible constructor that rejects blank messages.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self::new(code, message))
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Correlation identifier captured when the error was raised.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Supplementary error details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Machine-readable sub-code stored under `details.code`.
    pub fn sub_code(&self) -> Option<&str> {
        self.details.as_ref()?.get("code")?.as_str()
    }

    /// Field → message map stored under `details.errors`.
    pub fn field_errors(&self) -> Option<&Map<String, Value>> {
        self.details.as_ref()?.get("errors")?.as_object()
    }

    /// Attach structured details to the error.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach a machine-readable sub-code, keeping other details.
    ///
    /// # Examples
    /// ```
    /// use research_backend::domain::Error;
    ///
    /// let err = Error::unauthorized("link used").with_sub_code("reset_link_already_used");
    /// assert_eq!(err.sub_code(), Some("reset_link_already_used"));
    /// ```
    pub fn with_sub_code(mut self, code: &str) -> Self {
        self.merge_detail("code", Value::String(code.to_owned()));
        self
    }

    /// Override the trace identifier.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Fallible variant of [`Error::with_trace_id`].
    pub fn try_with_trace_id(self, trace_id: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let trace_id = trace_id.into();
        if trace_id.trim().is_empty() {
            return Err(ErrorValidationError::EmptyTraceId);
        }
        Ok(self.with_trace_id(trace_id))
    }

    /// Copy safe to expose outside the process.
    ///
    /// Internal errors lose their message and details; the trace identifier is
    /// kept so operators can correlate the report with logs.
    pub fn redacted(&self) -> Self {
        if self.code != ErrorCode::InternalError {
            return self.clone();
        }
        Self {
            code: self.code,
            message: ErrorCode::InternalError.default_message().to_owned(),
            trace_id: self.trace_id.clone(),
            details: None,
        }
    }

    fn merge_detail(&mut self, key: &str, value: Value) {
        match self.details.as_mut().and_then(Value::as_object_mut) {
            Some(map) => {
                map.insert(key.to_owned(), value);
            }
            None => {
                let mut map = Map::new();
                map.insert(key.to_owned(), value);
                self.details = Some(Value::Object(map));
            }
        }
    }

    /// Validation failure carrying a field → message map under `errors`.
    ///
    /// # Examples
    /// ```
    /// use std::collections::BTreeMap;
    /// use research_backend::domain::{Error, ErrorCode};
    ///
    /// let fields = BTreeMap::from([("email".to_owned(), "email is required".to_owned())]);
    /// let err = Error::validation("Validation failed", fields);
    /// assert_eq!(err.code(), ErrorCode::InvalidRequest);
    /// assert!(err.field_errors().is_some_and(|map| map.contains_key("email")));
    /// ```
    pub fn validation(message: impl Into<String>, fields: BTreeMap<String, String>) -> Self {
        Self::invalid_request(message).with_details(json!({ "errors": fields }))
    }

    /// Single-field validation failure.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let text = message.into();
        Self::validation(text.clone(), BTreeMap::from([(field.to_owned(), text)]))
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::NotModified`].
    pub fn not_modified(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotModified, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl From<pagination::PaginationErrors> for Error {
    fn from(errors: pagination::PaginationErrors) -> Self {
        Self::validation("Invalid pagination parameters", errors.field_messages())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            trace_id: value.trace_id,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            trace_id,
            details,
        } = value;
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        if trace_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(ErrorValidationError::EmptyTraceId);
        }
        // Deserialised payloads carry their own trace, never the ambient one.
        Ok(Self {
            code,
            message,
            trace_id,
            details,
        })
    }
}

#[cfg(test)]
mod tests;
