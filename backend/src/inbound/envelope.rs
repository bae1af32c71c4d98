//! Transport-neutral response envelope.
//!
//! Every outcome is reported as `{ success, message?, data?, errors?, code? }`
//! plus the status an HTTP boundary would attach. Internal errors are redacted
//! before they reach the envelope.

use pagination::Paginated;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::domain::{Entity, Error, ErrorCode, User};

/// Serialisable response body and its status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Field → message map on validation failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Map<String, Value>>,
    /// Machine-readable sub-code such as `token_expired`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Correlates a failure with server logs.
    #[serde(rename = "traceId", skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Status code for an HTTP boundary.
    #[serde(skip)]
    pub status: u16,
}

impl ResponseEnvelope {
    /// `200` with `data`.
    pub fn ok(data: Value) -> Self {
        Self::success(200, None, Some(data))
    }

    /// `201` with the created entity.
    pub fn created(data: Value) -> Self {
        Self::success(201, None, Some(data))
    }

    /// `200` with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::success(200, Some(message.into()), None)
    }

    /// `200` with a message and payload.
    pub fn with_message(message: impl Into<String>, data: Value) -> Self {
        Self::success(200, Some(message.into()), Some(data))
    }

    /// `200` with one page of entities, hidden fields removed.
    pub fn page<E: Entity>(page: &Paginated<E>) -> Self {
        let data: Vec<Value> = page
            .data
            .iter()
            .map(|entity| Value::Object(entity.to_public()))
            .collect();
        Self::ok(json!({ "data": data, "pagination": page.pagination }))
    }

    /// `200` with a user, hidden fields removed.
    pub fn user(user: &User) -> Self {
        Self::ok(Value::Object(user.to_public()))
    }

    /// Expected negative outcome that is not an [`Error`], such as a refused
    /// sign-in.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::success(status, Some(message.into()), None)
        }
    }

    fn success(status: u16, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message,
            data,
            errors: None,
            code: None,
            trace_id: None,
            status,
        }
    }
}

impl From<&Error> for ResponseEnvelope {
    fn from(error: &Error) -> Self {
        let safe = error.redacted();
        Self {
            success: false,
            message: Some(safe.message().to_owned()),
            data: None,
            errors: safe.field_errors().cloned(),
            code: safe.sub_code().map(str::to_owned),
            trace_id: safe.trace_id().map(str::to_owned),
            status: status_for(safe.code()),
        }
    }
}

/// HTTP status for `code`.
pub fn status_for(code: ErrorCode) -> u16 {
    code.http_status()
}
