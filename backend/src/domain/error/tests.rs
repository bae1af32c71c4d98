//! Tests for error construction, redaction and trace propagation.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[fixture]
fn internal_error_case(expected_trace_id: String) -> Error {
    Error::internal("connection string leaked")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"secret": "x"}))
}

#[rstest]
fn invalid_request_constructor_sets_code() {
    let err = Error::invalid_request("bad");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn new_substitutes_generic_copy_for_blank_messages() {
    let err = Error::new(ErrorCode::Conflict, "");
    assert_eq!(err.message(), "Conflict");
}

#[rstest]
fn try_with_trace_id_rejects_empty_values() {
    let result = Error::invalid_request("bad").try_with_trace_id("   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyTraceId)));
}

#[rstest]
fn new_returns_none_when_trace_id_out_of_scope() {
    let error = Error::internal("boom");
    assert!(error.trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn new_captures_trace_id_in_scope(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id
        .parse()
        .expect("fixtures provide a valid UUID");
    let error = TraceId::scope(trace_id, async move { Error::conflict("duplicate") }).await;

    assert_eq!(error.trace_id(), Some(expected_trace_id.as_str()));
}

#[rstest]
#[tokio::test]
async fn deserialising_ignores_ambient_trace(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id
        .parse()
        .expect("fixtures provide a valid UUID");
    let payload = json!({"code": "not_found", "message": "gone"});

    let error = TraceId::scope(trace_id, async move {
        serde_json::from_value::<Error>(payload).expect("payload deserialises")
    })
    .await;

    assert!(error.trace_id().is_none());
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(ErrorCode::InvalidRequest, 400)]
#[case(ErrorCode::Unauthorized, 401)]
#[case(ErrorCode::Forbidden, 403)]
#[case(ErrorCode::NotFound, 404)]
#[case(ErrorCode::Conflict, 409)]
#[case(ErrorCode::NotModified, 304)]
#[case(ErrorCode::ServiceUnavailable, 503)]
#[case(ErrorCode::InternalError, 500)]
fn http_status_matches_error_code(#[case] code: ErrorCode, #[case] status: u16) {
    assert_eq!(code.http_status(), status);
}

#[rstest]
fn redaction_hides_internal_details(internal_error_case: Error, expected_trace_id: String) {
    let redacted = internal_error_case.redacted();

    assert_eq!(redacted.code(), ErrorCode::InternalError);
    assert_eq!(redacted.message(), "Internal server error");
    assert!(redacted.details().is_none());
    assert_eq!(redacted.trace_id(), Some(expected_trace_id.as_str()));
}

#[rstest]
fn redaction_keeps_client_errors_intact() {
    let err = Error::invalid_field("email", "email is required");
    assert_eq!(err.redacted(), err);
}

#[rstest]
fn sub_code_merges_with_existing_details() {
    let err = Error::invalid_field("password", "must differ")
        .with_sub_code("same_password");

    assert_eq!(err.sub_code(), Some("same_password"));
    assert!(
        err.field_errors()
            .is_some_and(|fields| fields.contains_key("password"))
    );
}

#[rstest]
fn serialised_form_uses_camel_case_and_snake_codes(expected_trace_id: String) {
    let err = Error::unauthorized("expired").with_trace_id(expected_trace_id.clone());
    let value = serde_json::to_value(&err).expect("serialise error");

    assert_eq!(
        value,
        json!({"code": "unauthorized", "message": "expired", "traceId": expected_trace_id})
    );
}

#[rstest]
fn pagination_failures_become_field_errors() {
    let errors = pagination::PageParams::new(Some("1"), Some("-1"), None)
        .resolve(&pagination::PaginationLimits::default())
        .expect_err("invalid parameters");

    let err = Error::from(errors);
    let fields = err.field_errors().expect("field map present");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(fields.get("limit"), Some(&json!("limit must be at least 10")));
    assert_eq!(fields.get("page"), Some(&json!("page must be greater than 0")));
}
