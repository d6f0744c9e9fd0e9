use reqwest::StatusCode;

use assist_api::error::{body_message, parse_error_message};
use assist_api::AssistApiError;

#[test]
fn parse_error_message_prefers_top_level_message() {
    let body = r#"{"message":"Hint limit reached for this problem"}"#;
    let message = parse_error_message(StatusCode::TOO_MANY_REQUESTS, body);
    assert_eq!(message, "Hint limit reached for this problem");
}

#[test]
fn parse_error_message_reads_nested_error_message() {
    let body = r#"{"error":{"code":"bad_request","message":"code is required"}}"#;
    let message = parse_error_message(StatusCode::BAD_REQUEST, body);
    assert_eq!(message, "code is required");
}

#[test]
fn parse_error_message_accepts_string_error() {
    let body = r#"{"error":"unauthorized"}"#;
    let message = parse_error_message(StatusCode::UNAUTHORIZED, body);
    assert_eq!(message, "unauthorized");
}

#[test]
fn parse_error_message_keeps_short_plain_text_body() {
    let body = "raw failure text\n";
    let message = parse_error_message(StatusCode::INTERNAL_SERVER_ERROR, body);
    assert_eq!(message, "raw failure text");
}

#[test]
fn parse_error_message_hides_html_error_pages() {
    let body = "<html>\n<head><title>502 Bad Gateway</title></head>\n<body>nginx</body>\n</html>";
    let message = parse_error_message(StatusCode::BAD_GATEWAY, body);
    assert_eq!(message, "Bad Gateway");
}

#[test]
fn parse_error_message_hides_long_plain_text_body() {
    let body = "x".repeat(500);
    let message = parse_error_message(StatusCode::INTERNAL_SERVER_ERROR, &body);
    assert_eq!(message, "Internal Server Error");
}

#[test]
fn body_message_ignores_json_without_message() {
    assert_eq!(body_message(r#"{"code":42}"#), None);
    assert_eq!(body_message("<html>login</html>"), None);
    assert_eq!(body_message(r#"{"message":"Problem not found"}"#).as_deref(), Some("Problem not found"));
}

#[test]
fn parse_error_message_uses_reason_for_empty_body() {
    let message = parse_error_message(StatusCode::SERVICE_UNAVAILABLE, "  ");
    assert_eq!(message, "Service Unavailable");
}

#[test]
fn server_message_is_exposed_for_status_errors_only() {
    let status = AssistApiError::Status {
        status: StatusCode::BAD_REQUEST,
        message: "nope".to_string(),
    };
    assert_eq!(status.server_message(), Some("nope"));
    assert_eq!(AssistApiError::Cancelled.server_message(), None);

    let blank = AssistApiError::NotAStream {
        content_type: "text/html".to_string(),
        message: String::new(),
    };
    assert_eq!(blank.server_message(), None);
}
