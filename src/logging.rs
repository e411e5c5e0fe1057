//! Middleware for logging requests and responses.

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE, request, response},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Request and response bodies longer than this many bytes are truncated in
/// the `info` level logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

const REDACTED: &str = "********";
const SENSITIVE_FIELDS: [&str; 1] = ["password"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// Passwords in form and JSON request bodies are redacted.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read request body: {error}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    let body_text = String::from_utf8_lossy(&body_bytes);
    log_request(&parts, &redact_body(&parts.headers, &body_text));

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    log_response(&parts, &String::from_utf8_lossy(&body_bytes));

    Response::from_parts(parts, Body::from(body_bytes))
}

fn redact_body(headers: &HeaderMap, body_text: &str) -> String {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        SENSITIVE_FIELDS
            .iter()
            .fold(body_text.to_owned(), |text, field| redact_form_field(&text, field))
    } else if content_type.starts_with("application/json") {
        redact_json_fields(body_text)
    } else {
        body_text.to_owned()
    }
}

fn redact_form_field(form_text: &str, field_name: &str) -> String {
    let prefix = format!("{field_name}=");

    form_text
        .split('&')
        .map(|pair| {
            if pair.starts_with(&prefix) {
                format!("{prefix}{REDACTED}")
            } else {
                pair.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn redact_json_fields(json_text: &str) -> String {
    let Ok(mut value) = serde_json::from_str::<Value>(json_text) else {
        return json_text.to_owned();
    };

    if let Value::Object(object) = &mut value {
        for field in SENSITIVE_FIELDS {
            if let Some(field_value) = object.get_mut(field) {
                *field_value = Value::String(REDACTED.to_owned());
            }
        }
    }

    value.to_string()
}

fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(parts: &request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {} {}\nbody: {}...",
            parts.method,
            parts.uri,
            truncate(body)
        );
        tracing::debug!("Full request: {parts:#?}\nbody: {body:?}");
    } else {
        tracing::info!(
            "Received request: {} {}\nbody: {body:?}",
            parts.method,
            parts.uri
        );
    }
}

fn log_response(parts: &response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {}\nbody: {}...",
            parts.status,
            truncate(body)
        );
        tracing::debug!("Full response: {parts:#?}\nbody: {body:?}");
    } else {
        tracing::info!("Sending response: {}\nbody: {body:?}", parts.status);
    }
}

#[cfg(test)]
mod logging_tests {
    use axum::http::{HeaderMap, HeaderValue, header::CONTENT_TYPE};
    use serde_json::{Value, json};

    use super::{LOG_BODY_LENGTH_LIMIT, redact_body, truncate};

    fn headers_with_content_type(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn redacts_password_in_form() {
        let headers = headers_with_content_type("application/x-www-form-urlencoded");

        let redacted = redact_body(&headers, "username=admin&password=hunter2&remember_me=on");

        assert_eq!(redacted, "username=admin&password=********&remember_me=on");
    }

    #[test]
    fn redacts_password_in_json() {
        let headers = headers_with_content_type("application/json");

        let redacted = redact_body(
            &headers,
            &json!({"username": "admin", "password": "hunter2"}).to_string(),
        );

        let redacted: Value = serde_json::from_str(&redacted).unwrap();
        assert_eq!(redacted["username"], "admin");
        assert_eq!(redacted["password"], "********");
    }

    #[test]
    fn leaves_other_bodies_alone() {
        let headers = headers_with_content_type("text/plain");

        assert_eq!(redact_body(&headers, "password=hunter2"), "password=hunter2");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let body = "é".repeat(LOG_BODY_LENGTH_LIMIT);

        let truncated = truncate(&body);

        assert!(truncated.len() <= LOG_BODY_LENGTH_LIMIT);
        assert!(body.starts_with(truncated));
    }
}
