//! HTTP transport.
//!
//! Routes:
//!
//! - `ANY /mock/:project/*path` serves a project's mocks by id or name
//! - `ANY /share/:token/*path` serves a project's mocks by share token
//! - `GET /health` reports liveness

use crate::error::MockError;
use crate::request::{parse_body, parse_query_string};
use crate::service::{MockRequest, MockService};
use crate::synthesizer::SynthesizedResponse;
use axum::body::{Body, Bytes};
use axum::extract::{Path, RawQuery, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, warn};

/// Build the HTTP router for `service`.
pub fn router(service: MockService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/mock/:project/*path", any(handle_mock))
        .route("/share/:token/*path", any(handle_shared))
        .fallback(not_found)
        .with_state(service)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

async fn handle_mock(
    State(service): State<MockService>,
    Path((project, path)): Path<(String, String)>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = build_request(&method, &path, query.as_deref(), &headers, &body);
    let result = service.handle(&project, &request).await;
    respond(&service, result)
}

async fn handle_shared(
    State(service): State<MockService>,
    Path((token, path)): Path<(String, String)>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = build_request(&method, &path, query.as_deref(), &headers, &body);
    let result = service.handle_shared(&token, &request).await;
    respond(&service, result)
}

fn build_request(
    method: &Method,
    path: &str,
    query: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> MockRequest {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

    MockRequest::new(method.as_str(), path)
        .with_query(parse_query_string(query.unwrap_or("")))
        .with_body(parse_body(content_type, body))
}

fn respond(service: &MockService, result: Result<SynthesizedResponse, MockError>) -> Response {
    match result {
        Ok(response) => into_http_response(response, &service.settings().default_content_type),
        Err(MockError::SharedProjectNotFound) => {
            error_response(StatusCode::NOT_FOUND, "Shared project not found")
        }
        Err(e) if e.is_not_found() => {
            error_response(StatusCode::NOT_FOUND, "No matching mock endpoint found")
        }
        Err(e) => {
            error!(error = %e, "Failed to serve mock request");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Convert a synthesized response into an HTTP response.
///
/// Endpoint headers are applied verbatim; `default_content_type` is added only
/// when they carry no `Content-Type`.
pub fn into_http_response(response: SynthesizedResponse, default_content_type: &str) -> Response {
    let status = StatusCode::from_u16(response.status_code).unwrap_or_else(|_| {
        warn!(status = response.status_code, "Invalid status code, using 500");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(header = %name, "Skipping invalid response header"),
        }
    }

    if !headers.contains_key(CONTENT_TYPE) {
        if let Ok(value) = HeaderValue::try_from(default_content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
    }

    let body = serde_json::to_vec(&response.body).unwrap_or_default();
    (status, headers, Body::from(body)).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"status": "error", "message": message})),
    )
        .into_response()
}
