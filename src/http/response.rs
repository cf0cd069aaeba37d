//! HTTP response building module
//!
//! JSON bodies for the item API plus the raw-bytes responses used for
//! uploaded files. Builders never panic: a failed build is logged and a bare
//! response is returned instead.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN};
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::range::ByteRange;
use crate::error::AppError;
use crate::logger;

/// Allowed methods advertised to CORS preflight requests
const CORS_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Serialize `body` as the JSON response payload
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|e| {
                log_build_error(status.as_str(), &e);
                Response::new(Full::new(Bytes::new()))
            }),
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            error_body(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

/// `{"message": ...}` with 200 OK
pub fn message_response(message: &str) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({ "message": message }))
}

/// `{"error": ...}` with the given status
pub fn error_body(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Map a service error to its client-facing response; 5xx are logged
pub fn error_response(err: &AppError) -> Response<Full<Bytes>> {
    if err.is_server_error() {
        logger::log_error(&err.to_string());
    }
    error_body(err.status_code(), &err.to_string())
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    error_body(StatusCode::NOT_FOUND, "Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str) -> Response<Full<Bytes>> {
    let mut response = error_body(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    if let Ok(value) = HeaderValue::from_str(allow) {
        response.headers_mut().insert("Allow", value);
    }
    response
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    error_body(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(
    enable_cors: bool,
    requested_headers: Option<&HeaderValue>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", CORS_METHODS);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Methods", CORS_METHODS)
            .header("Access-Control-Max-Age", "86400");
        builder = match requested_headers {
            Some(headers) => builder.header("Access-Control-Allow-Headers", headers),
            None => builder.header("Access-Control-Allow-Headers", "Content-Type"),
        };
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Plain-text probe answer
pub fn build_health_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", "no-cache")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag)
        .header("Cache-Control", super::cache::IMMUTABLE)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Stored upload, whole or a single byte range. The body is dropped for
/// HEAD but `Content-Length` still describes it.
///
/// Uploads come from anonymous clients, so they are never sniffed and any
/// active content (SVG scripts, HTML) runs in a sandboxed origin.
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    range: Option<ByteRange>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let total = data.len();
    let mut builder = Response::builder()
        .header("Content-Type", content_type)
        .header("ETag", etag)
        .header("Cache-Control", super::cache::IMMUTABLE)
        .header("Accept-Ranges", "bytes")
        .header("X-Content-Type-Options", "nosniff")
        .header("Content-Security-Policy", "sandbox");

    let data = match range {
        Some(range) => {
            builder = builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header("Content-Range", range.content_range(total));
            data.slice(range.start..=range.end)
        }
        None => {
            builder = builder.status(StatusCode::OK);
            data
        }
    };

    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    builder
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("file", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 416 Range Not Satisfiable for a file of `total` bytes
pub fn build_416_response(total: usize) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header("Content-Range", format!("bytes */{total}"))
        .header("Accept-Ranges", "bytes")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Stamp the CORS origin header onto a finished response
pub fn apply_cors(response: &mut Response<Full<Bytes>>, origin: &str) {
    match HeaderValue::from_str(origin) {
        Ok(value) => {
            response
                .headers_mut()
                .insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        Err(e) => logger::log_warning(&format!("Invalid CORS origin '{origin}': {e}")),
    }
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
