//! Uploaded file serving
//!
//! `GET|HEAD /uploads/{filename}` returns the stored bytes, or one byte range
//! of them. Name checks live in the file store, so a traversal attempt looks
//! like any unknown file.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::config::AppState;
use crate::error::AppError;
use crate::http::range::{self, RangeOutcome};
use crate::http::{self, cache, mime};
use crate::logger;

pub async fn serve_upload(
    state: &AppState,
    filename: &str,
    if_none_match: Option<&str>,
    range_header: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    match state.items.read_file(filename).await {
        Ok(data) => {
            let etag = cache::generate_etag(&data);
            if cache::check_etag_match(if_none_match, &etag) {
                return http::build_304_response(&etag);
            }
            let range = match range::resolve_range(range_header, data.len()) {
                RangeOutcome::Full => None,
                RangeOutcome::Partial(range) => Some(range),
                RangeOutcome::NotSatisfiable => return http::build_416_response(data.len()),
            };
            http::build_file_response(
                Bytes::from(data),
                mime::content_type_for(filename),
                &etag,
                range,
                is_head,
            )
        }
        Err(AppError::NotFound) => http::build_404_response(),
        Err(AppError::Validation(_)) => {
            logger::log_warning(&format!("Rejected upload path: {filename}"));
            http::build_404_response()
        }
        Err(e) => http::error_response(&e),
    }
}
