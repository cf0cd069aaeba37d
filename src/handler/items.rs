//! Item API handlers
//!
//! Each handler turns a request into one `ItemService` call and maps the
//! outcome onto the JSON contract: items are returned directly, writes answer
//! `{"message": ...}`, failures answer `{"error": ...}`.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};

use crate::config::AppState;
use crate::error::AppError;
use crate::http;
use crate::logger;
use crate::service::{parse_id, ItemForm};

type HttpResponse = Response<Full<Bytes>>;

pub async fn list_items(state: &AppState) -> HttpResponse {
    match state.items.list().await {
        Ok(items) => http::json_response(StatusCode::OK, &items),
        Err(e) => http::error_response(&e),
    }
}

pub async fn get_item(state: &AppState, raw_id: &str) -> HttpResponse {
    let id = match parse_id(raw_id) {
        Ok(id) => id,
        Err(e) => return http::error_response(&e),
    };

    match state.items.get(id).await {
        Ok(item) => http::json_response(StatusCode::OK, &item),
        Err(e) => http::error_response(&e),
    }
}

pub async fn create_item<B>(req: Request<B>, state: &AppState) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let form = match read_item_form(req, state.config.http.max_body_size).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    match state.items.create(form).await {
        Ok(item) => {
            logger::log_info(&format!("Created item {} ({})", item.id, item.filename));
            http::message_response("Add item successfully")
        }
        Err(e) => http::error_response(&e),
    }
}

pub async fn update_item<B>(req: Request<B>, state: &AppState, raw_id: &str) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let id = match parse_id(raw_id) {
        Ok(id) => id,
        Err(e) => return http::error_response(&e),
    };
    let form = match read_item_form(req, state.config.http.max_body_size).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    match state.items.update(id, form).await {
        Ok(_) => http::message_response("Update item successfully"),
        Err(e) => http::error_response(&e),
    }
}

pub async fn delete_item(state: &AppState, raw_id: &str) -> HttpResponse {
    let id = match parse_id(raw_id) {
        Ok(id) => id,
        Err(e) => return http::error_response(&e),
    };

    match state.items.delete(id).await {
        Ok(()) => {
            logger::log_info(&format!("Deleted item {id}"));
            http::message_response("Item deleted successfully")
        }
        Err(e) => http::error_response(&e),
    }
}

/// Readiness probe: the database must answer
pub async fn readiness(state: &AppState) -> HttpResponse {
    match state.items.ping().await {
        Ok(()) => http::build_health_response(StatusCode::OK, "ok"),
        Err(e) => {
            logger::log_warning(&format!("Readiness check failed: {e}"));
            http::build_health_response(StatusCode::SERVICE_UNAVAILABLE, "not ready")
        }
    }
}

/// Buffer the body (bounded by `max_body_size`) and decode the item form
async fn read_item_form<B>(req: Request<B>, max_body_size: u64) -> Result<ItemForm, HttpResponse>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if let Some(response) = check_body_size(&req, max_body_size) {
        return Err(response);
    }

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let body = match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            logger::log_warning(&format!(
                "Request body exceeded {max_body_size} bytes while reading"
            ));
            return Err(http::build_413_response());
        }
        Err(e) => {
            return Err(http::error_response(&AppError::validation(format!(
                "Failed to read request body: {e}"
            ))));
        }
    };

    http::parse_item_form(content_type.as_deref(), body)
        .await
        .map_err(|e| http::error_response(&e))
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<HttpResponse> {
    let content_length = req.headers().get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            _ => None,
        },
    )
}
