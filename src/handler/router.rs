//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: matches the path against the item
//! API, upload and health routes, checks the method, and dispatches. Access
//! logging and CORS headers are applied here for every response.

use crate::config::{AppState, HealthConfig};
use crate::handler::{items, uploads};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_REQUEST_HEADERS, IF_NONE_MATCH, RANGE, REFERER,
    SERVER, USER_AGENT,
};
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Resolved route; ids and filenames are still raw path segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Items,
    Item(&'a str),
    Upload(&'a str),
    Liveness,
    Readiness,
}

impl Route<'_> {
    /// Value of the `Allow` header for this route
    pub const fn allowed_methods(self) -> &'static str {
        match self {
            Self::Items => "GET, POST, OPTIONS",
            Self::Item(_) => "GET, PUT, DELETE, OPTIONS",
            Self::Upload(_) | Self::Liveness | Self::Readiness => "GET, HEAD, OPTIONS",
        }
    }
}

/// Map a request path to a route, or `None` for 404
pub fn match_route<'a>(path: &'a str, health: &HealthConfig) -> Option<Route<'a>> {
    if health.enabled {
        if path == health.liveness_path {
            return Some(Route::Liveness);
        }
        if path == health.readiness_path {
            return Some(Route::Readiness);
        }
    }

    if path == "/item" || path == "/item/" {
        return Some(Route::Items);
    }
    if let Some(id) = path.strip_prefix("/item/") {
        return (!id.is_empty() && !id.contains('/')).then_some(Route::Item(id));
    }
    if let Some(name) = path.strip_prefix("/uploads/") {
        return (!name.is_empty() && !name.contains('/')).then_some(Route::Upload(name));
    }
    None
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let entry = state
        .config
        .logging
        .access_log
        .then(|| access_entry(&req, peer_addr));

    let mut response = route_request(req, &state).await;

    let http_config = &state.config.http;
    if http_config.enable_cors {
        http::apply_cors(&mut response, &http_config.cors_allowed_origin);
    }
    if let Ok(server) = HeaderValue::from_str(&http_config.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on path and method
async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    let Some(route) = match_route(&path, &state.config.health) else {
        return http::build_404_response();
    };

    match (route, method) {
        (_, Method::OPTIONS) => http::build_options_response(
            state.config.http.enable_cors,
            req.headers().get(ACCESS_CONTROL_REQUEST_HEADERS),
        ),
        (Route::Liveness, Method::GET | Method::HEAD) => {
            http::build_health_response(StatusCode::OK, "ok")
        }
        (Route::Readiness, Method::GET | Method::HEAD) => items::readiness(state).await,
        (Route::Items, Method::GET) => items::list_items(state).await,
        (Route::Items, Method::POST) => items::create_item(req, state).await,
        (Route::Item(id), Method::GET) => items::get_item(state, id).await,
        (Route::Item(id), Method::PUT) => items::update_item(req, state, id).await,
        (Route::Item(id), Method::DELETE) => items::delete_item(state, id).await,
        (Route::Upload(name), method @ (Method::GET | Method::HEAD)) => {
            let header = |key: HeaderName| req.headers().get(key).and_then(|v| v.to_str().ok());
            uploads::serve_upload(
                state,
                name,
                header(IF_NONE_MATCH),
                header(RANGE),
                method == Method::HEAD,
            )
            .await
        }
        (route, method) => {
            logger::log_warning(&format!("Method not allowed: {method} {path}"));
            http::build_405_response(route.allowed_methods())
        }
    }
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::form::tests::{multipart_body, multipart_content_type};
    use crate::service::ItemService;
    use crate::storage::{Item, LocalFileStore, SqliteItemStore};
    use http_body_util::BodyExt;
    use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
    use tempfile::TempDir;

    const PEER: &str = "127.0.0.1:54321";

    async fn test_state(dir: &TempDir) -> Arc<AppState> {
        let mut config = Config::load_from("does-not-exist/inventory").unwrap();
        config.database.url = format!("sqlite://{}", dir.path().join("items.db").display());
        config.storage.upload_dir = dir.path().join("uploads");
        config.logging.access_log = false;

        let files = LocalFileStore::new(&config.storage);
        files.ensure_dir().await.unwrap();
        let items = SqliteItemStore::connect(&config.database).await.unwrap();
        let service = ItemService::new(Arc::new(items), Arc::new(files));
        Arc::new(AppState::new(config, service))
    }

    async fn send(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Response<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        let req = builder.body(Full::new(body)).unwrap();
        handle_request(req, Arc::clone(state), PEER.parse().unwrap())
            .await
            .unwrap()
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> Response<Full<Bytes>> {
        send(state, Method::GET, uri, None, Bytes::new()).await
    }

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_bytes(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    async fn create_widget(state: &Arc<AppState>) -> Response<Full<Bytes>> {
        let body = multipart_body(
            &[("name", "Widget"), ("price", "500")],
            Some(("widget.png", b"PNGDATA".as_slice())),
        );
        send(
            state,
            Method::POST,
            "/item",
            Some(&multipart_content_type()),
            body,
        )
        .await
    }

    #[test]
    fn test_match_route() {
        let health = HealthConfig::default();
        assert_eq!(match_route("/item", &health), Some(Route::Items));
        assert_eq!(match_route("/item/", &health), Some(Route::Items));
        assert_eq!(match_route("/item/42", &health), Some(Route::Item("42")));
        assert_eq!(match_route("/item/42/x", &health), None);
        assert_eq!(
            match_route("/uploads/1-a.png", &health),
            Some(Route::Upload("1-a.png"))
        );
        assert_eq!(match_route("/uploads/", &health), None);
        assert_eq!(match_route("/healthz", &health), Some(Route::Liveness));
        assert_eq!(match_route("/readyz", &health), Some(Route::Readiness));
        assert_eq!(match_route("/items", &health), None);
    }

    #[test]
    fn test_health_routes_can_be_disabled() {
        let health = HealthConfig {
            enabled: false,
            ..HealthConfig::default()
        };
        assert_eq!(match_route("/healthz", &health), None);
    }

    #[tokio::test]
    async fn test_item_lifecycle() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;

        let response = create_widget(&state).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"message": "Add item successfully"})
        );

        let items: Vec<Item> =
            serde_json::from_value(body_json(get(&state, "/item").await).await).unwrap();
        assert_eq!(items.len(), 1);
        let item = items[0].clone();
        assert_eq!(item.name, "Widget");
        assert_eq!(item.price, 500);
        assert!(item.filename.ends_with(".png"));

        let fetched: Item =
            serde_json::from_value(body_json(get(&state, &format!("/item/{}", item.id)).await).await)
                .unwrap();
        assert_eq!(fetched, item);

        // Update without a file keeps the stored filename
        let response = send(
            &state,
            Method::PUT,
            &format!("/item/{}", item.id),
            Some("application/x-www-form-urlencoded"),
            Bytes::from_static(b"name=Widget+Pro&price=600"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"message": "Update item successfully"})
        );
        let updated: Item =
            serde_json::from_value(body_json(get(&state, &format!("/item/{}", item.id)).await).await)
                .unwrap();
        assert_eq!(updated.name, "Widget Pro");
        assert_eq!(updated.price, 600);
        assert_eq!(updated.filename, item.filename);

        let response = send(
            &state,
            Method::DELETE,
            &format!("/item/{}", item.id),
            None,
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"message": "Item deleted successfully"})
        );

        let response = get(&state, &format!("/item/{}", item.id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Item not found"})
        );
        let response = get(&state, &format!("/uploads/{}", item.filename)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_with_file_replaces_upload() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;
        create_widget(&state).await;
        let items: Vec<Item> =
            serde_json::from_value(body_json(get(&state, "/item").await).await).unwrap();
        let old = items[0].clone();

        let body = multipart_body(
            &[("name", "Widget"), ("price", "500")],
            Some(("manual.pdf", b"%PDF".as_slice())),
        );
        let response = send(
            &state,
            Method::PUT,
            &format!("/item/{}", old.id),
            Some(&multipart_content_type()),
            body,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let new: Item =
            serde_json::from_value(body_json(get(&state, &format!("/item/{}", old.id)).await).await)
                .unwrap();
        assert_ne!(new.filename, old.filename);
        assert!(new.filename.ends_with(".pdf"));

        let response = get(&state, &format!("/uploads/{}", old.filename)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = get(&state, &format!("/uploads/{}", new.filename)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert_eq!(&body_bytes(response).await[..], b"%PDF");
    }

    #[tokio::test]
    async fn test_serve_upload_with_etag_and_head() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;
        create_widget(&state).await;
        let items: Vec<Item> =
            serde_json::from_value(body_json(get(&state, "/item").await).await).unwrap();
        let uri = format!("/uploads/{}", items[0].filename);

        let response = get(&state, &uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/png");
        let etag = response.headers().get(ETAG).unwrap().clone();
        assert_eq!(&body_bytes(response).await[..], b"PNGDATA");

        let req = Request::builder()
            .uri(&uri)
            .header(IF_NONE_MATCH, etag)
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handle_request(req, Arc::clone(&state), PEER.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

        let response = send(&state, Method::HEAD, &uri, None, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());
    }

    async fn ranged_get(state: &Arc<AppState>, uri: &str, range: &str) -> Response<Full<Bytes>> {
        let req = Request::builder()
            .uri(uri)
            .header(RANGE, range)
            .body(Full::new(Bytes::new()))
            .unwrap();
        handle_request(req, Arc::clone(state), PEER.parse().unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_serve_upload_byte_ranges() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;
        let body = multipart_body(
            &[("name", "Clip"), ("price", "100")],
            Some(("clip.mp4", b"0123456789".as_slice())),
        );
        let response = send(
            &state,
            Method::POST,
            "/item",
            Some(&multipart_content_type()),
            body,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let items: Vec<Item> =
            serde_json::from_value(body_json(get(&state, "/item").await).await).unwrap();
        let uri = format!("/uploads/{}", items[0].filename);

        let response = ranged_get(&state, &uri, "bytes=0-3").await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "video/mp4");
        assert_eq!(response.headers().get("content-range").unwrap(), "bytes 0-3/10");
        assert_eq!(response.headers().get("accept-ranges").unwrap(), "bytes");
        assert_eq!(&body_bytes(response).await[..], b"0123");

        let response = ranged_get(&state, &uri, "bytes=-2").await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(&body_bytes(response).await[..], b"89");

        let response = ranged_get(&state, &uri, "bytes=20-").await;
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers().get("content-range").unwrap(), "bytes */10");

        // Without a Range header the whole file comes back
        let response = get(&state, &uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(&body_bytes(response).await[..], b"0123456789");
    }

    #[tokio::test]
    async fn test_upload_traversal_is_not_found() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;
        let response = get(&state, "/uploads/..").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;

        let response = get(&state, "/item/abc").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Invalid item ID"})
        );

        let body = multipart_body(&[("name", "Widget"), ("price", "500")], None);
        let response = send(
            &state,
            Method::POST,
            "/item",
            Some(&multipart_content_type()),
            body,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Failed to read file"})
        );

        let body = multipart_body(
            &[("name", "Widget"), ("price", "cheap")],
            Some(("widget.png", b"PNGDATA".as_slice())),
        );
        let response = send(
            &state,
            Method::POST,
            "/item",
            Some(&multipart_content_type()),
            body,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Invalid price"})
        );

        // Nothing was stored by the rejected requests
        let items = body_json(get(&state, "/item").await).await;
        assert_eq!(items, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_invalid_and_missing_ids() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;

        let response = send(
            &state,
            Method::PUT,
            "/item/abc",
            Some("application/x-www-form-urlencoded"),
            Bytes::from_static(b"name=Widget&price=500"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Invalid item ID"})
        );

        let response = send(&state, Method::DELETE, "/item/abc", None, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Invalid item ID"})
        );

        let response = send(&state, Method::DELETE, "/item/999", None, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Item not found"})
        );
    }

    #[tokio::test]
    async fn test_update_missing_item() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;
        let response = send(
            &state,
            Method::PUT,
            "/item/999",
            Some("application/x-www-form-urlencoded"),
            Bytes::from_static(b"name=Ghost&price=1"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let dir = TempDir::new().unwrap();
        let mut state = test_state(&dir).await;
        Arc::get_mut(&mut state).unwrap().config.http.max_body_size = 8;

        let req = Request::builder()
            .method(Method::POST)
            .uri("/item")
            .header(CONTENT_LENGTH, "1024")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handle_request(req, Arc::clone(&state), PEER.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // No Content-Length: the limit is enforced while reading
        let response = send(
            &state,
            Method::POST,
            "/item",
            Some("application/x-www-form-urlencoded"),
            Bytes::from_static(b"name=Widget&price=500"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_method_not_allowed_and_not_found() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;

        let response = send(&state, Method::PATCH, "/item/1", None, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get("allow").unwrap(),
            "GET, PUT, DELETE, OPTIONS"
        );

        let response = get(&state, "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Not Found"})
        );
    }

    #[tokio::test]
    async fn test_options_and_cors() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;

        let response = send(&state, Method::OPTIONS, "/item", None, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );

        let response = get(&state, "/item").await;
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
        assert!(response.headers().contains_key(SERVER));
    }

    #[tokio::test]
    async fn test_health_probes() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;

        let response = get(&state, "/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&body_bytes(response).await[..], b"ok");

        let response = get(&state, "/readyz").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
