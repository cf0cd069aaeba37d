//! Item form decoding
//!
//! Create and update requests arrive as `multipart/form-data` (fields `name`,
//! `price` and an optional file part `file`) or, when no file is sent, as
//! `application/x-www-form-urlencoded`.

use futures_util::stream;
use hyper::body::Bytes;
use percent_encoding::percent_decode_str;
use std::convert::Infallible;

use crate::error::{AppError, Result};
use crate::service::{ItemForm, Upload};

const FIELD_NAME: &str = "name";
const FIELD_PRICE: &str = "price";
const FIELD_FILE: &str = "file";

/// Decode a fully buffered request body into an [`ItemForm`]
pub async fn parse_item_form(content_type: Option<&str>, body: Bytes) -> Result<ItemForm> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match essence.as_deref() {
        Some("multipart/form-data") => {
            // essence is only Some when content_type is
            parse_multipart(content_type.unwrap_or_default(), body).await
        }
        Some("application/x-www-form-urlencoded") => parse_urlencoded(&body),
        None if body.is_empty() => Ok(ItemForm::default()),
        _ => Err(AppError::validation("Unsupported content type")),
    }
}

async fn parse_multipart(content_type: &str, body: Bytes) -> Result<ItemForm> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {e}")))?;
    let body_stream = stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(body_stream, boundary);

    let mut form = ItemForm::default();
    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let field_name = field.name().map(ToString::to_string);
        match field_name.as_deref() {
            Some(FIELD_NAME) => form.name = Some(field.text().await.map_err(invalid_multipart)?),
            Some(FIELD_PRICE) => {
                form.price = Some(field.text().await.map_err(invalid_multipart)?);
            }
            Some(FIELD_FILE) => {
                // Browsers send an empty, nameless part when no file was picked
                let original_name = field.file_name().map(ToString::to_string);
                let content = field.bytes().await.map_err(invalid_multipart)?;
                if let Some(original_name) = original_name.filter(|n| !n.is_empty()) {
                    form.file = Some(Upload {
                        original_name,
                        content,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

#[allow(clippy::needless_pass_by_value)]
fn invalid_multipart(err: multer::Error) -> AppError {
    AppError::validation(format!("Invalid multipart body: {err}"))
}

fn parse_urlencoded(body: &[u8]) -> Result<ItemForm> {
    let text = std::str::from_utf8(body)
        .map_err(|_| AppError::validation("Form body is not valid UTF-8"))?;

    let mut form = ItemForm::default();
    for pair in text.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = decode_component(value)?;
        match decode_component(key)?.as_str() {
            FIELD_NAME => form.name = Some(value),
            FIELD_PRICE => form.price = Some(value),
            _ => {}
        }
    }
    Ok(form)
}

fn decode_component(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| AppError::validation("Form body is not valid UTF-8"))
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub const BOUNDARY: &str = "X-INVENTORY-BOUNDARY";

    /// Hand-assembled multipart body; `file` is `(original_name, content)`
    pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Bytes {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, content)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Bytes::from(body)
    }

    pub fn multipart_content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    #[tokio::test]
    async fn test_multipart_with_file() {
        let body = multipart_body(
            &[("name", "Widget"), ("price", "500")],
            Some(("widget.png", b"\x89PNG\r\n".as_slice())),
        );
        let form = parse_item_form(Some(&multipart_content_type()), body)
            .await
            .unwrap();

        assert_eq!(form.name.as_deref(), Some("Widget"));
        assert_eq!(form.price.as_deref(), Some("500"));
        let file = form.file.unwrap();
        assert_eq!(file.original_name, "widget.png");
        assert_eq!(&file.content[..], b"\x89PNG\r\n");
    }

    #[tokio::test]
    async fn test_multipart_empty_file_part_is_absent() {
        let body = multipart_body(&[("name", "Widget"), ("price", "5")], Some(("", b"".as_slice())));
        let form = parse_item_form(Some(&multipart_content_type()), body)
            .await
            .unwrap();
        assert!(form.file.is_none());
    }

    #[tokio::test]
    async fn test_multipart_missing_boundary() {
        let err = parse_item_form(Some("multipart/form-data"), Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_urlencoded() {
        let body = Bytes::from_static(b"name=Widget+Pro&price=600&extra=%21");
        let form = parse_item_form(
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            body,
        )
        .await
        .unwrap();

        assert_eq!(form.name.as_deref(), Some("Widget Pro"));
        assert_eq!(form.price.as_deref(), Some("600"));
        assert!(form.file.is_none());
    }

    #[tokio::test]
    async fn test_empty_body_without_content_type() {
        let form = parse_item_form(None, Bytes::new()).await.unwrap();
        assert!(form.name.is_none());
        assert!(form.price.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_content_type() {
        let err = parse_item_form(Some("application/json"), Bytes::from_static(b"{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Unsupported content type"));
    }
}
