// Input validation for item requests
// Every check here runs before the service touches storage

use hyper::body::Bytes;

use crate::error::{AppError, Result};

/// A file part taken from an upload form
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub content: Bytes,
}

/// Raw create/update form as received; fields are validated by the service
#[derive(Debug, Clone, Default)]
pub struct ItemForm {
    pub name: Option<String>,
    pub price: Option<String>,
    pub file: Option<Upload>,
}

pub fn parse_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::validation("Invalid item ID"))
}

/// Name must be non-empty once surrounding whitespace is removed
pub fn parse_name(raw: Option<&str>) -> Result<String> {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(AppError::validation("Invalid name")),
    }
}

/// Price is a non-negative integer in the smallest currency unit
pub fn parse_price(raw: Option<&str>) -> Result<i64> {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|price| *price >= 0)
        .ok_or_else(|| AppError::validation("Invalid price"))
}
