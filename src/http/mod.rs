//! HTTP protocol layer module
//!
//! Response builders, caching and range helpers, MIME lookup, and request
//! form decoding, kept apart from the item business logic.

pub mod cache;
pub mod form;
pub mod mime;
pub mod range;
pub mod response;

pub use form::parse_item_form;
pub use response::{
    apply_cors, build_304_response, build_404_response, build_405_response, build_413_response,
    build_416_response, build_file_response, build_health_response, build_options_response, error_response,
    json_response, message_response,
};
