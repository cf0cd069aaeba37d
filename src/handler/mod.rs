//! Request handler module
//!
//! Routing dispatch plus the item API and upload handlers behind it.

pub mod items;
pub mod router;
pub mod uploads;

// Re-export main entry point
pub use router::handle_request;
