//! Persistence layer
//!
//! Two capabilities back the item service:
//! - [`ItemStore`]: durable item rows (SQLite via sqlx)
//! - [`FileStore`]: uploaded files addressed by generated names (local disk)

mod local;
mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use local::LocalFileStore;
pub use sqlite::SqliteItemStore;

/// An inventory record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    /// Smallest currency unit
    pub price: i64,
    /// Generated name of the stored file, empty when none was uploaded
    pub filename: String,
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// All items ordered by id
    async fn list_items(&self) -> Result<Vec<Item>>;

    async fn get_item(&self, id: i64) -> Result<Item>;

    async fn insert_item(&self, name: &str, price: i64, filename: &str) -> Result<Item>;

    /// Name and price are always written; filename only when `Some`.
    async fn update_item(
        &self,
        id: i64,
        name: &str,
        price: i64,
        filename: Option<&str>,
    ) -> Result<Item>;

    /// Removes the row and returns the filename it referenced.
    async fn delete_item(&self, id: i64) -> Result<String>;

    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `content` under a freshly generated name and returns that name.
    async fn save(&self, content: &[u8], original_name: &str) -> Result<String>;

    /// Removing a file that is already gone succeeds.
    async fn delete(&self, filename: &str) -> Result<()>;

    async fn read(&self, filename: &str) -> Result<Vec<u8>>;
}
