//! SQLite item repository
//!
//! Items live in a single table:
//!
//! ```sql
//! items(id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, price INTEGER, filename TEXT)
//! ```
//!
//! Every write uses `RETURNING` so the caller gets the row state the
//! database actually committed.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use super::{Item, ItemStore};
use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};

const SELECT_COLUMNS: &str = "id, name, price, filename";

pub struct SqliteItemStore {
    pool: SqlitePool,
}

impl SqliteItemStore {
    /// Open the pool and create the schema if it does not exist yet.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect_with(options)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to connect to database: {e}")))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                price INTEGER NOT NULL CHECK (price >= 0),
                filename TEXT NOT NULL DEFAULT ''
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to create items table: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    async fn list_items(&self) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {SELECT_COLUMNS} FROM items ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn get_item(&self, id: i64) -> Result<Item> {
        sqlx::query_as::<_, Item>(&format!(
            "SELECT {SELECT_COLUMNS} FROM items WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    async fn insert_item(&self, name: &str, price: i64, filename: &str) -> Result<Item> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "INSERT INTO items (name, price, filename) VALUES (?, ?, ?) RETURNING {SELECT_COLUMNS}"
        ))
        .bind(name)
        .bind(price)
        .bind(filename)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(item)
    }

    async fn update_item(
        &self,
        id: i64,
        name: &str,
        price: i64,
        filename: Option<&str>,
    ) -> Result<Item> {
        sqlx::query_as::<_, Item>(&format!(
            "UPDATE items SET name = ?, price = ?, filename = COALESCE(?, filename) \
             WHERE id = ? RETURNING {SELECT_COLUMNS}"
        ))
        .bind(name)
        .bind(price)
        .bind(filename)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound)
    }

    async fn delete_item(&self, id: i64) -> Result<String> {
        sqlx::query_scalar::<_, String>("DELETE FROM items WHERE id = ? RETURNING filename")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
