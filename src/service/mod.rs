//! Item service
//!
//! Sequences [`ItemStore`] and [`FileStore`] calls so that an item row and
//! its uploaded file stay consistent:
//!
//! - input is validated before any side effect
//! - an old file is only removed after the new file and the new row state
//!   are both confirmed
//! - a file saved for a row that could not be written is removed again
//!   (best effort, failures are logged)

mod validate;

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::logger;
use crate::storage::{FileStore, Item, ItemStore};

pub use validate::{parse_id, ItemForm, Upload};
use validate::{parse_name, parse_price};

pub struct ItemService {
    items: Arc<dyn ItemStore>,
    files: Arc<dyn FileStore>,
}

impl ItemService {
    pub fn new(items: Arc<dyn ItemStore>, files: Arc<dyn FileStore>) -> Self {
        Self { items, files }
    }

    pub async fn list(&self) -> Result<Vec<Item>> {
        self.items.list_items().await
    }

    pub async fn get(&self, id: i64) -> Result<Item> {
        self.items.get_item(id).await
    }

    pub async fn create(&self, form: ItemForm) -> Result<Item> {
        let name = parse_name(form.name.as_deref())?;
        let price = parse_price(form.price.as_deref())?;
        let upload = form
            .file
            .ok_or_else(|| AppError::validation("Failed to read file"))?;

        let filename = self
            .files
            .save(&upload.content, &upload.original_name)
            .await?;

        match self.items.insert_item(&name, price, &filename).await {
            Ok(item) => Ok(item),
            Err(e) => {
                self.discard_file(&filename).await;
                Err(e)
            }
        }
    }

    /// Without a file part only name and price change. With one, the new file
    /// is stored and referenced before the previous file is deleted.
    pub async fn update(&self, id: i64, form: ItemForm) -> Result<Item> {
        let name = parse_name(form.name.as_deref())?;
        let price = parse_price(form.price.as_deref())?;

        let Some(upload) = form.file else {
            return self.items.update_item(id, &name, price, None).await;
        };

        let current = self.items.get_item(id).await?;
        let new_filename = self
            .files
            .save(&upload.content, &upload.original_name)
            .await?;

        let item = match self
            .items
            .update_item(id, &name, price, Some(&new_filename))
            .await
        {
            Ok(item) => item,
            Err(e) => {
                self.discard_file(&new_filename).await;
                return Err(e);
            }
        };

        if !current.filename.is_empty() {
            self.files.delete(&current.filename).await?;
        }
        Ok(item)
    }

    /// The row goes first: it is the source of truth being removed.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let filename = self.items.delete_item(id).await?;
        if !filename.is_empty() {
            self.files.delete(&filename).await?;
        }
        Ok(())
    }

    pub async fn read_file(&self, filename: &str) -> Result<Vec<u8>> {
        self.files.read(filename).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.items.ping().await
    }

    async fn discard_file(&self, filename: &str) {
        if let Err(e) = self.files.delete(filename).await {
            logger::log_warning(&format!(
                "Failed to remove orphaned upload '{filename}': {e}"
            ));
        }
    }
}
