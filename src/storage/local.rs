//! Local-disk file store
//!
//! Uploaded content is written into a single flat directory. Names are
//! generated as `<unix-millis>-<uuid><.ext>`: the timestamp keeps listings
//! roughly chronological, the random part makes collisions impossible.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::FileStore;
use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::logger;

const MAX_EXTENSION_LEN: usize = 16;

pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.upload_dir.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload directory if it is missing
    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(self.root()).await.map_err(|e| {
            AppError::Io(format!(
                "Failed to create upload directory '{}': {e}",
                self.root().display()
            ))
        })
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        if is_safe_filename(filename) {
            Ok(self.root.join(filename))
        } else {
            Err(AppError::validation("Invalid filename"))
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, content: &[u8], original_name: &str) -> Result<String> {
        let filename = generate_filename(original_name);
        let path = self.root.join(&filename);

        // create_new: a generated name must never replace an existing file
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let written = async {
            file.write_all(content).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path).await {
                logger::log_warning(&format!(
                    "Failed to remove partial upload '{}': {cleanup}",
                    path.display()
                ));
            }
            return Err(e.into());
        }

        Ok(filename)
    }

    async fn delete(&self, filename: &str) -> Result<()> {
        let path = self.resolve(filename)?;
        match fs::remove_file(&path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.resolve(filename)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::NotFound,
            _ => e.into(),
        })
    }
}

/// Generate a unique stored name that keeps the upload's extension
pub fn generate_filename(original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let id = uuid::Uuid::new_v4().simple();
    format!("{millis}-{id}{}", extension_of(original_name))
}

/// `.ext` in lowercase, or empty when the original has no usable extension
fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// A stored name is a single plain path component
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && !filename.contains("..")
        && !filename.contains(['/', '\\', '\0'])
}
