//! Uploaded images (page banners, section pictures, the site logo).
//!
//! Files are written under the uploads directory with a random name and served
//! back from [`PUBLIC_PREFIX`]. Only the public path is stored in the database.

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;

/// URL prefix the uploads directory is served under
pub const PUBLIC_PREFIX: &str = "/uploads/";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("File has no extension")]
    MissingExtension,

    #[error("File type .{0} is not allowed")]
    ExtensionNotAllowed(String),

    #[error("File too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    allowed_extensions: Vec<String>,
    max_size: usize,
}

impl FileStore {
    pub fn new(
        root: impl Into<PathBuf>,
        allowed_extensions: &[String],
        max_size: usize,
    ) -> Self {
        Self {
            root: root.into(),
            allowed_extensions: allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            max_size,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.dir, &config.allowed_extensions, config.max_size_bytes)
    }

    /// Directory the files are written to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lowercased extension of `filename`, if it is on the allow-list
    pub fn validate(&self, filename: &str, size: usize) -> Result<String, StorageError> {
        if size == 0 {
            return Err(StorageError::Empty);
        }
        if size > self.max_size {
            return Err(StorageError::TooLarge {
                size,
                max: self.max_size,
            });
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or(StorageError::MissingExtension)?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(StorageError::ExtensionNotAllowed(extension));
        }

        Ok(extension)
    }

    /// Store an upload and return its public path
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<String, StorageError> {
        let extension = self.validate(filename, data.len())?;

        fs::create_dir_all(&self.root).await?;

        let name = format!("{}.{}", uuid::Uuid::new_v4().simple(), extension);
        fs::write(self.root.join(&name), data).await?;

        info!(file = %name, original = filename, size = data.len(), "Stored upload");
        Ok(format!("{}{}", PUBLIC_PREFIX, name))
    }

    /// Delete a previously stored upload. Paths outside the uploads directory
    /// and files that are already gone are ignored.
    pub async fn remove(&self, public_path: &str) -> Result<(), StorageError> {
        let Some(name) = public_path.strip_prefix(PUBLIC_PREFIX) else {
            debug!(path = public_path, "Not an upload path, leaving it alone");
            return Ok(());
        };

        let relative = Path::new(name);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            warn!(path = public_path, "Refusing to remove suspicious upload path");
            return Ok(());
        }

        match fs::remove_file(self.root.join(relative)).await {
            Ok(()) => {
                info!(path = public_path, "Removed upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete an upload that is no longer referenced. Failures are logged, not
    /// returned.
    pub async fn discard(&self, public_path: &str) {
        if public_path.is_empty() {
            return;
        }
        if let Err(e) = self.remove(public_path).await {
            warn!(path = public_path, error = %e, "Failed to remove unreferenced upload");
        }
    }

    /// Store a replacement and hand its public path to `record`, which writes
    /// it to the owning row. The previous file is deleted only once `record`
    /// succeeds; if it fails the new file is deleted instead.
    pub async fn replace<T, E, F, Fut>(
        &self,
        previous: Option<&str>,
        filename: &str,
        data: &[u8],
        record: F,
    ) -> Result<T, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<StorageError>,
    {
        let path = self.save(filename, data).await?;

        match record(path.clone()).await {
            Ok(value) => {
                if let Some(previous) = previous {
                    self.discard(previous).await;
                }
                Ok(value)
            }
            Err(e) => {
                self.discard(&path).await;
                Err(e)
            }
        }
    }
}
