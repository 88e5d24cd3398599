use std::{io::ErrorKind, path::PathBuf};

use anyhow::Context;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{core::error::AppError, settings::Config};

pub const PHOTO_FIELD: &str = "photo";

/// Accepted content types and the extension a stored file gets.
const IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Employee photos on the local filesystem. Files are named
/// `<uuid v7>.<ext>`; the database only stores that name.
#[derive(Clone, Debug)]
pub struct PhotoStorage {
    dir: PathBuf,
    max_size: usize,
}

impl PhotoStorage {
    pub fn new(dir: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            dir: dir.into(),
            max_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.upload_dir, config.max_upload_size)
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Returns the extension to store the file under.
    pub fn validate(&self, content_type: Option<&str>, size: usize) -> Result<&'static str, AppError> {
        let extension = content_type
            .and_then(|ct| IMAGE_TYPES.iter().find(|(mime, _)| *mime == ct))
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                AppError::validation(
                    PHOTO_FIELD,
                    "Only image files (jpeg, png, gif, webp) are allowed",
                )
            })?;
        if size == 0 {
            return Err(AppError::validation(PHOTO_FIELD, "Photo file is empty"));
        }
        if size > self.max_size {
            return Err(AppError::validation(
                PHOTO_FIELD,
                &format!(
                    "Photo exceeds the maximum size of {} bytes",
                    self.max_size
                ),
            ));
        }
        Ok(extension)
    }

    /// Validate and write a photo, returning the stored file name.
    pub async fn save(&self, content_type: Option<&str>, data: &[u8]) -> Result<String, AppError> {
        let extension = self.validate(content_type, data.len())?;
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create upload dir {}", self.dir.display()))?;
        let file_name = format!("{}.{}", Uuid::now_v7(), extension);
        fs::write(self.path(&file_name), data)
            .await
            .with_context(|| format!("write photo {}", file_name))?;
        debug!("stored photo {}", file_name);
        Ok(file_name)
    }

    /// Best-effort removal. A file that is already gone is not an error.
    pub async fn remove(&self, file_name: &str) {
        match fs::remove_file(self.path(file_name)).await {
            Ok(()) => debug!("removed photo {}", file_name),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!("failed to remove photo {}: {}", file_name, err),
        }
    }
}
