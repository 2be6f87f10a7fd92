//! Disk-backed storage for listing photos.
//!
//! Files are stored as `<uuid>` under the configured base directory.  Bytes
//! are sniffed with the `image` crate before anything touches disk; only
//! PNG, JPEG, and WebP survive.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;

/// Formats a listing photo may use.
const ALLOWED_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ApiError> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(&canonical_base)
        .unwrap_or(target)
        .components()
    {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(ApiError::BadRequest("Path traversal detected".to_string()));
            }
            _ => {} // RootDir, CurDir, Prefix — skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(ApiError::BadRequest("Path traversal detected".to_string()));
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    base_path: PathBuf,
    max_size: usize,
}

impl ImageStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ApiError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ApiError::Internal(format!(
                "Failed to create image directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Image store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Validate and persist a photo under `id`.  Returns the sniffed format.
    pub async fn store_image(&self, id: Uuid, data: &[u8]) -> Result<ImageFormat, ApiError> {
        if data.is_empty() {
            return Err(ApiError::BadRequest("Empty upload".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ApiError::PayloadTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let format = image::guess_format(data)
            .map_err(|_| ApiError::BadRequest("Not a recognized image".to_string()))?;
        if !ALLOWED_FORMATS.contains(&format) {
            return Err(ApiError::BadRequest(format!(
                "Unsupported image format {format:?}; use PNG, JPEG, or WebP"
            )));
        }

        let path = self.safe_image_path(&id)?;
        fs::write(&path, data)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to write image {id}: {e}")))?;

        debug!(id = %id, size = data.len(), ?format, "Stored image");
        Ok(format)
    }

    /// Read a photo back, along with its content type.
    pub async fn get_image(&self, id: Uuid) -> Result<(Vec<u8>, &'static str), ApiError> {
        let path = self.safe_image_path(&id)?;

        if !path.exists() {
            return Err(ApiError::NotFound(format!("Image {id} not found")));
        }

        let data = fs::read(&path)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to read image {id}: {e}")))?;

        let mime = image::guess_format(&data)
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream");

        debug!(id = %id, size = data.len(), "Retrieved image");
        Ok((data, mime))
    }

    /// Remove a photo from disk.  Missing files are not an error; the
    /// metadata row is authoritative and may outlive a crashed write.
    pub async fn delete_image(&self, id: Uuid) -> Result<(), ApiError> {
        let path = self.safe_image_path(&id)?;

        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(&path)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to delete image {id}: {e}")))?;

        debug!(id = %id, "Deleted image");
        Ok(())
    }

    /// Safe image path that validates against traversal.
    fn safe_image_path(&self, id: &Uuid) -> Result<PathBuf, ApiError> {
        let raw = self.base_path.join(id.to_string());
        ensure_within(&self.base_path, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    async fn test_store() -> (ImageStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        (store, dir)
    }

    fn tiny_png() -> Vec<u8> {
        let mut buf = Vec::new();
        image::RgbImage::new(2, 2)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let (store, _dir) = test_store().await;
        let data = tiny_png();
        let id = Uuid::new_v4();

        let format = store.store_image(id, &data).await.unwrap();
        assert_eq!(format, ImageFormat::Png);

        let (retrieved, mime) = store.get_image(id).await.unwrap();
        assert_eq!(retrieved, data);
        assert_eq!(mime, "image/png");
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _dir) = test_store().await;
        let id = Uuid::new_v4();
        store.store_image(id, &tiny_png()).await.unwrap();

        store.delete_image(id).await.unwrap();
        assert!(store.get_image(id).await.is_err());
        // Deleting again is a no-op, not an error.
        store.delete_image(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_image_rejected() {
        let (store, _dir) = test_store().await;
        let result = store.store_image(Uuid::new_v4(), b"<html>not an image</html>").await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_oversized_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), 16).await.unwrap();

        let result = store.store_image(Uuid::new_v4(), &tiny_png()).await;
        assert!(matches!(result, Err(ApiError::PayloadTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_empty_rejected() {
        let (store, _dir) = test_store().await;
        assert!(store.store_image(Uuid::new_v4(), b"").await.is_err());
    }
}
