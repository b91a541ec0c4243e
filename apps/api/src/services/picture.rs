//! Product picture storage on the local filesystem.
//!
//! Pictures arrive base64-encoded and are written to
//! `{static}/pictures/{random}.{ext}`. The path stored on the product is
//! relative to the static folder.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};
use uuid::Uuid;

use tavola_core::{PictureData, ValidationError};

use crate::error::{ApiError, ApiResult};

const PICTURES_FOLDER: &str = "pictures";

#[derive(Debug, Clone)]
pub struct PictureStore {
    root: PathBuf,
}

impl PictureStore {
    pub fn new(static_folder: impl Into<PathBuf>) -> Self {
        PictureStore {
            root: static_folder.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decodes and writes the picture, returning its relative path.
    ///
    /// Bad base64 is a validation error on
    /// `picture_data.base64_encoded_image`; nothing is written then.
    pub async fn save(&self, picture: &PictureData) -> ApiResult<String> {
        let bytes = STANDARD
            .decode(picture.base64_encoded_image.trim())
            .map_err(|_| {
                ApiError::invalid(ValidationError::InvalidFormat {
                    field: "picture_data.base64_encoded_image".to_string(),
                    reason: "value is not valid base64".to_string(),
                })
            })?;

        let dir = self.root.join(PICTURES_FOLDER);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to create {}: {}", dir.display(), e)))?;

        let file_name = format!(
            "{}.{}",
            Uuid::new_v4().simple(),
            picture.picture_format.extension()
        );
        let path = dir.join(&file_name);

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), size = bytes.len(), "Picture saved");
        Ok(format!("{}/{}", PICTURES_FOLDER, file_name))
    }

    /// Best-effort removal of a stored picture.
    pub async fn remove(&self, relative_path: &str) {
        let path = self.root.join(relative_path);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove picture");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavola_core::PictureFormat;

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tavola-pictures-{}-{}", name, Uuid::new_v4().simple()))
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let store = PictureStore::new(temp_root("save"));
        let picture = PictureData {
            base64_encoded_image: STANDARD.encode(b"\x89PNG fake"),
            picture_format: PictureFormat::Png,
        };

        let relative = store.save(&picture).await.unwrap();
        assert!(relative.starts_with("pictures/"));
        assert!(relative.ends_with(".png"));

        let full = store.root().join(&relative);
        assert_eq!(tokio::fs::read(&full).await.unwrap(), b"\x89PNG fake");

        store.remove(&relative).await;
        assert!(!full.exists());

        let _ = tokio::fs::remove_dir_all(store.root()).await;
    }

    #[tokio::test]
    async fn test_invalid_base64_is_rejected() {
        let store = PictureStore::new(temp_root("invalid"));
        let picture = PictureData {
            base64_encoded_image: "not base64!!".to_string(),
            picture_format: PictureFormat::Jpeg,
        };

        match store.save(&picture).await {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.errors()[0].field(), "picture_data.base64_encoded_image");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!store.root().exists());
    }
}
