//! Storage of uploaded post images under the media root

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::forms::FormErrors;

/// Directory under the media root that holds post images
pub const POST_IMAGES_DIR: &str = "posts_images";

/// An image file received from a form
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

pub struct MediaStore {
    config: UploadConfig,
}

impl MediaStore {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Media root; served under `/media/`
    pub fn root(&self) -> &Path {
        &self.config.path
    }

    /// Record type and size problems of `upload` under the `image` field
    pub fn check(&self, upload: &ImageUpload, errors: &mut FormErrors) {
        if !self.config.is_type_allowed(&upload.content_type) {
            errors.add(
                "image",
                format!(
                    "Upload a valid image. Allowed types: {}.",
                    self.config.allowed_types.join(", ")
                ),
            );
        }
        if upload.data.len() as u64 > self.config.max_file_size {
            errors.add(
                "image",
                format!(
                    "File too large. Maximum size is {} MB.",
                    self.config.max_file_size / 1024 / 1024
                ),
            );
        }
    }

    /// Write `upload` under a fresh name and return its path relative to the
    /// media root, e.g. `posts_images/<uuid>.png`
    pub async fn save(&self, upload: &ImageUpload) -> Result<String> {
        let dir = self.config.path.join(POST_IMAGES_DIR);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create media directory {:?}", dir))?;

        let ext = self.config.get_extension(&upload.content_type);
        let name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = dir.join(&name);
        fs::write(&path, &upload.data)
            .await
            .with_context(|| format!("Failed to save image {:?}", path))?;

        tracing::debug!("Saved upload {:?} as {:?}", upload.filename, path);
        Ok(format!("{}/{}", POST_IMAGES_DIR, name))
    }

    /// Delete a stored image. Failures are logged and otherwise ignored.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            tracing::warn!("Refusing to remove media path outside the root: {}", relative);
            return;
        };
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove image {:?}: {}", path, e);
            }
        }
    }

    /// Absolute path of a stored file; `None` for paths escaping the root
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        (plain && !relative.as_os_str().is_empty()).then(|| self.config.path.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> MediaStore {
        MediaStore::new(UploadConfig {
            path: dir.path().to_path_buf(),
            max_file_size: 16,
            ..UploadConfig::default()
        })
    }

    fn png(len: usize) -> ImageUpload {
        ImageUpload {
            filename: "cat.png".into(),
            content_type: "image/png".into(),
            data: vec![0u8; len],
        }
    }

    #[test]
    fn test_check_type_and_size() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut errors = FormErrors::new();
        store.check(&png(16), &mut errors);
        assert!(errors.is_empty());

        store.check(&png(17), &mut errors);
        let mut pdf = png(1);
        pdf.content_type = "application/pdf".into();
        store.check(&pdf, &mut errors);
        assert_eq!(errors.get("image").len(), 2);
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let relative = store.save(&png(4)).await.unwrap();
        assert!(relative.starts_with("posts_images/"));
        assert!(relative.ends_with(".png"));
        let absolute = dir.path().join(&relative);
        assert_eq!(std::fs::read(&absolute).unwrap().len(), 4);

        store.remove(&relative).await;
        assert!(!absolute.exists());

        // second removal is a no-op
        store.remove(&relative).await;
    }

    #[tokio::test]
    async fn test_remove_ignores_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, "x").unwrap();

        let media = dir.path().join("media");
        let store = MediaStore::new(UploadConfig {
            path: media,
            ..UploadConfig::default()
        });
        store.remove("../keep.txt").await;
        store.remove("/etc/passwd").await;
        assert!(outside.exists());
    }
}
