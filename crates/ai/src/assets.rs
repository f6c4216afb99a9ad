//! Durable storage for generated media.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bedtime_core::story::StoredImage;

use crate::error::GenerationError;

/// Writes generated files and returns storage-relative paths.
#[async_trait]
pub trait AssetWriter: Send + Sync {
    /// Store image bytes under `name` with the extension of their detected
    /// format, recording dimensions.
    async fn write_image(&self, name: &str, bytes: &[u8]) -> Result<StoredImage, GenerationError>;

    /// Store arbitrary bytes at `name` and return the relative path.
    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<String, GenerationError>;
}

/// Detected format and pixel dimensions of an encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Canonical file extension, e.g. `png`.
    pub format: String,
}

/// Sniff the format of `bytes` and read its dimensions without decoding
/// pixel data.
pub fn inspect_image(bytes: &[u8]) -> Result<ImageInfo, GenerationError> {
    let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| GenerationError::Asset("unrecognized image format".to_string()))?;
    let extension = format
        .extensions_str()
        .first()
        .copied()
        .ok_or_else(|| GenerationError::Asset(format!("no extension for {format:?}")))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| GenerationError::Asset(e.to_string()))?;

    Ok(ImageInfo {
        width,
        height,
        format: extension.to_string(),
    })
}

/// Reject absolute paths and parent traversal so every asset stays under
/// the writer's root.
fn check_relative(name: &str) -> Result<&Path, GenerationError> {
    let path = Path::new(name);
    let safe = !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(path)
    } else {
        Err(GenerationError::Asset(format!("invalid asset path: {name}")))
    }
}

/// Asset writer backed by a local directory.
pub struct LocalAssetWriter {
    root: PathBuf,
}

impl LocalAssetWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write_bytes(&self, relative: &Path, bytes: &[u8]) -> Result<(), GenerationError> {
        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!(path = %target.display(), bytes = bytes.len(), "Asset written");
        Ok(())
    }
}

#[async_trait]
impl AssetWriter for LocalAssetWriter {
    async fn write_image(&self, name: &str, bytes: &[u8]) -> Result<StoredImage, GenerationError> {
        let info = inspect_image(bytes)?;
        let path = format!("{name}.{}", info.format);
        self.write_bytes(check_relative(&path)?, bytes).await?;

        Ok(StoredImage {
            path,
            width: info.width,
            height: info.height,
            format: info.format,
        })
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<String, GenerationError> {
        self.write_bytes(check_relative(name)?, bytes).await?;
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use image::{DynamicImage, ImageFormat};

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn inspect_reads_png_dimensions() {
        let info = inspect_image(&png(6, 4)).unwrap();
        assert_eq!(
            info,
            ImageInfo {
                width: 6,
                height: 4,
                format: "png".to_string()
            }
        );
    }

    #[test]
    fn inspect_rejects_unknown_bytes() {
        assert_matches!(
            inspect_image(b"definitely not an image"),
            Err(GenerationError::Asset(_))
        );
    }

    #[test]
    fn traversal_paths_are_rejected() {
        assert!(check_relative("images/a.png").is_ok());
        assert!(check_relative("../a.png").is_err());
        assert!(check_relative("/etc/passwd").is_err());
        assert!(check_relative("").is_err());
    }

    #[tokio::test]
    async fn write_image_appends_extension_and_records_size() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LocalAssetWriter::new(dir.path());

        let stored = writer.write_image("images/cover", &png(3, 2)).await.unwrap();
        assert_eq!(stored.path, "images/cover.png");
        assert_eq!((stored.width, stored.height), (3, 2));
        assert!(dir.path().join("images/cover.png").exists());
    }

    #[tokio::test]
    async fn write_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LocalAssetWriter::new(dir.path());

        let path = writer.write_file("audio/7.mp3", b"ID3").await.unwrap();
        assert_eq!(path, "audio/7.mp3");
        let written = std::fs::read(dir.path().join("audio/7.mp3")).unwrap();
        assert_eq!(written, b"ID3");
    }
}
