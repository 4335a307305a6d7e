use std::path::PathBuf;

use async_trait::async_trait;

use crate::capture::{CaptureError, CapturedImage, ImageSource};

/// File-backed image source. Camera and gallery pickers ultimately hand
/// over a file path, so this covers the CLI and the device integrations
/// alike.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn resolve(&self) -> Result<CapturedImage, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scan.jpg".to_string());
        CapturedImage::from_bytes(bytes, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_image_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        tokio::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
            .await
            .unwrap();

        let image = FileImageSource::new(&path).resolve().await.unwrap();
        assert_eq!(image.file_name, "sample.png");
        assert_eq!(image.mime_type(), "image/png");
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let source = FileImageSource::new("/nonexistent/scan.jpg");
        assert!(matches!(
            source.resolve().await,
            Err(CaptureError::Io(_))
        ));
    }
}
