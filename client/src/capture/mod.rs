mod file_source;
mod models;

pub use file_source::FileImageSource;
pub use models::{CapturedImage, ImageFormat};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Invalid file format")]
    InvalidFormat,
    #[error("File too large")]
    FileTooLarge,
    #[error("Capture source error: {0}")]
    Source(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hands the pipeline one image per scan. Camera and gallery pickers live
/// behind this seam on device builds; the CLI and tests use file-backed or
/// in-memory sources.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn resolve(&self) -> Result<CapturedImage, CaptureError>;
}
