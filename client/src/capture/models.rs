use crate::capture::CaptureError;

/// Image formats the prediction endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Gif => "image/gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Gif => "gif",
        }
    }

    /// Detects the format from the leading magic bytes. Anything the
    /// endpoint does not accept comes back as `None`.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::WebP => Some(ImageFormat::Webp),
            image::ImageFormat::Gif => Some(ImageFormat::Gif),
            _ => None,
        }
    }
}

/// A validated image ready for submission. Construction is the only place
/// size and format are checked, so everything downstream can trust both.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub format: ImageFormat,
}

impl CapturedImage {
    pub const MAX_SIZE: usize = 50 * 1024 * 1024;

    pub fn from_bytes(
        bytes: Vec<u8>,
        file_name: impl Into<String>,
    ) -> Result<Self, CaptureError> {
        if bytes.len() > Self::MAX_SIZE {
            return Err(CaptureError::FileTooLarge);
        }
        let format = ImageFormat::sniff(&bytes).ok_or(CaptureError::InvalidFormat)?;
        Ok(Self {
            bytes,
            file_name: file_name.into(),
            format,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

    #[test]
    fn sniffs_supported_formats() {
        assert_eq!(ImageFormat::sniff(&PNG_MAGIC), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::sniff(&JPEG_MAGIC), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::sniff(b"not an image"), None);
    }

    #[test]
    fn rejects_unrecognized_bytes() {
        let result = CapturedImage::from_bytes(b"plain text".to_vec(), "scan.txt");
        assert!(matches!(result, Err(CaptureError::InvalidFormat)));
    }

    #[test]
    fn rejects_oversized_payloads() {
        let oversized = vec![0u8; CapturedImage::MAX_SIZE + 1];
        let result = CapturedImage::from_bytes(oversized, "huge.jpg");
        assert!(matches!(result, Err(CaptureError::FileTooLarge)));
    }

    #[test]
    fn carries_mime_and_extension() {
        let image = CapturedImage::from_bytes(PNG_MAGIC.to_vec(), "scan.png").unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.extension(), "png");
    }
}
