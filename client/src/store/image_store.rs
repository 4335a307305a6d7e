use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use uuid::Uuid;

use crate::capture::CapturedImage;
use crate::store::ImageStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("File too large")]
    FileTooLarge,
    #[error("URL does not belong to this bucket: {0}")]
    ForeignUrl(String),
}

/// Uploads scan images to the public bucket and hands back the
/// virtual-hosted-style URL the record carries.
#[derive(Clone)]
pub struct S3ImageStore {
    client: Client,
    bucket_name: String,
    region: String,
}

impl S3ImageStore {
    pub fn new(client: Client, bucket_name: String, region: String) -> Self {
        Self {
            client,
            bucket_name,
            region,
        }
    }

    /// Object key for a fresh upload. Random name, so identical bytes
    /// uploaded twice become two objects.
    pub fn generate_key(extension: &str) -> String {
        format!("scans/{}.{}", Uuid::new_v4().simple(), extension)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket_name, self.region, key
        )
    }

    /// Inverse of `public_url`. Returns `None` for URLs this store did not
    /// produce.
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        let prefix = format!(
            "https://{}.s3.{}.amazonaws.com/",
            self.bucket_name, self.region
        );
        url.strip_prefix(&prefix).map(str::to_string)
    }

    pub fn validate_image_size(image_data: &[u8]) -> Result<(), StorageError> {
        if image_data.len() > CapturedImage::MAX_SIZE {
            return Err(StorageError::FileTooLarge);
        }
        Ok(())
    }

    pub async fn delete_image(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn store_image(&self, image: &CapturedImage) -> Result<String, StorageError> {
        Self::validate_image_size(&image.bytes)?;

        let key = Self::generate_key(image.extension());
        let body = ByteStream::from(image.bytes.clone());

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(body)
            .content_type(image.mime_type())
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        log::info!("Uploaded scan image as {}", key);
        Ok(self.public_url(&key))
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), StorageError> {
        let key = self
            .key_from_url(url)
            .ok_or_else(|| StorageError::ForeignUrl(url.to_string()))?;
        self.delete_image(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_per_upload() {
        let a = S3ImageStore::generate_key("jpg");
        let b = S3ImageStore::generate_key("jpg");
        assert_ne!(a, b);
        assert!(a.starts_with("scans/"));
        assert!(a.ends_with(".jpg"));
    }

    #[test]
    fn url_round_trips_through_key() {
        let store = make_store();
        let key = "scans/0f8fad5bd9cb469fa165b7d3d4c1e7f2.png";
        let url = store.public_url(key);
        assert_eq!(
            url,
            "https://scan-images.s3.ap-southeast-1.amazonaws.com/scans/0f8fad5bd9cb469fa165b7d3d4c1e7f2.png"
        );
        assert_eq!(store.key_from_url(&url).as_deref(), Some(key));
        assert_eq!(store.key_from_url("https://elsewhere.example/x.png"), None);
    }

    #[test]
    fn size_validation_mirrors_capture_cap() {
        assert!(S3ImageStore::validate_image_size(&[0u8; 16]).is_ok());
        let oversized = vec![0u8; CapturedImage::MAX_SIZE + 1];
        assert!(matches!(
            S3ImageStore::validate_image_size(&oversized),
            Err(StorageError::FileTooLarge)
        ));
    }

    fn make_store() -> S3ImageStore {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("ap-southeast-1"))
            .build();
        S3ImageStore::new(
            Client::from_conf(config),
            "scan-images".to_string(),
            "ap-southeast-1".to_string(),
        )
    }
}
