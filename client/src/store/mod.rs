mod image_store;
mod scan_store;

pub use image_store::{S3ImageStore, StorageError};
pub use scan_store::{
    profile_from_item, profile_to_item, scan_record_from_item, scan_record_to_item,
    DynamoScanStore, PersistenceError,
};

use async_trait::async_trait;
use uuid::Uuid;

use shared::{ScanRecord, ScanResult};

use crate::capture::CapturedImage;

/// Write-once image storage. The flow only needs upload plus the
/// compensating delete for records that fail to persist.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads the image and returns its public URL.
    async fn store_image(&self, image: &CapturedImage) -> Result<String, StorageError>;

    /// Best-effort removal of a previously uploaded object.
    async fn delete_by_url(&self, url: &str) -> Result<(), StorageError>;
}

/// Insert-only record persistence keyed to an owner.
#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn record_result(
        &self,
        result: &ScanResult,
        owner_id: Uuid,
        municipality: Option<String>,
        barangay: Option<String>,
    ) -> Result<ScanRecord, PersistenceError>;
}
