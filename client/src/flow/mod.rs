mod scan_flow;

pub use scan_flow::{ScanFlow, ScanFlowConfig};

pub use crate::predict::ScanRequest;

use std::time::Duration;

use crate::capture::CaptureError;
use crate::geo::GeoError;
use crate::predict::PredictionError;
use crate::profile::ProfileError;
use crate::store::{PersistenceError, StorageError};

/// Everything a scan run can fail with, one variant per pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),
    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("Prediction failed: {0}")]
    Prediction(#[from] PredictionError),
    #[error("Image storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Record persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Profile unavailable: {0}")]
    Profile(#[from] ProfileError),
    #[error("{step} timed out after {limit:?}")]
    Timeout {
        step: &'static str,
        limit: Duration,
    },
    #[error("Scan cancelled")]
    Cancelled,
}

impl From<GeoError> for ScanError {
    fn from(value: GeoError) -> Self {
        match value {
            GeoError::PermissionDenied => ScanError::PermissionDenied,
            GeoError::Unavailable(message) => ScanError::LocationUnavailable(message),
        }
    }
}
