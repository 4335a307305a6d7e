use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use shared::ScanRecord;

use crate::cache::HistoryCache;
use crate::capture::ImageSource;
use crate::flow::ScanError;
use crate::geo::GeolocationProvider;
use crate::predict::{PredictionClient, ScanRequest};
use crate::profile::ProfileRepository;
use crate::store::{ImageStore, PersistenceError, ScanStore};

/// Per-run parameters. One config describes one submission.
#[derive(Clone)]
pub struct ScanFlowConfig {
    pub capture_source: Arc<dyn ImageSource>,
    pub use_registered_location: bool,
    pub extra_metadata: HashMap<String, String>,
    pub step_timeout: Duration,
}

impl ScanFlowConfig {
    pub fn new(capture_source: Arc<dyn ImageSource>) -> Self {
        Self {
            capture_source,
            use_registered_location: false,
            extra_metadata: HashMap::new(),
            step_timeout: Duration::from_secs(60),
        }
    }

    pub fn use_registered_location(mut self, value: bool) -> Self {
        self.use_registered_location = value;
        self
    }

    pub fn step_timeout(mut self, value: Duration) -> Self {
        self.step_timeout = value;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_metadata.insert(key.into(), value.into());
        self
    }
}

/// Orchestrates one scan end to end: capture, locate, submit, persist,
/// cache. Steps run strictly in sequence and each one is bounded by the
/// configured timeout.
#[derive(Clone)]
pub struct ScanFlow {
    predictor: PredictionClient,
    images: Arc<dyn ImageStore>,
    scans: Arc<dyn ScanStore>,
    cache: HistoryCache,
    profiles: Arc<dyn ProfileRepository>,
    geolocation: Arc<dyn GeolocationProvider>,
}

impl ScanFlow {
    pub fn new(
        predictor: PredictionClient,
        images: Arc<dyn ImageStore>,
        scans: Arc<dyn ScanStore>,
        cache: HistoryCache,
        profiles: Arc<dyn ProfileRepository>,
        geolocation: Arc<dyn GeolocationProvider>,
    ) -> Self {
        Self {
            predictor,
            images,
            scans,
            cache,
            profiles,
            geolocation,
        }
    }

    pub async fn run(&self, config: ScanFlowConfig) -> Result<ScanRecord, ScanError> {
        self.run_inner(config).await
    }

    /// `run` with a cancellation handle. Cancellation drops the in-flight
    /// step; a run cancelled between upload and record insert can leave an
    /// object behind.
    pub async fn run_with_cancel(
        &self,
        config: ScanFlowConfig,
        mut cancel: oneshot::Receiver<()>,
    ) -> Result<ScanRecord, ScanError> {
        tokio::select! {
            _ = &mut cancel => Err(ScanError::Cancelled),
            result = self.run_inner(config) => result,
        }
    }

    async fn run_inner(&self, config: ScanFlowConfig) -> Result<ScanRecord, ScanError> {
        let limit = config.step_timeout;

        let image = bounded(limit, "capture", config.capture_source.resolve()).await??;

        let profile = bounded(limit, "profile load", self.profiles.load()).await??;
        let Some(profile) = profile else {
            // No registered user. Fail here, before any network work.
            return Err(ScanError::Persistence(PersistenceError::Unauthenticated));
        };

        let coordinates = match (config.use_registered_location, profile.location) {
            (true, Some(location)) => location,
            _ => {
                bounded(limit, "geolocation", self.geolocation.current_position()).await??
            }
        };

        let mut request = ScanRequest::new(image, coordinates);
        for (key, value) in &config.extra_metadata {
            request.metadata.insert(key.clone(), value.clone());
        }
        request
            .metadata
            .entry("municipality".to_string())
            .or_insert_with(|| profile.municipality.clone());
        request
            .metadata
            .entry("barangay".to_string())
            .or_insert_with(|| profile.barangay.clone());
        request
            .metadata
            .entry("user_id".to_string())
            .or_insert_with(|| profile.user_id.to_string());

        let mut result = bounded(limit, "predict", self.predictor.submit(&request)).await??;

        let image_url =
            bounded(limit, "store image", self.images.store_image(&request.image)).await??;
        result.image_url = Some(image_url.clone());

        let recorded = bounded(
            limit,
            "record result",
            self.scans.record_result(
                &result,
                profile.user_id,
                Some(profile.municipality.clone()),
                Some(profile.barangay.clone()),
            ),
        )
        .await?;

        let record = match recorded {
            Ok(record) => record,
            Err(e) => {
                // The object is already up; drop it so no orphan lingers,
                // then surface the persistence failure.
                if let Err(delete_err) = self.images.delete_by_url(&image_url).await {
                    log::warn!(
                        "Failed to delete orphaned image {}: {}",
                        image_url,
                        delete_err
                    );
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.cache.push(record.clone()).await {
            log::warn!("Failed to cache scan record {}: {}", record.id, e);
        }

        log::info!(
            "Scan {} classified as {} ({:.1}% confidence)",
            record.id,
            record.disease,
            record.confidence * 100.0
        );
        Ok(record)
    }
}

async fn bounded<T>(
    limit: Duration,
    step: &'static str,
    fut: impl Future<Output = T>,
) -> Result<T, ScanError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ScanError::Timeout { step, limit })
}
