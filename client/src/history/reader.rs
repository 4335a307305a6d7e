use tokio::sync::oneshot;

use shared::ScanRecord;

use crate::cache::HistoryCache;
use crate::poll::{poll_until, PollConfig, PollError};
use crate::predict::PredictionClient;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("History feed unavailable: {0}")]
    Unavailable(String),
}

/// Remote-first history reads with the local cache as the degrade path.
#[derive(Clone)]
pub struct HistoryReader {
    client: PredictionClient,
    cache: HistoryCache,
}

impl HistoryReader {
    pub fn new(client: PredictionClient, cache: HistoryCache) -> Self {
        Self { client, cache }
    }

    /// Recent records, newest first. The remote feed wins; on failure the
    /// cached records are served, and an unreadable cache degrades to an
    /// empty list. Remote failure is logged, never propagated.
    pub async fn list_recent(&self, limit: Option<usize>) -> Vec<ScanRecord> {
        match self.list_recent_strict(limit).await {
            Ok(records) => records,
            Err(e) => {
                log::warn!("History feed unavailable, serving cached records: {}", e);
                let mut records = self.cache.recent().await.unwrap_or_default();
                sort_newest_first(&mut records);
                if let Some(limit) = limit {
                    records.truncate(limit);
                }
                records
            }
        }
    }

    /// Same read without the degrade, for callers that must see the failure.
    /// A successful read refreshes the local cache opportunistically.
    pub async fn list_recent_strict(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<ScanRecord>, HistoryError> {
        let mut records = self
            .client
            .fetch_history()
            .await
            .map_err(|e| HistoryError::Unavailable(e.to_string()))?;
        sort_newest_first(&mut records);
        if let Some(limit) = limit {
            records.truncate(limit);
        }

        if let Err(e) = self.cache.replace_all(records.clone()).await {
            log::warn!("Failed to refresh history cache: {}", e);
        }
        Ok(records)
    }

    /// Map feed rows for coordinate rendering. No distance or recency
    /// filtering is applied here.
    pub async fn list_for_map(&self) -> Result<Vec<ScanRecord>, HistoryError> {
        self.client
            .fetch_map_feed()
            .await
            .map_err(|e| HistoryError::Unavailable(e.to_string()))
    }

    /// Post-submit correlation: polls the map feed until a row matching the
    /// freshly persisted record appears. `Ok(false)` means attempts ran out
    /// without a match; cancellation propagates as an error.
    pub async fn await_visible(
        &self,
        record: &ScanRecord,
        config: PollConfig,
        cancel: oneshot::Receiver<()>,
    ) -> Result<bool, PollError> {
        let outcome = poll_until(config, cancel, move || async move {
            match self.list_for_map().await {
                Ok(rows) => rows
                    .iter()
                    .any(|row| matches_record(row, record))
                    .then_some(()),
                Err(e) => {
                    log::debug!("Map feed poll failed: {}", e);
                    None
                }
            }
        })
        .await;

        match outcome {
            Ok(()) => Ok(true),
            Err(PollError::Exhausted(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn sort_newest_first(records: &mut [ScanRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Feed rows may carry regenerated ids, so fall back to label plus position
/// when the id does not line up.
fn matches_record(row: &ScanRecord, target: &ScanRecord) -> bool {
    if row.id == target.id {
        return true;
    }
    row.disease == target.disease
        && (row.coordinates.latitude - target.coordinates.latitude).abs() < 1e-9
        && (row.coordinates.longitude - target.coordinates.longitude).abs() < 1e-9
}
