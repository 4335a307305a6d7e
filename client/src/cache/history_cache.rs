use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use shared::ScanRecord;

use crate::cache::models::CachedHistory;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Bounded cache of the most recent scan records, backed by one JSON
/// document. The mutex serializes read-modify-write within this process;
/// concurrent writers from other processes are last-writer-wins.
#[derive(Clone)]
pub struct HistoryCache {
    path: PathBuf,
    limit: usize,
    lock: Arc<Mutex<()>>,
}

impl HistoryCache {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_default_limit(path: impl Into<PathBuf>) -> Self {
        Self::new(path, DEFAULT_HISTORY_LIMIT)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Prepends the record, evicting the oldest entries beyond the bound.
    pub async fn push(&self, record: ScanRecord) -> Result<(), CacheError> {
        let _guard = self.lock.lock().await;
        let mut history = self.read_unlocked().await?;
        history.records.insert(0, record);
        history.records.truncate(self.limit);
        self.write_unlocked(&history).await
    }

    /// Replaces the cached records wholesale, still honoring the bound.
    /// Callers pass newest-first.
    pub async fn replace_all(&self, records: Vec<ScanRecord>) -> Result<(), CacheError> {
        let _guard = self.lock.lock().await;
        let mut history = CachedHistory { records };
        history.records.truncate(self.limit);
        self.write_unlocked(&history).await
    }

    /// Cached records, newest first. An absent document is an empty cache.
    pub async fn recent(&self) -> Result<Vec<ScanRecord>, CacheError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_unlocked().await?.records)
    }

    async fn read_unlocked(&self) -> Result<CachedHistory, CacheError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(history) => Ok(history),
                Err(e) => {
                    log::warn!("History cache unreadable, starting empty: {}", e);
                    Ok(CachedHistory::default())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CachedHistory::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_unlocked(&self, history: &CachedHistory) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(history)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use shared::{Coordinates, DiseaseLabel};

    fn record_labeled(tag: &str, age_minutes: i64) -> ScanRecord {
        let mut record = ScanRecord::new(
            Uuid::new_v4(),
            DiseaseLabel::Unknown(tag.to_string()),
            0.5,
            Coordinates::new(14.5995, 120.9842).unwrap(),
            format!("https://bucket.s3.ap-southeast-1.amazonaws.com/scans/{tag}.jpg"),
            None,
            None,
        );
        record.created_at = Utc::now() - Duration::minutes(age_minutes);
        record
    }

    #[tokio::test]
    async fn bound_holds_and_oldest_is_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HistoryCache::new(dir.path().join("history.json"), 10);

        for i in 0..11 {
            cache.push(record_labeled(&format!("r{i}"), 0)).await.unwrap();
        }

        let records = cache.recent().await.unwrap();
        assert_eq!(records.len(), 10);
        // r0 went in first and must be the one evicted.
        assert!(records
            .iter()
            .all(|r| r.disease != DiseaseLabel::Unknown("r0".to_string())));
        assert_eq!(records[0].disease, DiseaseLabel::Unknown("r10".to_string()));
    }

    #[tokio::test]
    async fn newest_stays_in_front() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HistoryCache::new(dir.path().join("history.json"), 3);

        cache.push(record_labeled("old", 30)).await.unwrap();
        cache.push(record_labeled("new", 0)).await.unwrap();

        let records = cache.recent().await.unwrap();
        assert_eq!(records[0].disease, DiseaseLabel::Unknown("new".to_string()));
        assert_eq!(records[1].disease, DiseaseLabel::Unknown("old".to_string()));
    }

    #[tokio::test]
    async fn replace_all_truncates_to_limit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HistoryCache::new(dir.path().join("history.json"), 2);

        let records = vec![
            record_labeled("a", 0),
            record_labeled("b", 1),
            record_labeled("c", 2),
        ];
        cache.replace_all(records).await.unwrap();

        let kept = cache.recent().await.unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].disease, DiseaseLabel::Unknown("a".to_string()));
    }

    #[tokio::test]
    async fn missing_document_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HistoryCache::with_default_limit(dir.path().join("history.json"));
        assert!(cache.recent().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_starts_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let cache = HistoryCache::with_default_limit(&path);
        assert!(cache.recent().await.unwrap().is_empty());

        cache.push(record_labeled("fresh", 0)).await.unwrap();
        assert_eq!(cache.recent().await.unwrap().len(), 1);
    }
}
