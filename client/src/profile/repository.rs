use std::path::PathBuf;

use async_trait::async_trait;

use crate::profile::models::{UserProfile, PROFILE_SCHEMA_VERSION};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Access to the device-local profile document. The flow takes this as an
/// injected collaborator, so tests swap in fixed fakes.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn load(&self) -> Result<Option<UserProfile>, ProfileError>;
    async fn save(&self, profile: &UserProfile) -> Result<(), ProfileError>;
}

/// JSON-file profile store under the data directory.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProfileRepository for FileProfileStore {
    async fn load(&self) -> Result<Option<UserProfile>, ProfileError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Version gate before the full decode so a document written by a
        // newer build fails soft instead of erroring.
        let probe: serde_json::Value = serde_json::from_slice(&bytes)?;
        let version = probe
            .get("schema_version")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if version > u64::from(PROFILE_SCHEMA_VERSION) {
            log::warn!(
                "Profile document has schema_version {}, newer than supported {}; ignoring it",
                version,
                PROFILE_SCHEMA_VERSION
            );
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, profile: &UserProfile) -> Result<(), ProfileError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(profile)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use shared::Coordinates;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProfileStore::new(dir.path().join("profile.json"));

        let mut profile = UserProfile::new(
            "Avelina Cruz",
            "+63 917 555 0101",
            "avelina@example.com",
            "Calamba",
            "Banlic",
        );
        profile.location = Some(Coordinates::new(14.1870, 121.1251).unwrap());

        store.save(&profile).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, profile);
    }

    #[tokio::test]
    async fn absent_document_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProfileStore::new(dir.path().join("profile.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn newer_schema_fails_soft() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");

        let profile = UserProfile::new("A", "B", "a@b.c", "M", "B");
        let mut doc = serde_json::to_value(&profile).unwrap();
        doc["schema_version"] = serde_json::json!(PROFILE_SCHEMA_VERSION + 1);
        tokio::fs::write(&path, serde_json::to_vec(&doc).unwrap())
            .await
            .unwrap();

        let store = FileProfileStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProfileStore::new(dir.path().join("profile.json"));

        let first = UserProfile::new("First", "1", "f@x.y", "M", "B");
        let second = UserProfile::new("Second", "2", "s@x.y", "M", "B");
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.name, "Second");
    }
}
