use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared::{Coordinates, DiseaseLabel, ScanRecord, ScanResult};

use crate::profile::{UserProfile, PROFILE_SCHEMA_VERSION};
use crate::store::ScanStore;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Invalid data format: {0}")]
    InvalidData(String),
    #[error("No registered owner for the record")]
    Unauthenticated,
    #[error("Result has no stored image URL")]
    MissingImageUrl,
}

/// DynamoDB-backed persistence: insert-only scans table plus the mirrored
/// profiles table (upsert by user id).
#[derive(Clone)]
pub struct DynamoScanStore {
    client: Client,
    scans_table: String,
    profiles_table: String,
}

impl DynamoScanStore {
    pub fn new(client: Client, scans_table: String, profiles_table: String) -> Self {
        Self {
            client,
            scans_table,
            profiles_table,
        }
    }

    /// All persisted scans, optionally filtered to one owner. Table scan;
    /// the feed volume of a single deployment stays well inside one page.
    pub async fn list_scans(
        &self,
        owner_id: Option<Uuid>,
    ) -> Result<Vec<ScanRecord>, PersistenceError> {
        let mut request = self.client.scan().table_name(&self.scans_table);
        if let Some(owner_id) = owner_id {
            request = request
                .filter_expression("owner_id = :owner_id")
                .expression_attribute_values(
                    ":owner_id",
                    AttributeValue::S(owner_id.to_string()),
                );
        }

        let result = request
            .send()
            .await
            .map_err(|e| PersistenceError::DynamoDb(e.to_string()))?;

        let mut records = Vec::new();
        if let Some(items) = result.items {
            for item in items {
                records.push(scan_record_from_item(item)?);
            }
        }
        Ok(records)
    }

    /// Upserts the profile row. put_item replaces the whole item, which is
    /// exactly the mirror semantics wanted here.
    pub async fn put_profile(&self, profile: &UserProfile) -> Result<(), PersistenceError> {
        self.client
            .put_item()
            .table_name(&self.profiles_table)
            .set_item(Some(profile_to_item(profile)))
            .send()
            .await
            .map_err(|e| PersistenceError::DynamoDb(e.to_string()))?;

        log::info!("Mirrored profile {} to remote table", profile.user_id);
        Ok(())
    }

    pub async fn get_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserProfile>, PersistenceError> {
        let mut key = HashMap::new();
        key.insert("id".to_string(), AttributeValue::S(user_id.to_string()));

        let result = self
            .client
            .get_item()
            .table_name(&self.profiles_table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| PersistenceError::DynamoDb(e.to_string()))?;

        if let Some(item) = result.item {
            Ok(Some(profile_from_item(item)?))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl ScanStore for DynamoScanStore {
    async fn record_result(
        &self,
        result: &ScanResult,
        owner_id: Uuid,
        municipality: Option<String>,
        barangay: Option<String>,
    ) -> Result<ScanRecord, PersistenceError> {
        if owner_id.is_nil() {
            return Err(PersistenceError::Unauthenticated);
        }
        let image_url = result
            .image_url
            .clone()
            .ok_or(PersistenceError::MissingImageUrl)?;
        if !result.coordinates.is_valid() {
            return Err(PersistenceError::InvalidData(
                "non-finite coordinates".to_string(),
            ));
        }
        if result.disease.is_empty() {
            return Err(PersistenceError::InvalidData(
                "empty disease label".to_string(),
            ));
        }

        let record = ScanRecord::new(
            owner_id,
            result.disease.clone(),
            result.confidence,
            result.coordinates,
            image_url,
            municipality,
            barangay,
        );

        self.client
            .put_item()
            .table_name(&self.scans_table)
            .set_item(Some(scan_record_to_item(&record)))
            .send()
            .await
            .map_err(|e| PersistenceError::DynamoDb(e.to_string()))?;

        log::info!("Recorded scan {} for owner {}", record.id, record.owner_id);
        Ok(record)
    }
}

pub fn scan_record_to_item(record: &ScanRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(record.id.to_string()));
    item.insert(
        "owner_id".to_string(),
        AttributeValue::S(record.owner_id.to_string()),
    );
    item.insert(
        "disease".to_string(),
        AttributeValue::S(record.disease.to_string()),
    );
    item.insert(
        "confidence".to_string(),
        AttributeValue::N(record.confidence.to_string()),
    );
    item.insert(
        "latitude".to_string(),
        AttributeValue::N(record.coordinates.latitude.to_string()),
    );
    item.insert(
        "longitude".to_string(),
        AttributeValue::N(record.coordinates.longitude.to_string()),
    );
    item.insert(
        "image_url".to_string(),
        AttributeValue::S(record.image_url.clone()),
    );
    if let Some(municipality) = &record.municipality {
        item.insert(
            "municipality".to_string(),
            AttributeValue::S(municipality.clone()),
        );
    }
    if let Some(barangay) = &record.barangay {
        item.insert("barangay".to_string(), AttributeValue::S(barangay.clone()));
    }
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(record.created_at.to_rfc3339()),
    );
    item
}

pub fn scan_record_from_item(
    item: HashMap<String, AttributeValue>,
) -> Result<ScanRecord, PersistenceError> {
    let id = item
        .get("id")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid id".to_string()))?;

    let owner_id = item
        .get("owner_id")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid owner_id".to_string()))?;

    let disease = item
        .get("disease")
        .and_then(|v| v.as_s().ok())
        .map(|s| DiseaseLabel::from(s.clone()))
        .ok_or_else(|| PersistenceError::InvalidData("Invalid disease".to_string()))?;

    let confidence = item
        .get("confidence")
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<f32>().ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid confidence".to_string()))?;

    let latitude = item
        .get("latitude")
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid latitude".to_string()))?;

    let longitude = item
        .get("longitude")
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid longitude".to_string()))?;

    let coordinates = Coordinates::new(latitude, longitude)
        .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

    let image_url = item
        .get("image_url")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid image_url".to_string()))?
        .clone();

    let municipality = item
        .get("municipality")
        .and_then(|v| v.as_s().ok())
        .cloned();

    let barangay = item.get("barangay").and_then(|v| v.as_s().ok()).cloned();

    let created_at = item
        .get("created_at")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| PersistenceError::InvalidData("Invalid created_at".to_string()))?;

    Ok(ScanRecord {
        id,
        owner_id,
        disease,
        confidence,
        coordinates,
        image_url,
        municipality,
        barangay,
        created_at,
    })
}

pub fn profile_to_item(profile: &UserProfile) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert(
        "id".to_string(),
        AttributeValue::S(profile.user_id.to_string()),
    );
    item.insert(
        "schema_version".to_string(),
        AttributeValue::N(profile.schema_version.to_string()),
    );
    item.insert(
        "name".to_string(),
        AttributeValue::S(profile.name.clone()),
    );
    item.insert(
        "contact".to_string(),
        AttributeValue::S(profile.contact.clone()),
    );
    item.insert(
        "email".to_string(),
        AttributeValue::S(profile.email.clone()),
    );
    item.insert(
        "municipality".to_string(),
        AttributeValue::S(profile.municipality.clone()),
    );
    item.insert(
        "barangay".to_string(),
        AttributeValue::S(profile.barangay.clone()),
    );
    if let Some(location) = &profile.location {
        item.insert(
            "latitude".to_string(),
            AttributeValue::N(location.latitude.to_string()),
        );
        item.insert(
            "longitude".to_string(),
            AttributeValue::N(location.longitude.to_string()),
        );
    }
    if let Some(avatar_url) = &profile.avatar_url {
        item.insert(
            "avatar_url".to_string(),
            AttributeValue::S(avatar_url.clone()),
        );
    }
    item.insert(
        "registered_at".to_string(),
        AttributeValue::S(profile.registered_at.to_rfc3339()),
    );
    item
}

pub fn profile_from_item(
    item: HashMap<String, AttributeValue>,
) -> Result<UserProfile, PersistenceError> {
    let user_id = item
        .get("id")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid id".to_string()))?;

    let schema_version = item
        .get("schema_version")
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(PROFILE_SCHEMA_VERSION);

    let name = item
        .get("name")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid name".to_string()))?
        .clone();

    let contact = item
        .get("contact")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid contact".to_string()))?
        .clone();

    let email = item
        .get("email")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid email".to_string()))?
        .clone();

    let municipality = item
        .get("municipality")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid municipality".to_string()))?
        .clone();

    let barangay = item
        .get("barangay")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| PersistenceError::InvalidData("Invalid barangay".to_string()))?
        .clone();

    let latitude = item
        .get("latitude")
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<f64>().ok());
    let longitude = item
        .get("longitude")
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<f64>().ok());
    let location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(
            Coordinates::new(latitude, longitude)
                .map_err(|e| PersistenceError::InvalidData(e.to_string()))?,
        ),
        _ => None,
    };

    let avatar_url = item.get("avatar_url").and_then(|v| v.as_s().ok()).cloned();

    let registered_at = item
        .get("registered_at")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| PersistenceError::InvalidData("Invalid registered_at".to_string()))?;

    Ok(UserProfile {
        schema_version,
        user_id,
        name,
        contact,
        email,
        municipality,
        barangay,
        location,
        avatar_url,
        registered_at,
    })
}
