use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use shared::{Coordinates, DiseaseLabel, ScanRecord, ScanResult};

use crate::capture::CapturedImage;
use crate::predict::PredictionError;

/// Everything one submission carries: the validated image, a finite
/// position, and opaque pass-through metadata (municipality, barangay,
/// user id).
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub image: CapturedImage,
    pub coordinates: Coordinates,
    pub metadata: HashMap<String, String>,
}

impl ScanRequest {
    pub fn new(image: CapturedImage, coordinates: Coordinates) -> Self {
        Self {
            image,
            coordinates,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Raw body of `POST /predict`. Current deployments emit
/// `prediction`/`confidence`; older ones emit `disease`/`probability`.
/// Both shapes decode here.
#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    #[serde(alias = "disease")]
    pub prediction: String,
    #[serde(alias = "probability")]
    pub confidence: f32,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl PredictResponse {
    /// Normalizes the wire shape into a `ScanResult`, enforcing the response
    /// contract: non-empty label, confidence within [0, 1].
    pub fn into_result(self, coordinates: Coordinates) -> Result<ScanResult, PredictionError> {
        let label = DiseaseLabel::from(self.prediction);
        if label.is_empty() {
            return Err(PredictionError::InvalidResponse(
                "empty prediction label".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(PredictionError::InvalidResponse(format!(
                "confidence out of range: {}",
                self.confidence
            )));
        }
        let mut result = ScanResult::new(label, self.confidence, coordinates);
        result.image_url = self.image_url;
        Ok(result)
    }
}

/// One row of the `GET /scans` / `GET /history` feeds. Field names vary by
/// deployment age, so every alias pair is accepted; missing bookkeeping
/// fields are filled with neutral values during normalization.
#[derive(Debug, Deserialize)]
pub struct FeedRow {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default, alias = "owner_id")]
    pub user_id: Option<Uuid>,
    #[serde(alias = "disease")]
    pub prediction: String,
    #[serde(alias = "probability")]
    pub confidence: f32,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub barangay: Option<String>,
    #[serde(default, alias = "created_at")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl FeedRow {
    /// Validates and normalizes a feed row. Rows without a timestamp sort as
    /// oldest rather than newest, and rows without an id get a fresh one for
    /// local bookkeeping only.
    pub fn into_record(self) -> Result<ScanRecord, PredictionError> {
        let coordinates = Coordinates::new(self.latitude, self.longitude)
            .map_err(|e| PredictionError::InvalidResponse(e.to_string()))?;
        let disease = DiseaseLabel::from(self.prediction);
        if disease.is_empty() {
            return Err(PredictionError::InvalidResponse(
                "empty prediction label".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(PredictionError::InvalidResponse(format!(
                "confidence out of range: {}",
                self.confidence
            )));
        }
        Ok(ScanRecord {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            owner_id: self.user_id.unwrap_or_else(Uuid::nil),
            disease,
            confidence: self.confidence,
            coordinates,
            image_url: self.image_url.unwrap_or_default(),
            municipality: self.municipality,
            barangay: self.barangay,
            created_at: self.timestamp.unwrap_or(DateTime::UNIX_EPOCH),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manila() -> Coordinates {
        Coordinates::new(14.5995, 120.9842).unwrap()
    }

    #[test]
    fn decodes_canonical_response() {
        let body = r#"{"prediction": "Cocci", "confidence": 0.91}"#;
        let response: PredictResponse = serde_json::from_str(body).unwrap();
        let result = response.into_result(manila()).unwrap();
        assert_eq!(result.disease, DiseaseLabel::Cocci);
        assert!((result.confidence - 0.91).abs() < 1e-6);
    }

    #[test]
    fn decodes_legacy_response() {
        let body = r#"{"disease": "Newcastle", "probability": 0.83}"#;
        let response: PredictResponse = serde_json::from_str(body).unwrap();
        let result = response.into_result(manila()).unwrap();
        assert_eq!(result.disease, DiseaseLabel::Newcastle);
        assert!((result.confidence - 0.83).abs() < 1e-6);
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let body = r#"{"prediction": "Salmo", "confidence": 1.7}"#;
        let response: PredictResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            response.into_result(manila()),
            Err(PredictionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn rejects_blank_label() {
        let body = r#"{"prediction": "  ", "confidence": 0.5}"#;
        let response: PredictResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            response.into_result(manila()),
            Err(PredictionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn feed_row_tolerates_alias_pairs() {
        let body = r#"{
            "disease": "Healthy",
            "probability": 0.97,
            "latitude": 14.2117,
            "longitude": 121.1653,
            "created_at": "2024-06-01T08:30:00Z"
        }"#;
        let row: FeedRow = serde_json::from_str(body).unwrap();
        let record = row.into_record().unwrap();
        assert_eq!(record.disease, DiseaseLabel::Healthy);
        assert_eq!(record.created_at.to_rfc3339(), "2024-06-01T08:30:00+00:00");
    }

    #[test]
    fn feed_row_without_timestamp_sorts_oldest() {
        let body = r#"{
            "prediction": "Cocci",
            "confidence": 0.6,
            "latitude": 14.0,
            "longitude": 121.0
        }"#;
        let row: FeedRow = serde_json::from_str(body).unwrap();
        let record = row.into_record().unwrap();
        assert_eq!(record.created_at, DateTime::UNIX_EPOCH);
    }
}
