use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A geographic position attached to a scan. Wire format is flat
/// `latitude`/`longitude` fields, so records embed this with
/// `#[serde(flatten)]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[display(fmt = "({}, {})", latitude, longitude)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display(fmt = "coordinates must be finite numbers")]
pub struct InvalidCoordinates;

impl std::error::Error for InvalidCoordinates {}

impl Coordinates {
    /// Rejects NaN and infinite components. A submission must fail on bad
    /// coordinates before any network call is made, so this is the single
    /// place the check lives.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinates> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(InvalidCoordinates);
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Disease classification labels. The vocabulary is server-defined and open:
/// the variants below are the labels the classifier currently emits, and
/// anything else round-trips untouched through `Unknown`.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    Serialize,
    Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum DiseaseLabel {
    Newcastle,
    Salmo,
    Cocci,
    Healthy,
    #[strum(default)]
    Unknown(String),
}

impl DiseaseLabel {
    pub fn is_empty(&self) -> bool {
        matches!(self, DiseaseLabel::Unknown(s) if s.trim().is_empty())
    }
}

impl From<String> for DiseaseLabel {
    fn from(value: String) -> Self {
        DiseaseLabel::from_str(&value).unwrap_or(DiseaseLabel::Unknown(value))
    }
}

impl From<DiseaseLabel> for String {
    fn from(value: DiseaseLabel) -> Self {
        value.to_string()
    }
}

/// The normalized outcome of one prediction call. `image_url` and
/// `created_at` stay empty until the persistence step enriches the result;
/// a result is never recorded without both coordinates and a usable label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub disease: DiseaseLabel,
    pub confidence: f32,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ScanResult {
    pub fn new(disease: DiseaseLabel, confidence: f32, coordinates: Coordinates) -> Self {
        Self {
            disease,
            confidence,
            coordinates,
            image_url: None,
            created_at: None,
        }
    }
}

/// One persisted scan row, as stored in the scans table and served by the
/// history/map feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub disease: DiseaseLabel,
    pub confidence: f32,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barangay: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScanRecord {
    /// Builds a fresh row from an enriched result. The id is random and the
    /// timestamp is assigned here, at persistence time.
    pub fn new(
        owner_id: Uuid,
        disease: DiseaseLabel,
        confidence: f32,
        coordinates: Coordinates,
        image_url: String,
        municipality: Option<String>,
        barangay: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            disease,
            confidence,
            coordinates,
            image_url,
            municipality,
            barangay,
            created_at: Utc::now(),
        }
    }
}
