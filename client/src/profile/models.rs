use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::Coordinates;

pub const PROFILE_SCHEMA_VERSION: u32 = 1;

/// The registered user of this device. One document per install; the same
/// shape is mirrored to the remote profiles table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub schema_version: u32,
    pub user_id: Uuid,
    pub name: String,
    pub contact: String,
    pub email: String,
    pub municipality: String,
    pub barangay: String,
    /// Registered farm position, used when a scan opts into the stored
    /// location instead of a live fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(
        name: impl Into<String>,
        contact: impl Into<String>,
        email: impl Into<String>,
        municipality: impl Into<String>,
        barangay: impl Into<String>,
    ) -> Self {
        Self {
            schema_version: PROFILE_SCHEMA_VERSION,
            user_id: Uuid::new_v4(),
            name: name.into(),
            contact: contact.into(),
            email: email.into(),
            municipality: municipality.into(),
            barangay: barangay.into(),
            location: None,
            avatar_url: None,
            registered_at: Utc::now(),
        }
    }
}
