use async_trait::async_trait;

use shared::Coordinates;

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Resolves the device position for a scan. Platform location services sit
/// behind this seam; a permission refusal must surface as
/// `GeoError::PermissionDenied` so the flow can abort before submitting.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, GeoError>;
}

/// Pinned position for headless use. The CLI builds one from flags, tests
/// from fixtures.
#[derive(Debug, Clone, Copy)]
pub struct FixedPositionProvider {
    position: Coordinates,
}

impl FixedPositionProvider {
    pub fn new(position: Coordinates) -> Self {
        Self { position }
    }
}

#[async_trait]
impl GeolocationProvider for FixedPositionProvider {
    async fn current_position(&self) -> Result<Coordinates, GeoError> {
        Ok(self.position)
    }
}

/// Default map center (Manila) for rendering before any position resolves.
pub fn default_region() -> Coordinates {
    Coordinates {
        latitude: 14.5995,
        longitude: 120.9842,
    }
}
