use std::time::Duration;

use reqwest::multipart;
use reqwest::Client as HttpClient;
use thiserror::Error;
use url::Url;

use shared::{ScanRecord, ScanResult};

use crate::predict::models::{FeedRow, PredictResponse, ScanRequest};

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(#[from] shared::InvalidCoordinates),
    #[error("Prediction endpoint error: {0}")]
    EndpointError(String),
    #[error("Invalid prediction response: {0}")]
    InvalidResponse(String),
}

/// Client for the remote prediction API: one multipart submit plus the two
/// read-only feeds. One request per call, no automatic retries.
#[derive(Clone)]
pub struct PredictionClient {
    http_client: HttpClient,
    base_url: Url,
}

impl PredictionClient {
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self, PredictionError> {
        let http_client = HttpClient::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PredictionError> {
        let raw = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path);
        Ok(Url::parse(&raw)?)
    }

    /// Submits one sample for classification. Coordinates are checked before
    /// anything touches the network; the response is normalized and
    /// validated before it is returned.
    pub async fn submit(&self, request: &ScanRequest) -> Result<ScanResult, PredictionError> {
        if !request.coordinates.is_valid() {
            return Err(PredictionError::InvalidCoordinates(
                shared::InvalidCoordinates,
            ));
        }

        let url = self.endpoint("predict")?;

        let file_part = multipart::Part::bytes(request.image.bytes.clone())
            .file_name(request.image.file_name.clone())
            .mime_str(request.image.mime_type())?;

        let mut form = multipart::Form::new()
            .part("file", file_part)
            .text("latitude", request.coordinates.latitude.to_string())
            .text("longitude", request.coordinates.longitude.to_string());
        for (key, value) in &request.metadata {
            form = form.text(key.clone(), value.clone());
        }

        let response = self.http_client.post(url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(PredictionError::EndpointError(format!(
                "{}: {}",
                status, error_text
            )));
        }

        let body: PredictResponse = response.json().await?;
        body.into_result(request.coordinates)
    }

    /// `GET /history` rows, normalized. Malformed rows are skipped with a
    /// warning rather than failing the whole read.
    pub async fn fetch_history(&self) -> Result<Vec<ScanRecord>, PredictionError> {
        self.fetch_rows("history").await
    }

    /// `GET /scans` rows for map rendering.
    pub async fn fetch_map_feed(&self) -> Result<Vec<ScanRecord>, PredictionError> {
        self.fetch_rows("scans").await
    }

    async fn fetch_rows(&self, path: &str) -> Result<Vec<ScanRecord>, PredictionError> {
        let url = self.endpoint(path)?;
        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(PredictionError::EndpointError(format!(
                "{}: {}",
                status, error_text
            )));
        }

        let rows: Vec<FeedRow> = response.json().await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_record() {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping malformed feed row: {}", e),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use shared::Coordinates;

    use crate::capture::CapturedImage;

    fn png_image() -> CapturedImage {
        CapturedImage::from_bytes(
            vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
            "scan.png",
        )
        .unwrap()
    }

    #[test]
    fn endpoint_joins_with_and_without_trailing_slash() {
        let with = PredictionClient::new(
            Url::parse("http://localhost:8081/").unwrap(),
            Duration::from_secs(5),
        )
        .unwrap();
        let without = PredictionClient::new(
            Url::parse("http://localhost:8081").unwrap(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            with.endpoint("predict").unwrap().as_str(),
            "http://localhost:8081/predict"
        );
        assert_eq!(
            without.endpoint("predict").unwrap().as_str(),
            "http://localhost:8081/predict"
        );
    }

    #[tokio::test]
    async fn submit_rejects_non_finite_coordinates_without_network() {
        // Port 9 goes nowhere. If the guard failed, this would surface a
        // connection error instead of InvalidCoordinates.
        let client = PredictionClient::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();

        let mut request = ScanRequest::new(
            png_image(),
            Coordinates::new(14.5995, 120.9842).unwrap(),
        );
        request.coordinates.latitude = f64::NAN;

        assert!(matches!(
            client.submit(&request).await,
            Err(PredictionError::InvalidCoordinates(_))
        ));
    }
}
