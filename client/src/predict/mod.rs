mod client;
mod models;

pub use client::{PredictionClient, PredictionError};
pub use models::{FeedRow, PredictResponse, ScanRequest};
