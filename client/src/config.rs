use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::cache::DEFAULT_HISTORY_LIMIT;

/// Runtime configuration, read once at startup. The binary loads `.env`
/// via dotenv before calling `from_env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub predict_api_base: Url,
    pub s3_bucket: String,
    pub aws_region: String,
    pub scans_table: String,
    pub profiles_table: String,
    pub data_dir: PathBuf,
    pub history_cache_limit: usize,
    pub request_timeout: Duration,
    pub step_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn optional_parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let predict_api_base = Url::parse(&required("PREDICT_API_BASE")?)?;
        let s3_bucket = required("S3_BUCKET_NAME")?;
        let aws_region =
            std::env::var("AWS_REGION").unwrap_or_else(|_| "ap-southeast-1".to_string());
        let scans_table = required("DYNAMODB_SCANS_TABLE")?;
        let profiles_table = required("DYNAMODB_PROFILES_TABLE")?;
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".scanner"));
        let history_cache_limit = optional_parsed("HISTORY_CACHE_LIMIT", DEFAULT_HISTORY_LIMIT)?;
        let request_timeout =
            Duration::from_secs(optional_parsed("REQUEST_TIMEOUT_SECS", 30u64)?);
        let step_timeout = Duration::from_secs(optional_parsed("STEP_TIMEOUT_SECS", 60u64)?);

        Ok(Self {
            predict_api_base,
            s3_bucket,
            aws_region,
            scans_table,
            profiles_table,
            data_dir,
            history_cache_limit,
            request_timeout,
            step_timeout,
        })
    }

    pub fn history_cache_path(&self) -> PathBuf {
        self.data_dir.join("history_cache.json")
    }

    pub fn profile_path(&self) -> PathBuf {
        self.data_dir.join("user_profile.json")
    }
}
