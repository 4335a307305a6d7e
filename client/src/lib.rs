pub mod cache;
pub mod capture;
pub mod config;
pub mod flow;
pub mod geo;
pub mod history;
pub mod poll;
pub mod predict;
pub mod profile;
pub mod store;

pub use config::{Config, ConfigError};
pub use flow::{ScanError, ScanFlow, ScanFlowConfig};
pub use history::HistoryReader;
pub use poll::{poll_until, PollConfig, PollError};
