mod history_cache;
mod models;

pub use history_cache::{CacheError, HistoryCache, DEFAULT_HISTORY_LIMIT};
pub use models::CachedHistory;
