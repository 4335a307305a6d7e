mod analytics;
mod reader;

pub use analytics::{disease_counts, haversine_km, label_color, within_radius};
pub use reader::{HistoryError, HistoryReader};
