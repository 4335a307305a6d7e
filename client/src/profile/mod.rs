mod models;
mod repository;

pub use models::{UserProfile, PROFILE_SCHEMA_VERSION};
pub use repository::{FileProfileStore, ProfileError, ProfileRepository};
