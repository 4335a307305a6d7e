use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "scanner")]
#[command(about = "Field client for poultry disease scanning", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Submit a sample image for classification and persist the result
    Scan {
        /// Path to the sample image
        #[arg(long)]
        image: PathBuf,
        /// Latitude of the scan site
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        /// Longitude of the scan site
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        /// Use the registered farm location from the profile
        #[arg(long)]
        use_registered_location: bool,
        /// Wait until the new record shows up on the map feed
        #[arg(long)]
        watch: bool,
    },
    /// Show recent scans, falling back to the local cache offline
    History {
        /// Maximum number of records to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Render the map feed with legend colors and per-disease tallies
    Map {
        /// Only show records within this many kilometers of the center
        #[arg(long)]
        radius_km: Option<f64>,
        /// Center latitude for the radius filter
        #[arg(long, requires = "center_lon")]
        center_lat: Option<f64>,
        /// Center longitude for the radius filter
        #[arg(long, requires = "center_lat")]
        center_lon: Option<f64>,
    },
    /// Refresh the map feed at a fixed interval
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value_t = 10)]
        interval_secs: u64,
        /// Stop after this many refreshes
        #[arg(long, default_value_t = 60)]
        attempts: u32,
    },
    /// Manage the registered user profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// Print the stored profile
    Show,
    /// Register or update the local profile
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        contact: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        municipality: String,
        #[arg(long)]
        barangay: String,
        /// Registered farm latitude
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        /// Registered farm longitude
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
    },
    /// Mirror the local profile to the remote profiles table
    Sync,
}
