mod commands;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use chrono::Utc;
use clap::Parser;
use tokio::sync::oneshot;

use client::cache::HistoryCache;
use client::capture::FileImageSource;
use client::config::Config;
use client::flow::{ScanFlow, ScanFlowConfig};
use client::geo::{default_region, FixedPositionProvider, GeoError, GeolocationProvider};
use client::history::{disease_counts, label_color, within_radius, HistoryReader};
use client::poll::{poll_until, PollConfig, PollError};
use client::predict::{PredictionClient, PredictionError};
use client::profile::{FileProfileStore, ProfileRepository, UserProfile};
use client::store::{DynamoScanStore, S3ImageStore};
use commands::{Cli, Commands, ProfileAction};
use shared::Coordinates;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let args = Cli::parse();

    if let Err(e) = run(args).await {
        log::error!("{}", e);
        process::exit(1);
    }
}

async fn run(args: Cli) -> CommandResult {
    let config = Config::from_env()?;

    match args.command {
        Commands::Scan {
            image,
            lat,
            lon,
            use_registered_location,
            watch,
        } => run_scan(&config, image, lat, lon, use_registered_location, watch).await,
        Commands::History { limit } => run_history(&config, limit).await,
        Commands::Map {
            radius_km,
            center_lat,
            center_lon,
        } => run_map(&config, radius_km, center_lat, center_lon).await,
        Commands::Watch {
            interval_secs,
            attempts,
        } => run_watch(&config, interval_secs, attempts).await,
        Commands::Profile { action } => run_profile(&config, action).await,
    }
}

/// Stand-in position source for hosts without location services. Scans on
/// such hosts must pass `--lat`/`--lon` or opt into the registered farm
/// location.
struct NoPositionProvider;

#[async_trait]
impl GeolocationProvider for NoPositionProvider {
    async fn current_position(&self) -> Result<Coordinates, GeoError> {
        Err(GeoError::Unavailable(
            "no location source on this host; pass --lat/--lon".to_string(),
        ))
    }
}

async fn aws_stores(config: &Config) -> (S3ImageStore, DynamoScanStore) {
    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    let s3_client = S3Client::new(&aws_config);
    let dynamodb_client = DynamoDbClient::new(&aws_config);

    let images = S3ImageStore::new(
        s3_client,
        config.s3_bucket.clone(),
        config.aws_region.clone(),
    );
    let scans = DynamoScanStore::new(
        dynamodb_client,
        config.scans_table.clone(),
        config.profiles_table.clone(),
    );
    (images, scans)
}

fn history_reader(config: &Config) -> Result<HistoryReader, PredictionError> {
    let predictor = PredictionClient::new(config.predict_api_base.clone(), config.request_timeout)?;
    let cache = HistoryCache::new(config.history_cache_path(), config.history_cache_limit);
    Ok(HistoryReader::new(predictor, cache))
}

async fn run_scan(
    config: &Config,
    image: PathBuf,
    lat: Option<f64>,
    lon: Option<f64>,
    use_registered_location: bool,
    watch: bool,
) -> CommandResult {
    let position = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)?),
        _ => None,
    };
    if position.is_none() && !use_registered_location {
        return Err("provide --lat/--lon or --use-registered-location".into());
    }

    let predictor = PredictionClient::new(config.predict_api_base.clone(), config.request_timeout)?;
    let cache = HistoryCache::new(config.history_cache_path(), config.history_cache_limit);
    let profiles = Arc::new(FileProfileStore::new(config.profile_path()));
    let (images, scans) = aws_stores(config).await;

    let geolocation: Arc<dyn GeolocationProvider> = match position {
        Some(position) => Arc::new(FixedPositionProvider::new(position)),
        None => Arc::new(NoPositionProvider),
    };

    let flow = ScanFlow::new(
        predictor.clone(),
        Arc::new(images),
        Arc::new(scans),
        cache.clone(),
        profiles,
        geolocation,
    );

    let flow_config = ScanFlowConfig::new(Arc::new(FileImageSource::new(image)))
        .use_registered_location(use_registered_location)
        .step_timeout(config.step_timeout);

    let record = flow.run(flow_config).await?;

    println!(
        "Recorded {}: {} at {:.1}% confidence, site ({:.4}, {:.4})",
        record.id,
        record.disease,
        record.confidence * 100.0,
        record.coordinates.latitude,
        record.coordinates.longitude
    );
    println!("Image: {}", record.image_url);

    if watch {
        let reader = HistoryReader::new(predictor, cache);
        let (_cancel_tx, cancel_rx) = oneshot::channel();
        let visible = reader
            .await_visible(
                &record,
                PollConfig::new(Duration::from_secs(2), 15),
                cancel_rx,
            )
            .await?;
        if visible {
            println!("Record is visible on the map feed.");
        } else {
            println!("Record not yet visible on the map feed; it may still be propagating.");
        }
    }

    Ok(())
}

async fn run_history(config: &Config, limit: Option<usize>) -> CommandResult {
    let reader = history_reader(config)?;
    let records = reader.list_recent(limit).await;

    if records.is_empty() {
        println!("No scan history.");
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {:<12} {:>5.1}%  ({:.4}, {:.4})  {}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.disease,
            record.confidence * 100.0,
            record.coordinates.latitude,
            record.coordinates.longitude,
            record.image_url
        );
    }

    Ok(())
}

async fn run_map(
    config: &Config,
    radius_km: Option<f64>,
    center_lat: Option<f64>,
    center_lon: Option<f64>,
) -> CommandResult {
    let reader = history_reader(config)?;
    let mut records = reader.list_for_map().await?;

    let center = match (center_lat, center_lon) {
        (Some(lat), Some(lon)) => Coordinates::new(lat, lon)?,
        _ => default_region(),
    };
    if let Some(radius_km) = radius_km {
        records = within_radius(&records, center, radius_km);
    }

    if records.is_empty() {
        println!("No markers to show.");
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {:<12} ({:.4}, {:.4})  {}",
            label_color(&record.disease),
            record.disease,
            record.coordinates.latitude,
            record.coordinates.longitude,
            record.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    for (label, count) in disease_counts(&records) {
        println!("{}  {:<12} {:>4}", label_color(&label), label, count);
    }

    Ok(())
}

async fn run_watch(config: &Config, interval_secs: u64, attempts: u32) -> CommandResult {
    let reader = history_reader(config)?;
    let (_cancel_tx, cancel_rx) = oneshot::channel();

    let reader_ref = &reader;
    let outcome: Result<(), PollError> = poll_until(
        PollConfig::new(Duration::from_secs(interval_secs), attempts),
        cancel_rx,
        move || async move {
            match reader_ref.list_for_map().await {
                Ok(records) => {
                    println!("[{}] {} records", Utc::now().format("%H:%M:%S"), records.len());
                    for (label, count) in disease_counts(&records) {
                        println!("  {:<12} {:>4}", label, count);
                    }
                }
                Err(e) => log::warn!("Map feed refresh failed: {}", e),
            }
            None::<()>
        },
    )
    .await;

    match outcome {
        Err(PollError::Exhausted(_)) => {
            println!("Watch finished.");
            Ok(())
        }
        Err(PollError::Cancelled) => Ok(()),
        Ok(()) => Ok(()),
    }
}

async fn run_profile(config: &Config, action: ProfileAction) -> CommandResult {
    let store = FileProfileStore::new(config.profile_path());

    match action {
        ProfileAction::Show => {
            match store.load().await? {
                Some(profile) => {
                    println!("User id:      {}", profile.user_id);
                    println!("Name:         {}", profile.name);
                    println!("Contact:      {}", profile.contact);
                    println!("Email:        {}", profile.email);
                    println!("Municipality: {}", profile.municipality);
                    println!("Barangay:     {}", profile.barangay);
                    if let Some(location) = profile.location {
                        println!("Farm site:    {}", location);
                    }
                    if let Some(avatar_url) = &profile.avatar_url {
                        println!("Avatar:       {}", avatar_url);
                    }
                    println!(
                        "Registered:   {}",
                        profile.registered_at.format("%Y-%m-%d %H:%M")
                    );
                }
                None => println!("No profile registered."),
            }
            Ok(())
        }
        ProfileAction::Register {
            name,
            contact,
            email,
            municipality,
            barangay,
            lat,
            lon,
        } => {
            // Re-registering keeps the existing identity so prior scans stay
            // attributed to the same owner.
            let mut profile = match store.load().await? {
                Some(mut existing) => {
                    existing.name = name;
                    existing.contact = contact;
                    existing.email = email;
                    existing.municipality = municipality;
                    existing.barangay = barangay;
                    existing
                }
                None => UserProfile::new(name, contact, email, municipality, barangay),
            };
            if let (Some(lat), Some(lon)) = (lat, lon) {
                profile.location = Some(Coordinates::new(lat, lon)?);
            }
            store.save(&profile).await?;
            println!("Registered profile {}", profile.user_id);
            Ok(())
        }
        ProfileAction::Sync => {
            let Some(profile) = store.load().await? else {
                return Err("no local profile to sync; run `profile register` first".into());
            };
            let (_images, scans) = aws_stores(config).await;
            scans.put_profile(&profile).await?;
            println!("Profile {} mirrored to the remote table.", profile.user_id);
            Ok(())
        }
    }
}
