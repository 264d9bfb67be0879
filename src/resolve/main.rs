//! Batch resolver for a city roster.
//!
//! Reads the roster, resolves drawn cities through Nominatim (honouring the
//! configured delay between lookups) and writes the markers as GeoJSON.

use std::path::PathBuf;
use std::pin::pin;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use drawmap::config::Config;
use drawmap::markers::{resolve_cities, MarkerSet};
use drawmap::roster::Roster;
use drawmap::{GeocodeResolver, NominatimGeocoder};

#[derive(Parser, Debug)]
#[command(name = "resolve")]
#[command(about = "Resolve drawn cities to map markers")]
struct Args {
    /// CSV roster with name, drawn and link columns
    #[arg(short, long)]
    cities: PathBuf,

    /// TOML config file (geocoder, resolver, fallback table)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write GeoJSON to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Minimum delay between lookups, overrides the config
    #[arg(long)]
    min_delay_ms: Option<u64>,

    /// Retries per city on failed lookups, overrides the config
    #[arg(long)]
    max_retries: Option<u32>,

    /// Resolve every city in the roster, not only drawn ones
    #[arg(long)]
    all: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr, stdout may carry the GeoJSON)
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str())),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Drawmap Resolver");

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(ms) = args.min_delay_ms {
        config.resolver.min_delay_ms = ms;
    }
    if let Some(retries) = args.max_retries {
        config.resolver.max_retries = retries;
    }

    let roster = Roster::from_csv_path(&args.cities).context("Failed to load city roster")?;
    let cities: Vec<_> = if args.all {
        roster.records().to_vec()
    } else {
        roster.drawn().cloned().collect()
    };

    info!(
        "Resolving {} cities via {} ({} ms between lookups, {} fallback entries)",
        cities.len(),
        config.geocoder.base_url,
        config.resolver.min_delay_ms,
        config.fallback.len()
    );

    let geocoder =
        NominatimGeocoder::new(&config.geocoder).context("Failed to create geocoder client")?;
    let resolver = GeocodeResolver::new(geocoder);

    // Ctrl-C stops further lookups; the run still writes what it has
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing without further lookups");
            on_signal.cancel();
        }
    });

    let pb = ProgressBar::new(cities.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    let progress = pb.clone();
    let options = config
        .resolve_options()
        .with_progress(move |n| progress.set_position(n as u64))
        .with_cancel(cancel);

    let mut markers = MarkerSet::new(cities.len());
    let mut results = pin!(resolve_cities(&resolver, cities, options)?);
    while let Some((city, result)) = results.next().await {
        pb.set_message(city.name.clone());
        markers.record(&city, &result);
    }
    pb.finish_with_message("done");

    for city in markers.unresolved() {
        warn!("No marker for {}: {}", city.name, city.error);
    }
    info!(
        "{} markers, {} unresolved, {} lookups",
        markers.markers().len(),
        markers.unresolved().len(),
        resolver.dispatch_count()
    );

    let geojson = serde_json::to_string_pretty(&markers.to_geojson())?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, geojson)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", geojson),
    }

    Ok(())
}
