//! Query server for the city roster.
//!
//! Answers "has this city been drawn?" and name suggestions from the roster,
//! and serves map markers for drawn cities. Markers are resolved in the
//! background after startup and become visible one by one as they resolve.

use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use drawmap::config::Config;
use drawmap::markers::{resolve_cities, MarkerSet};
use drawmap::roster::{Roster, RosterError};
use drawmap::{CityStatus, GeocodeResolver, NominatimGeocoder, ResolveOptions};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "City roster query server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// CSV roster with name, drawn and link columns
    #[arg(short, long)]
    cities: PathBuf,

    /// TOML config file (geocoder, resolver, fallback table)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "debug")]
    log_level: Level,
}

/// Application state shared across handlers
struct AppState {
    roster: Roster,
    markers: RwLock<MarkerSet>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str())),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Drawmap Query Server");

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    let roster = Roster::from_csv_path(&args.cities).context("Failed to load city roster")?;
    let drawn: Vec<_> = roster.drawn().cloned().collect();

    let state = Arc::new(AppState {
        markers: RwLock::new(MarkerSet::new(drawn.len())),
        roster,
    });

    let geocoder =
        NominatimGeocoder::new(&config.geocoder).context("Failed to create geocoder client")?;
    let resolver = GeocodeResolver::new(geocoder);
    let cancel = CancellationToken::new();
    let options = config.resolve_options().with_cancel(cancel.clone());
    tokio::spawn(resolve_markers(resolver, drawn, options, state.clone()));

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/check", get(check_handler))
        .route("/v1/suggest", get(suggest_handler))
        .route("/v1/markers", get(markers_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    cancel.cancel();
    Ok(())
}

/// Resolve drawn cities in the background, publishing each marker as it arrives.
async fn resolve_markers(
    resolver: GeocodeResolver<NominatimGeocoder>,
    cities: Vec<drawmap::CityRecord>,
    options: ResolveOptions,
    state: Arc<AppState>,
) {
    let stream = match resolve_cities(&resolver, cities, options) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Marker resolution not started: {}", e);
            return;
        }
    };

    let mut stream = pin!(stream);
    while let Some((city, result)) = stream.next().await {
        state.markers.write().await.record(&city, &result);
    }

    let markers = state.markers.read().await;
    info!(
        "Marker resolution finished: {} placed, {} unresolved",
        markers.markers().len(),
        markers.unresolved().len()
    );
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let markers = state.markers.read().await;
    Json(HealthResponse {
        status: "ok",
        cities: state.roster.len(),
        markers_processed: markers.processed(),
        markers_expected: markers.expected(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    cities: usize,
    markers_processed: usize,
    markers_expected: usize,
}

/// Has this city been drawn?
async fn check_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckQueryParams>,
) -> Result<Json<CityStatus>, (StatusCode, String)> {
    state
        .roster
        .check(&params.city)
        .map(Json)
        .map_err(|e| match e {
            RosterError::EmptyQuery => (StatusCode::BAD_REQUEST, e.to_string()),
            other => {
                tracing::error!("Check failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        })
}

/// Autocomplete over roster names
async fn suggest_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestQueryParams>,
) -> Json<Vec<String>> {
    let size = params.size.unwrap_or(10).min(50);
    Json(
        state
            .roster
            .suggest(&params.text, size)
            .into_iter()
            .map(String::from)
            .collect(),
    )
}

/// Markers resolved so far, as GeoJSON
async fn markers_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let markers = state.markers.read().await;
    let mut body = markers.to_geojson();
    body["complete"] = Value::Bool(markers.is_complete());
    body["unresolved"] = serde_json::to_value(markers.unresolved()).unwrap_or_default();
    Json(body)
}

#[derive(Deserialize)]
struct CheckQueryParams {
    /// City name as typed
    #[serde(default)]
    city: String,
}

#[derive(Deserialize)]
struct SuggestQueryParams {
    /// Prefix typed so far
    #[serde(default)]
    text: String,
    /// Number of suggestions
    size: Option<usize>,
}
