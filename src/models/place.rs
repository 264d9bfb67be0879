//! Place queries and validated coordinates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a latitude/longitude pair is outside WGS84 bounds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// Geographic point (lat/lon), always within WGS84 bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate", into = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// GeoJSON position order: `[lon, lat]`
    pub fn to_geojson_position(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

/// Config files write coordinates as `[lat, lon]`
#[derive(Serialize, Deserialize)]
struct RawCoordinate(f64, f64);

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.0, raw.1)
    }
}

impl From<Coordinate> for RawCoordinate {
    fn from(c: Coordinate) -> Self {
        RawCoordinate(c.latitude, c.longitude)
    }
}

/// One name the caller asked to resolve, kept exactly as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceQuery {
    pub name: String,
}

impl PlaceQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Text sent to the geocoder: the name without surrounding whitespace.
    pub fn lookup_text(&self) -> &str {
        self.name.trim()
    }

    /// Cache key: trimmed and case-folded.
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Normalize a place name into the key used by caches and fallback tables.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
