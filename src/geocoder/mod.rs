//! External geocoding lookups.
//!
//! The resolver only depends on the [`Geocoder`] trait; [`NominatimGeocoder`]
//! is the HTTP implementation used by the binaries.

pub mod nominatim;

use futures::future::BoxFuture;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::models::{Coordinate, CoordinateError};

pub use nominatim::NominatimGeocoder;

/// Errors raised by a single geocoding request.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("invalid geocoder URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder returned status {0}")]
    Status(u16),
    #[error("malformed geocoder response: {0}")]
    Malformed(String),
}

/// One candidate match returned by a geocoder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candidate {
    #[serde(deserialize_with = "deserialize_degrees")]
    pub lat: f64,
    #[serde(deserialize_with = "deserialize_degrees")]
    pub lon: f64,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Candidate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            display_name: None,
        }
    }

    pub fn coordinate(&self) -> Result<Coordinate, CoordinateError> {
        Coordinate::new(self.lat, self.lon)
    }
}

/// A forward geocoder: free-text place description to zero or more candidates.
///
/// Implementations must not retry or throttle on their own; pacing and
/// retries belong to the resolver.
pub trait Geocoder: Send + Sync {
    fn search(&self, query: String) -> BoxFuture<'_, Result<Vec<Candidate>, GeocodeError>>;
}

impl<G: Geocoder + ?Sized> Geocoder for std::sync::Arc<G> {
    fn search(&self, query: String) -> BoxFuture<'_, Result<Vec<Candidate>, GeocodeError>> {
        (**self).search(query)
    }
}

impl<G: Geocoder + ?Sized> Geocoder for Box<G> {
    fn search(&self, query: String) -> BoxFuture<'_, Result<Vec<Candidate>, GeocodeError>> {
        (**self).search(query)
    }
}

/// Nominatim sends degrees as strings, other services as numbers.
fn deserialize_degrees<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Degrees {
        Number(f64),
        Text(String),
    }

    match Degrees::deserialize(deserializer)? {
        Degrees::Number(v) => Ok(v),
        Degrees::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid degrees {:?}: {}", s, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_accepts_strings_and_numbers() {
        let c: Candidate =
            serde_json::from_str(r#"{"lat": "-30.0324999", "lon": "-51.2303767"}"#).unwrap();
        assert_eq!(c.lat, -30.0324999);
        assert_eq!(c.lon, -51.2303767);
        assert!(c.display_name.is_none());

        let c: Candidate =
            serde_json::from_str(r#"{"lat": -31.77, "lon": -52.34, "display_name": "Pelotas"}"#)
                .unwrap();
        assert_eq!(c.display_name.as_deref(), Some("Pelotas"));
    }

    #[test]
    fn test_candidate_rejects_garbage_degrees() {
        let c: Result<Candidate, _> = serde_json::from_str(r#"{"lat": "north", "lon": "0"}"#);
        assert!(c.is_err());
    }

    #[test]
    fn test_candidate_coordinate_validates() {
        assert!(Candidate::new(-30.0, -51.0).coordinate().is_ok());
        assert!(Candidate::new(300.0, -51.0).coordinate().is_err());
    }
}
