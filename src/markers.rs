//! Map markers for drawn cities, rendered as GeoJSON.

use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};

use crate::geocoder::Geocoder;
use crate::models::{CityRecord, Marker};
use crate::resolver::{
    GeocodeResolver, ResolutionError, ResolutionResult, ResolveError, ResolveOptions,
};

/// Resolve cities in order, pairing each record with its result.
pub fn resolve_cities<'a, G: Geocoder>(
    resolver: &'a GeocodeResolver<G>,
    cities: Vec<CityRecord>,
    options: ResolveOptions,
) -> Result<impl Stream<Item = (CityRecord, ResolutionResult)> + Send + 'a, ResolveError> {
    let names: Vec<String> = cities.iter().map(|c| c.name.clone()).collect();
    let results = resolver.resolve_all(names, options)?;
    Ok(stream::iter(cities).zip(results))
}

/// A drawn city that could not be placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedCity {
    pub name: String,
    pub error: ResolutionError,
}

/// Markers accumulated as resolution results arrive.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    expected: usize,
    markers: Vec<Marker>,
    unresolved: Vec<UnresolvedCity>,
}

impl MarkerSet {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            ..Self::default()
        }
    }

    /// Add the outcome for one city
    pub fn record(&mut self, city: &CityRecord, result: &ResolutionResult) {
        match &result.outcome {
            Ok(coordinate) => self.markers.push(Marker {
                name: city.name.clone(),
                coordinate: *coordinate,
                link: city.link.clone(),
            }),
            Err(error) => self.unresolved.push(UnresolvedCity {
                name: city.name.clone(),
                error: error.clone(),
            }),
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn unresolved(&self) -> &[UnresolvedCity] {
        &self.unresolved
    }

    pub fn processed(&self) -> usize {
        self.markers.len() + self.unresolved.len()
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.processed() >= self.expected
    }

    /// GeoJSON FeatureCollection with one Point feature per marker
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .markers
            .iter()
            .map(|m| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": m.coordinate.to_geojson_position(),
                    },
                    "properties": {
                        "name": m.name,
                        "link": m.link,
                    },
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
            "generated_at": Utc::now().to_rfc3339(),
        })
    }
}
