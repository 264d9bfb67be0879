//! Drawmap - rate-limited geocoding of a city roster
//!
//! This library provides the resolver and the shared types used by the
//! `resolve` and `query` binaries.

pub mod config;
pub mod geocoder;
pub mod markers;
pub mod models;
pub mod resolver;
pub mod roster;

pub use geocoder::{Geocoder, NominatimGeocoder};
pub use models::{CityRecord, CityStatus, Coordinate, PlaceQuery};
pub use resolver::{GeocodeResolver, ResolutionError, ResolutionResult, ResolveOptions};
