//! Core data models shared by the resolver, roster and servers.

pub mod city;
pub mod place;

pub use city::{CityRecord, CityStatus, Marker};
pub use place::{Coordinate, CoordinateError, PlaceQuery};
