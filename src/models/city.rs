//! City roster rows and the values derived from them.

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// One row of the city roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    pub name: String,
    /// Whether a drawing of the city exists
    pub drawn: bool,
    /// Link to the drawing, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Answer to "has this city been drawn?"
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CityStatus {
    Drawn {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        link: Option<String>,
    },
    NotDrawn {
        name: String,
    },
    Unknown,
}

/// A resolved drawn city, ready to be placed on a map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub name: String,
    pub coordinate: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}
