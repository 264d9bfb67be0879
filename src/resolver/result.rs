use serde::Serialize;
use thiserror::Error;

use crate::models::{Coordinate, PlaceQuery};

/// Why a single name did not resolve. Never fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ResolutionError {
    /// The lookup succeeded but returned no candidate
    #[error("no match found")]
    NotFound,
    /// Transport, status or parse failure
    #[error("lookup failed: {0}")]
    LookupFailed(String),
    /// The batch was cancelled before this name was looked up
    #[error("cancelled")]
    Cancelled,
}

/// Malformed input rejected before any lookup is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("name at position {index} is blank")]
    BlankName { index: usize },
}

/// Terminal outcome for one input name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub query: PlaceQuery,
    pub outcome: Result<Coordinate, ResolutionError>,
}

impl ResolutionResult {
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.outcome.as_ref().ok().copied()
    }

    pub fn error(&self) -> Option<&ResolutionError> {
        self.outcome.as_ref().err()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_ok()
    }
}
