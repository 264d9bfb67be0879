//! Rate-limited batch geocoding.
//!
//! [`GeocodeResolver`] turns an ordered list of place names into a lazy stream
//! of [`ResolutionResult`]s, one per input, in input order. External lookups
//! are deduplicated by normalized name, cached per resolver instance and
//! spaced at least `min_delay` apart through a single per-instance gate.

mod cache;
mod gate;
mod options;
mod result;
mod service;

pub use options::{FallbackTable, Pacing, ProgressFn, ResolveOptions};
pub use result::{ResolutionError, ResolutionResult, ResolveError};
pub use service::GeocodeResolver;
