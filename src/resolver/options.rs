use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::models::place::normalize_name;
use crate::models::Coordinate;

/// Callback receiving the running count of produced results.
pub type ProgressFn = Arc<dyn Fn(usize) + Send + Sync>;

/// How the minimum delay between lookups is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// Wait for each lookup to finish, then wait `min_delay`, then dispatch the next.
    #[default]
    AfterCompletion,
    /// Only the dispatch starts are spaced `min_delay` apart.
    FromDispatch,
}

/// Known coordinates keyed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct FallbackTable {
    entries: HashMap<String, Coordinate>,
}

impl FallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, coordinate: Coordinate) {
        self.entries.insert(normalize_name(name), coordinate);
    }

    /// Look up by any spelling of the name (case and surrounding whitespace ignored)
    pub fn get(&self, name: &str) -> Option<Coordinate> {
        self.get_key(&normalize_name(name))
    }

    pub(crate) fn get_key(&self, key: &str) -> Option<Coordinate> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, Coordinate)> for FallbackTable {
    fn from_iter<T: IntoIterator<Item = (S, Coordinate)>>(iter: T) -> Self {
        let mut table = FallbackTable::new();
        for (name, coordinate) in iter {
            table.insert(name.as_ref(), coordinate);
        }
        table
    }
}

/// Per-call settings for [`GeocodeResolver::resolve_all`](super::GeocodeResolver::resolve_all).
#[derive(Clone)]
pub struct ResolveOptions {
    /// Minimum spacing between two external lookups
    pub min_delay: Duration,
    pub static_fallback: FallbackTable,
    /// Extra attempts after a failed (not empty) lookup
    pub max_retries: u32,
    pub pacing: Pacing,
    pub on_progress: Option<ProgressFn>,
    /// Checked before every dispatch
    pub cancel: Option<CancellationToken>,
    /// Appended to the lookup text as ", {suffix}"; never part of the cache key
    pub query_suffix: Option<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1000),
            static_fallback: FallbackTable::default(),
            max_retries: 0,
            pacing: Pacing::default(),
            on_progress: None,
            cancel: None,
            query_suffix: None,
        }
    }
}

impl ResolveOptions {
    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Text sent to the geocoder for a trimmed place name
    pub(crate) fn lookup_text(&self, name: &str) -> String {
        match self.query_suffix.as_deref().map(str::trim) {
            Some(suffix) if !suffix.is_empty() => format!("{}, {}", name, suffix),
            _ => name.to_string(),
        }
    }
}

impl fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("min_delay", &self.min_delay)
            .field("static_fallback", &self.static_fallback.len())
            .field("max_retries", &self.max_retries)
            .field("pacing", &self.pacing)
            .field("on_progress", &self.on_progress.is_some())
            .field("cancel", &self.cancel)
            .field("query_suffix", &self.query_suffix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_keys_are_normalized() {
        let pelotas = Coordinate::new(-31.7654, -52.3376).unwrap();
        let table: FallbackTable = [("Pelotas", pelotas)].into_iter().collect();

        assert_eq!(table.get(" pelotas "), Some(pelotas));
        assert_eq!(table.get("PELOTAS"), Some(pelotas));
        assert_eq!(table.get("Pelotas do Sul"), None);
    }

    #[test]
    fn test_lookup_text_suffix() {
        let mut options = ResolveOptions::default();
        assert_eq!(options.lookup_text("Canoas"), "Canoas");

        options.query_suffix = Some("RS, Brazil".into());
        assert_eq!(options.lookup_text("Canoas"), "Canoas, RS, Brazil");

        options.query_suffix = Some("  ".into());
        assert_eq!(options.lookup_text("Canoas"), "Canoas");
    }

    #[test]
    fn test_defaults() {
        let options = ResolveOptions::default();
        assert_eq!(options.min_delay, Duration::from_secs(1));
        assert_eq!(options.max_retries, 0);
        assert_eq!(options.pacing, Pacing::AfterCompletion);
        assert!(!options.is_cancelled());

        let token = CancellationToken::new();
        let options = options.with_cancel(token.clone());
        token.cancel();
        assert!(options.is_cancelled());
    }
}
