//! The batch resolver.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, Stream};
use hashbrown::HashMap;
use tracing::{debug, info, warn};

use super::cache::GeocodeCache;
use super::gate::DelayGate;
use super::{Pacing, ResolutionError, ResolutionResult, ResolveError, ResolveOptions};
use crate::geocoder::{Candidate, GeocodeError, Geocoder};
use crate::models::{Coordinate, PlaceQuery};

type Outcome = Result<Coordinate, ResolutionError>;

/// Resolves place names to coordinates through a [`Geocoder`], one lookup per
/// unique name, with a per-instance cache and delay gate.
pub struct GeocodeResolver<G> {
    geocoder: G,
    cache: GeocodeCache,
    gate: DelayGate,
    dispatched: AtomicUsize,
}

impl<G: Geocoder> GeocodeResolver<G> {
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder,
            cache: GeocodeCache::new(),
            gate: DelayGate::default(),
            dispatched: AtomicUsize::new(0),
        }
    }

    /// Cached coordinate for a name, in any spelling.
    pub fn cached(&self, name: &str) -> Option<Coordinate> {
        self.cache.get(&PlaceQuery::new(name).key())
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// External lookups issued by this instance so far, retries included.
    pub fn dispatch_count(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Resolve `names` in order, yielding one result per name as soon as it is known.
    ///
    /// Fails only on malformed input (a blank name), before any lookup happens.
    /// Every other problem is reported per name in the stream.
    pub fn resolve_all<I, S>(
        &self,
        names: I,
        options: ResolveOptions,
    ) -> Result<impl Stream<Item = ResolutionResult> + Send + '_, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queries: Vec<PlaceQuery> = names.into_iter().map(PlaceQuery::new).collect();
        if let Some(index) = queries.iter().position(|q| q.lookup_text().is_empty()) {
            return Err(ResolveError::BlankName { index });
        }

        Ok(self.stream_batch(queries, options))
    }

    fn stream_batch(
        &self,
        queries: Vec<PlaceQuery>,
        options: ResolveOptions,
    ) -> impl Stream<Item = ResolutionResult> + Send + '_ {
        info!("Resolving {} place names", queries.len());

        let batch = Batch {
            resolver: self,
            total: queries.len(),
            queries: queries.into_iter(),
            decided: HashMap::new(),
            options,
            produced: 0,
            failed: 0,
        };

        stream::unfold(batch, |mut batch| async move {
            let Some(query) = batch.queries.next() else {
                batch.finish();
                return None;
            };

            let outcome = batch.resolve(&query).await;
            if outcome.is_err() {
                batch.failed += 1;
            }
            batch.produced += 1;
            if let Some(progress) = &batch.options.on_progress {
                progress(batch.produced);
            }

            Some((ResolutionResult { query, outcome }, batch))
        })
    }

    /// Look a name up externally, retrying transient failures.
    async fn lookup(&self, query: &PlaceQuery, key: &str, options: &ResolveOptions) -> Outcome {
        let text = options.lookup_text(query.lookup_text());
        let mut attempt: u32 = 0;

        loop {
            if options.is_cancelled() {
                return Err(ResolutionError::Cancelled);
            }

            let mut pass = match &options.cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(ResolutionError::Cancelled),
                    pass = self.gate.acquire(options.min_delay) => pass,
                },
                None => self.gate.acquire(options.min_delay).await,
            };

            // A concurrent batch may have resolved it while we waited
            if let Some(coordinate) = self.cache.get(key) {
                return Ok(coordinate);
            }

            pass.mark();
            let n = self.dispatched.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("Lookup #{} for '{}' (attempt {})", n, text, attempt + 1);

            let held = match options.pacing {
                Pacing::AfterCompletion => Some(pass),
                Pacing::FromDispatch => {
                    drop(pass);
                    None
                }
            };

            let response = self.geocoder.search(text.clone()).await;

            if let Some(mut pass) = held {
                pass.mark();
            }

            match first_coordinate(response) {
                Ok(coordinate) => {
                    debug!("Resolved '{}' to {}", query.lookup_text(), coordinate);
                    self.cache.insert(key.to_string(), coordinate);
                    return Ok(coordinate);
                }
                Err(ResolutionError::LookupFailed(reason)) if attempt < options.max_retries => {
                    attempt += 1;
                    warn!(
                        "Lookup for '{}' failed (attempt {}/{}): {}",
                        text,
                        attempt,
                        options.max_retries + 1,
                        reason
                    );
                }
                Err(e) => {
                    warn!("Could not resolve '{}': {}", query.lookup_text(), e);
                    return Err(e);
                }
            }
        }
    }
}

/// The first candidate is authoritative; the rest are discarded.
fn first_coordinate(response: Result<Vec<Candidate>, GeocodeError>) -> Outcome {
    let candidates = response.map_err(|e| ResolutionError::LookupFailed(e.to_string()))?;
    let first = candidates.first().ok_or(ResolutionError::NotFound)?;
    first
        .coordinate()
        .map_err(|e| ResolutionError::LookupFailed(format!("unusable candidate: {}", e)))
}

/// State of one `resolve_all` call.
struct Batch<'a, G> {
    resolver: &'a GeocodeResolver<G>,
    queries: std::vec::IntoIter<PlaceQuery>,
    /// Outcomes already decided in this batch, failures included
    decided: HashMap<String, Outcome>,
    options: ResolveOptions,
    total: usize,
    produced: usize,
    failed: usize,
}

impl<G: Geocoder> Batch<'_, G> {
    async fn resolve(&mut self, query: &PlaceQuery) -> Outcome {
        let key = query.key();

        if let Some(coordinate) = self.options.static_fallback.get_key(&key) {
            debug!("Fallback hit for '{}'", query.lookup_text());
            return Ok(coordinate);
        }
        if let Some(coordinate) = self.resolver.cache.get(&key) {
            debug!("Cache hit for '{}'", query.lookup_text());
            return Ok(coordinate);
        }
        if let Some(outcome) = self.decided.get(&key) {
            return outcome.clone();
        }

        let outcome = self.resolver.lookup(query, &key, &self.options).await;
        self.decided.insert(key, outcome.clone());
        outcome
    }

    fn finish(&self) {
        info!(
            "Resolved {}/{} place names ({} failed, {} lookups so far)",
            self.produced - self.failed,
            self.total,
            self.failed,
            self.resolver.dispatch_count()
        );
    }
}
