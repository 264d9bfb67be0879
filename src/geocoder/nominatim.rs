//! Nominatim search client.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{Candidate, GeocodeError, Geocoder};
use crate::config::GeocoderConfig;

/// Only the first candidate is ever used, so ask for one.
const RESULT_LIMIT: &str = "1";

/// Forward geocoder backed by a Nominatim-compatible `/search` endpoint
#[derive(Clone)]
pub struct NominatimGeocoder {
    client: Client,
    search_url: Url,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            search_url: search_url(&config.base_url)?,
        })
    }

    /// Full request URL for a query
    pub fn request_url(&self, query: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("limit", RESULT_LIMIT)
            .append_pair("q", query);
        url
    }

    async fn search_once(&self, query: String) -> Result<Vec<Candidate>, GeocodeError> {
        let url = self.request_url(&query);
        debug!("Nominatim search: {}", query);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_candidates(&body)
    }
}

impl Geocoder for NominatimGeocoder {
    fn search(&self, query: String) -> BoxFuture<'_, Result<Vec<Candidate>, GeocodeError>> {
        Box::pin(self.search_once(query))
    }
}

/// `{base}/search`, tolerating a base URL with or without a trailing slash.
fn search_url(base: &str) -> Result<Url, GeocodeError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| GeocodeError::Malformed(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .push("search");
    Ok(url)
}

/// Parse a Nominatim JSON array body
pub fn parse_candidates(body: &str) -> Result<Vec<Candidate>, GeocodeError> {
    serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))
}
