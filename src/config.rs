use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::Coordinate;
use crate::resolver::{FallbackTable, Pacing, ResolveOptions};

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub geocoder: GeocoderConfig,
    pub resolver: ResolverConfig,
    /// Known coordinates consulted before any network lookup
    pub fallback: BTreeMap<String, Coordinate>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Appended to every lookup, e.g. "RS, Brazil"
    pub query_suffix: Option<String>,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: format!("drawmap/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 10,
            query_suffix: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResolverConfig {
    pub min_delay_ms: u64,
    pub max_retries: u32,
    pub pacing: Pacing,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_retries: 0,
            pacing: Pacing::default(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn fallback_table(&self) -> FallbackTable {
        self.fallback
            .iter()
            .map(|(name, coordinate)| (name.as_str(), *coordinate))
            .collect()
    }

    /// Resolver options described by this config (no progress hook or cancellation).
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            min_delay: Duration::from_millis(self.resolver.min_delay_ms),
            max_retries: self.resolver.max_retries,
            pacing: self.resolver.pacing,
            static_fallback: self.fallback_table(),
            query_suffix: self.geocoder.query_suffix.clone(),
            ..ResolveOptions::default()
        }
    }
}
