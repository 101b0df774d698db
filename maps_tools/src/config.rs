use std::time::Duration;

use fdg_common::Secret;
use log::*;

const DEFAULT_MAPS_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
const DEFAULT_MAPS_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct MapsConfig {
    /// Base URL of the distance service, without a trailing slash
    pub base_url: String,
    pub api_key: Secret<String>,
    /// Transport-level timeout. Callers usually apply a shorter, softer timeout of their own.
    pub timeout: Duration,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_MAPS_BASE_URL.to_string(), api_key: Secret::default(), timeout: DEFAULT_MAPS_TIMEOUT }
    }
}

impl MapsConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("FDG_MAPS_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                info!("🗺️ FDG_MAPS_BASE_URL not set, using {DEFAULT_MAPS_BASE_URL}");
                DEFAULT_MAPS_BASE_URL.to_string()
            });
        let api_key = Secret::new(std::env::var("FDG_MAPS_API_KEY").unwrap_or_else(|_| {
            warn!("🗺️ FDG_MAPS_API_KEY not set. Distance lookups will fail and fall back to the estimated fee.");
            String::default()
        }));
        Self { base_url, api_key, ..Default::default() }
    }
}
