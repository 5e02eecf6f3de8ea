//! Reverse geocoding: convert coordinates to human-readable place names.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::types::Coordinates;

pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "FreedomWeather/0.1.0";

/// Turns coordinates into a place name. `None` means "could not resolve";
/// callers fall back to a coordinate string.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, coordinates: Coordinates) -> Option<String>;
}

/// Geocoder that never resolves anything, for when lookups are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGeocoder;

#[async_trait]
impl ReverseGeocoder for NoGeocoder {
    async fn reverse(&self, _coordinates: Coordinates) -> Option<String> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_base_url(NOMINATIM_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    /// Only the place itself is returned (no state/country suffix) so it
    /// fits on a watch face.
    async fn reverse(&self, coordinates: Coordinates) -> Option<String> {
        let url = format!("{}/reverse", self.base_url);

        let response = match self
            .client
            .get(&url)
            .query(&[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return None;
        }

        let body: NominatimResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Reverse geocode parse error: {}", e);
                return None;
            }
        };

        let addr = body.address?;

        // Prefer city > town > village > municipality
        let place = addr
            .city
            .or(addr.town)
            .or(addr.village)
            .or(addr.municipality)
            .filter(|p| !p.trim().is_empty())?;

        tracing::info!("Reverse geocoded to: {}", place);
        Some(place)
    }
}
