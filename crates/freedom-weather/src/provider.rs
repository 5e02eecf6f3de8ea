//! Current-conditions client for the OpenWeatherMap API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::types::{
    Coordinates, CurrentConditions, WeatherError, DEFAULT_CONDITION_TEXT, DEFAULT_ICON_CODE,
};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";
const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "FreedomWeather/0.1.0";

/// Anything that can report current conditions for a pair of coordinates.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current_conditions(
        &self,
        coordinates: Coordinates,
    ) -> Result<CurrentConditions, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    main: OpenWeatherMain,
    #[serde(default)]
    weather: Vec<OpenWeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherCondition {
    icon: Option<String>,
    main: Option<String>,
}

impl From<OpenWeatherResponse> for CurrentConditions {
    fn from(response: OpenWeatherResponse) -> Self {
        let first = response.weather.into_iter().next();
        let (icon, text) = match first {
            Some(c) => (c.icon, c.main),
            None => (None, None),
        };

        Self {
            temperature_celsius: response.main.temp,
            min_temperature: response.main.temp_min,
            max_temperature: response.main.temp_max,
            icon_code: icon.unwrap_or_else(|| DEFAULT_ICON_CODE.to_string()),
            condition_text: text.unwrap_or_else(|| DEFAULT_CONDITION_TEXT.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, WeatherError> {
        Self::with_base_url(OPENWEATHER_BASE_URL, api_key)
    }

    /// Point the client at a different host (self-hosted proxy, mock server).
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    #[instrument(skip(self), level = "info")]
    async fn current_conditions(
        &self,
        coordinates: Coordinates,
    ) -> Result<CurrentConditions, WeatherError> {
        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let parsed: OpenWeatherResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Unparseable weather response: {}", e);
            WeatherError::MalformedResponse(e.to_string())
        })?;

        let conditions = CurrentConditions::from(parsed);
        tracing::info!(
            "Fetched weather: {:.1}°C ({}), {}",
            conditions.temperature_celsius,
            conditions.icon_code,
            conditions.condition_text
        );
        Ok(conditions)
    }
}
