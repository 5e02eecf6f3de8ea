use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const APP_DIR_NAME: &str = "freedomweather";
const CONFIG_FILE_NAME: &str = "config.toml";
const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key. Falls back to `OPENWEATHER_API_KEY`.
    pub api_key: Option<String>,

    pub base_url: String,

    /// Periodic refresh interval in minutes
    pub refresh_minutes: u32,

    /// Cached location older than this is re-resolved
    pub location_stale_minutes: u32,

    /// Tile data older than this triggers a background refresh
    pub tile_stale_minutes: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org".to_string(),
            refresh_minutes: 15,
            location_stale_minutes: 60,
            tile_stale_minutes: 5,
        }
    }
}

impl WeatherConfig {
    /// API key from the file, else from the environment. Blank keys count
    /// as missing.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Fixed position used on hosts without a positioning service
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Turn coordinates into a place name via Nominatim
    pub reverse_geocoding: bool,

    pub geocoder_url: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            reverse_geocoding: true,
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
        }
    }
}

impl LocationConfig {
    /// Both coordinates, when both are set.
    pub fn fixed_position(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Preferences database path. Defaults to the data directory.
    pub preferences_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn effective_preferences_path(&self) -> PathBuf {
        self.preferences_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME)
                .join("preferences.db")
        })
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.resolved_api_key().is_none() {
            result.add_warning(
                "weather.api_key",
                format!("No API key configured (set it here or in {})", API_KEY_ENV),
            );
        }

        if self.weather.refresh_minutes == 0 {
            result.add_error(
                "weather.refresh_minutes",
                "Refresh interval must be greater than 0",
            );
        } else if self.weather.refresh_minutes > 1440 {
            result.add_warning(
                "weather.refresh_minutes",
                "Weather refresh interval is more than 24 hours",
            );
        }

        if self.weather.location_stale_minutes == 0 {
            result.add_warning(
                "weather.location_stale_minutes",
                "Location will be re-resolved on every refresh",
            );
        }

        if self.weather.tile_stale_minutes == 0 {
            result.add_warning(
                "weather.tile_stale_minutes",
                "Every tile render will request a refresh",
            );
        }

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    result.add_error("location.latitude", "Latitude must be within -90..90");
                }
                if !(-180.0..=180.0).contains(&lon) {
                    result.add_error("location.longitude", "Longitude must be within -180..180");
                }
            }
            (None, None) => {
                result.add_warning(
                    "location",
                    "No position configured - location will be unavailable",
                );
            }
            _ => {
                result.add_error(
                    "location",
                    "Latitude and longitude must be set together",
                );
            }
        }

        if self.location.reverse_geocoding {
            Self::validate_url(
                &self.location.geocoder_url,
                "location.geocoder_url",
                &mut result,
            );
        }

        result
    }

    fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }
}
