use serde::{Deserialize, Serialize};


pub const DEFAULT_LOCATION_NAME: &str = "Unknown";
pub const DEFAULT_TEMP_C: f64 = 20.0;
pub const DEFAULT_TEMP_F: f64 = 68.0;
pub const DEFAULT_MIN_TEMP: f64 = 15.0;
pub const DEFAULT_MAX_TEMP: f64 = 25.0;
pub const DEFAULT_ICON_CODE: &str = "01d";
pub const DEFAULT_CONDITION_TEXT: &str = "Unknown";

/// What triggered a refresh. Used for logging and for the tile's own
/// staleness requests; the refresh policy itself only looks at the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    AppForeground,
    PeriodicTimer,
    ManualUserRequest,
    WidgetStalenessDetected,
}

impl RefreshTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppForeground => "app_foreground",
            Self::PeriodicTimer => "periodic_timer",
            Self::ManualUserRequest => "manual_user_request",
            Self::WidgetStalenessDetected => "widget_staleness_detected",
        }
    }
}

impl std::fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// (0,0) marks "no location ever resolved".
    pub fn is_sentinel(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// A location as returned by the resolver: coordinates plus a place name
/// (either reverse-geocoded or a formatted coordinate string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    pub place_name: String,
}

/// Current conditions as reported by the weather provider, in Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_celsius: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub icon_code: String,
    pub condition_text: String,
}

/// The persisted snapshot of what we last knew.
///
/// Timestamps are epoch milliseconds; 0 means "never".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedReading {
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature_celsius: f64,
    pub temperature_fahrenheit: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub condition_icon_code: String,
    pub condition_text: String,
    pub last_updated: i64,
    pub last_updated_location: i64,
}

impl Default for CachedReading {
    fn default() -> Self {
        Self {
            location_name: DEFAULT_LOCATION_NAME.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            temperature_celsius: DEFAULT_TEMP_C,
            temperature_fahrenheit: DEFAULT_TEMP_F,
            min_temperature: DEFAULT_MIN_TEMP,
            max_temperature: DEFAULT_MAX_TEMP,
            condition_icon_code: DEFAULT_ICON_CODE.to_string(),
            condition_text: DEFAULT_CONDITION_TEXT.to_string(),
            last_updated: 0,
            last_updated_location: 0,
        }
    }
}

impl CachedReading {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn has_resolved_location(&self) -> bool {
        !self.coordinates().is_sentinel()
    }
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable")]
    Unavailable,
    #[error("Location service error: {0}")]
    ServiceError(String),
}

impl LocationError {
    /// Short string shown in place of the place name.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Location permission denied",
            Self::Unavailable => "Location unavailable",
            Self::ServiceError(_) => "Location service error",
        }
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) => "Weather service unreachable",
            Self::MalformedResponse(_) => "Weather service returned bad data",
        }
    }
}

/// Preference storage errors. Not expected in normal operation.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Type mismatch for key {key}: expected {expected}")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
    },
}
