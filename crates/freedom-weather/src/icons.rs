use serde::{Deserialize, Serialize};

/// Every provider icon code the tile preloads a resource for.
pub const ALL_ICON_CODES: [&str; 18] = [
    "01d", "01n", //
    "02d", "02n", "03d", "03n", "04d", "04n", //
    "09d", "09n", "10d", "10n", "11d", "11n", //
    "13d", "13n", //
    "50d", "50n",
];

/// Icon buckets shared by the full view and the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConditionIcon {
    #[default]
    ClearDay,
    ClearNight,
    Cloudy,
    Rain,
    Snow,
    Mist,
}

impl ConditionIcon {
    /// Map an OpenWeatherMap icon code to a bucket.
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_code(code: &str) -> Self {
        match code {
            "01d" => Self::ClearDay,
            "01n" => Self::ClearNight,
            "02d" | "02n" | "03d" | "03n" | "04d" | "04n" => Self::Cloudy,
            // Thunderstorms share the rain artwork
            "09d" | "09n" | "10d" | "10n" | "11d" | "11n" => Self::Rain,
            "13d" | "13n" => Self::Snow,
            "50d" | "50n" => Self::Mist,
            _ => Self::ClearDay,
        }
    }

    /// Resource name for the bucket's artwork.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Self::ClearDay => "ic_weather_clear",
            Self::ClearNight => "ic_weather_clear_night",
            Self::Cloudy => "ic_weather_cloudy",
            Self::Rain => "ic_weather_rain",
            Self::Snow => "ic_weather_snow",
            Self::Mist => "ic_weather_mist",
        }
    }
}
