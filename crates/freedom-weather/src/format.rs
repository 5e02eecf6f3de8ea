//! Text formatting shared by the full view and the tile.

use chrono::{DateTime, TimeZone, Utc};

use crate::types::Coordinates;

/// Longest temperature label (in characters) that still fits the large font.
const COMPACT_LABEL_THRESHOLD: usize = 4;

pub fn format_celsius(celsius: f64) -> String {
    format!("{:.0}°C", celsius)
}

pub fn format_fahrenheit(fahrenheit: f64) -> String {
    format!("{:.0}°F", fahrenheit)
}

/// Coordinate fallback used when reverse geocoding fails.
pub fn coordinate_label(coordinates: Coordinates) -> String {
    format!("{:.2}, {:.2}", coordinates.latitude, coordinates.longitude)
}

/// Condition text with its first letter upper-cased ("light rain" -> "Light rain").
pub fn condition_label(text: &str) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => crate::types::DEFAULT_CONDITION_TEXT.to_string(),
    }
}

/// True when either label is too long for the large temperature font.
pub fn needs_compact_temperature(celsius_label: &str, fahrenheit_label: &str) -> bool {
    celsius_label.chars().count() > COMPACT_LABEL_THRESHOLD
        || fahrenheit_label.chars().count() > COMPACT_LABEL_THRESHOLD
}

/// "Updated: HH:mm" rendered in the given time zone.
pub fn updated_label_in<Tz>(last_updated_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let instant = DateTime::<Utc>::from_timestamp_millis(last_updated_ms).unwrap_or_default();
    format!("Updated: {}", instant.with_timezone(tz).format("%H:%M"))
}

/// "Updated: HH:mm" in the device's local time.
pub fn updated_label(last_updated_ms: i64) -> String {
    updated_label_in(last_updated_ms, &chrono::Local)
}
