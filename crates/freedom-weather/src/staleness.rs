//! Cache staleness rules.
//!
//! All checks take `now` explicitly rather than reading the clock, so the
//! decisions are deterministic under test.
//!
//! Staleness is strictly greater than the threshold:
//!   age >  threshold → stale
//!   age == threshold → fresh
//!
//! A timestamp ahead of `now` was written under a skewed clock and is
//! treated as stale, so the next refresh overwrites it.

use chrono::{DateTime, Duration, Utc};

use crate::types::CachedReading;

/// Location older than this is re-resolved before fetching weather.
pub const LOCATION_STALE_THRESHOLD: Duration = Duration::hours(1);

/// A tile showing weather older than this asks for a refresh.
pub const TILE_STALE_THRESHOLD: Duration = Duration::minutes(5);

/// Interval of the periodic background refresh and of tile freshness.
pub const PERIODIC_REFRESH_INTERVAL: Duration = Duration::minutes(15);

/// Thresholds used by the refresh policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub location_max_age: Duration,
    pub tile_max_age: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            location_max_age: LOCATION_STALE_THRESHOLD,
            tile_max_age: TILE_STALE_THRESHOLD,
        }
    }
}

/// Which refresh path a reading calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPath {
    /// Re-resolve location, then fetch weather for the new coordinates.
    Location(LocationReason),
    /// Fetch weather for the cached coordinates.
    WeatherOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationReason {
    Forced,
    NeverResolved,
    Stale,
}

/// Age of a millisecond timestamp relative to `now`. Negative when the
/// timestamp lies in the future.
pub fn age_at(timestamp_ms: i64, now: DateTime<Utc>) -> Duration {
    Duration::milliseconds(now.timestamp_millis().saturating_sub(timestamp_ms))
}

pub fn is_stale_at(timestamp_ms: i64, max_age: Duration, now: DateTime<Utc>) -> bool {
    let age = age_at(timestamp_ms, now);
    age < Duration::zero() || age > max_age
}

impl StalenessPolicy {
    pub fn refresh_path(
        &self,
        reading: &CachedReading,
        force_location: bool,
        now: DateTime<Utc>,
    ) -> RefreshPath {
        if force_location {
            RefreshPath::Location(LocationReason::Forced)
        } else if !reading.has_resolved_location() {
            RefreshPath::Location(LocationReason::NeverResolved)
        } else if is_stale_at(reading.last_updated_location, self.location_max_age, now) {
            RefreshPath::Location(LocationReason::Stale)
        } else {
            RefreshPath::WeatherOnly
        }
    }

    /// Whether a tile rendering `reading` should request a refresh.
    pub fn tile_is_stale(&self, reading: &CachedReading, now: DateTime<Utc>) -> bool {
        is_stale_at(reading.last_updated, self.tile_max_age, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_769_776_496_000).unwrap()
    }

    fn reading_at(lat: f64, lon: f64, location_age: Duration) -> CachedReading {
        CachedReading {
            latitude: lat,
            longitude: lon,
            last_updated_location: (now() - location_age).timestamp_millis(),
            ..CachedReading::default()
        }
    }

    #[test]
    fn test_boundary_is_not_stale() {
        let ts = (now() - Duration::minutes(5)).timestamp_millis();
        assert!(!is_stale_at(ts, Duration::minutes(5), now()));
        assert!(is_stale_at(ts - 1, Duration::minutes(5), now()));
    }

    #[test]
    fn test_future_timestamp_is_stale() {
        let ts = (now() + Duration::minutes(10)).timestamp_millis();
        assert_eq!(age_at(ts, now()), Duration::minutes(-10));
        assert!(is_stale_at(ts, Duration::hours(1), now()));
        assert!(!is_stale_at(now().timestamp_millis(), Duration::zero(), now()));
    }

    #[test]
    fn test_skewed_location_stamp_is_re_resolved() {
        let policy = StalenessPolicy::default();
        let reading = reading_at(37.7, -122.4, -Duration::days(30));
        assert_eq!(
            policy.refresh_path(&reading, false, now()),
            RefreshPath::Location(LocationReason::Stale)
        );
    }

    #[test]
    fn test_fresh_location_takes_weather_only_path() {
        let policy = StalenessPolicy::default();
        let reading = reading_at(37.7, -122.4, Duration::minutes(30));
        assert_eq!(
            policy.refresh_path(&reading, false, now()),
            RefreshPath::WeatherOnly
        );
    }

    #[test]
    fn test_exactly_one_hour_is_still_fresh() {
        let policy = StalenessPolicy::default();
        let reading = reading_at(37.7, -122.4, Duration::hours(1));
        assert_eq!(
            policy.refresh_path(&reading, false, now()),
            RefreshPath::WeatherOnly
        );
    }

    #[test]
    fn test_stale_location_is_re_resolved() {
        let policy = StalenessPolicy::default();
        let reading = reading_at(37.7, -122.4, Duration::minutes(61));
        assert_eq!(
            policy.refresh_path(&reading, false, now()),
            RefreshPath::Location(LocationReason::Stale)
        );
    }

    #[test]
    fn test_sentinel_coordinates_always_re_resolve() {
        let policy = StalenessPolicy::default();
        let reading = reading_at(0.0, 0.0, Duration::seconds(1));
        assert_eq!(
            policy.refresh_path(&reading, false, now()),
            RefreshPath::Location(LocationReason::NeverResolved)
        );
    }

    #[test]
    fn test_force_wins() {
        let policy = StalenessPolicy::default();
        let reading = reading_at(37.7, -122.4, Duration::seconds(1));
        assert_eq!(
            policy.refresh_path(&reading, true, now()),
            RefreshPath::Location(LocationReason::Forced)
        );
    }

    #[test]
    fn test_tile_staleness() {
        let policy = StalenessPolicy::default();
        let mut reading = CachedReading::default();

        reading.last_updated = (now() - Duration::minutes(4)).timestamp_millis();
        assert!(!policy.tile_is_stale(&reading, now()));

        reading.last_updated = (now() - Duration::minutes(6)).timestamp_millis();
        assert!(policy.tile_is_stale(&reading, now()));

        // Never updated
        reading.last_updated = 0;
        assert!(policy.tile_is_stale(&reading, now()));
    }
}
