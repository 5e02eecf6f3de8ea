//! Glanceable tile: renders straight from the cache and asks for a
//! background refresh when what it shows is too old.

use std::fmt;
use std::sync::Arc;

use chrono::FixedOffset;
use serde::Serialize;

use crate::format::{
    condition_label, format_celsius, format_fahrenheit, needs_compact_temperature,
    updated_label, updated_label_in,
};
use crate::icons::{ConditionIcon, ALL_ICON_CODES};
use crate::orchestrator::RefreshOrchestrator;
use crate::staleness::PERIODIC_REFRESH_INTERVAL;
use crate::types::RefreshTrigger;

const NEVER_UPDATED_LABEL: &str = "Updated: --:--";

/// Everything a tile surface needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileSnapshot {
    pub location: String,
    pub celsius_text: String,
    pub fahrenheit_text: String,
    /// Use the smaller temperature font.
    pub compact: bool,
    pub icon: ConditionIcon,
    pub icon_code: String,
    pub condition: String,
    pub updated_text: String,
    pub stale: bool,
    /// A background refresh was started by this render.
    pub refresh_requested: bool,
    /// How long the host may show this frame before asking again.
    pub freshness_interval_secs: u64,
}

impl fmt::Display for TileSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} / {}, {} ({})",
            self.location, self.celsius_text, self.fahrenheit_text, self.condition, self.updated_text
        )
    }
}

pub struct TileService {
    orchestrator: Arc<RefreshOrchestrator>,
    utc_offset: Option<FixedOffset>,
}

impl TileService {
    pub fn new(orchestrator: Arc<RefreshOrchestrator>) -> Self {
        Self {
            orchestrator,
            utc_offset: None,
        }
    }

    /// Render times at a fixed offset instead of the local zone.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = Some(offset);
        self
    }

    /// Build a frame from cached values. Never waits on the network; a
    /// stale frame triggers a refresh whose result shows up next render.
    pub fn render(&self) -> TileSnapshot {
        let cache = self.orchestrator.cache();
        let reading = cache.load().unwrap_or_else(|e| {
            tracing::warn!("Tile falling back to last observed reading: {}", e);
            cache.current()
        });

        let now = self.orchestrator.clock().now();
        let stale = self.orchestrator.policy().tile_is_stale(&reading, now);
        let refresh_requested = stale
            && self
                .orchestrator
                .spawn_refresh(RefreshTrigger::WidgetStalenessDetected, false)
                .is_some();
        if stale {
            tracing::debug!(
                "Tile data stale (last_updated={}), refresh requested: {}",
                reading.last_updated,
                refresh_requested
            );
        }

        let celsius_text = format_celsius(reading.temperature_celsius);
        let fahrenheit_text = format_fahrenheit(reading.temperature_fahrenheit);
        let compact = needs_compact_temperature(&celsius_text, &fahrenheit_text);

        let updated_text = if reading.last_updated == 0 {
            NEVER_UPDATED_LABEL.to_string()
        } else {
            match &self.utc_offset {
                Some(offset) => updated_label_in(reading.last_updated, offset),
                None => updated_label(reading.last_updated),
            }
        };

        TileSnapshot {
            location: reading.location_name,
            celsius_text,
            fahrenheit_text,
            compact,
            icon: ConditionIcon::from_code(&reading.condition_icon_code),
            icon_code: reading.condition_icon_code,
            condition: condition_label(&reading.condition_text),
            updated_text,
            stale,
            refresh_requested,
            freshness_interval_secs: PERIODIC_REFRESH_INTERVAL.num_seconds() as u64,
        }
    }

    /// Resource id and artwork for every icon code a frame may reference.
    pub fn icon_resources() -> Vec<(&'static str, &'static str)> {
        ALL_ICON_CODES
            .iter()
            .map(|code| (*code, ConditionIcon::from_code(code).resource_name()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PreferencesCache;
    use crate::clock::ManualClock;
    use crate::geocode::NoGeocoder;
    use crate::location::{DeviceLocationResolver, FixedPosition};
    use crate::provider::WeatherSource;
    use crate::store::MemoryKeyValueStore;
    use crate::types::{Coordinates, CurrentConditions, ResolvedLocation, WeatherError};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_769_776_496_000).unwrap()
    }

    #[derive(Default)]
    struct CountingWeather {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherSource for CountingWeather {
        async fn current_conditions(
            &self,
            _coordinates: Coordinates,
        ) -> Result<CurrentConditions, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CurrentConditions {
                temperature_celsius: -12.4,
                min_temperature: -15.0,
                max_temperature: -8.0,
                icon_code: "13n".into(),
                condition_text: "snow".into(),
            })
        }
    }

    fn tile_with_weather_age(age: Duration) -> (Arc<CountingWeather>, TileService) {
        let cache =
            Arc::new(PreferencesCache::new(Arc::new(MemoryKeyValueStore::new())).unwrap());
        let stamp = (now() - age).timestamp_millis();
        cache
            .save_location(
                &ResolvedLocation {
                    coordinates: Coordinates::new(64.84, -147.72),
                    place_name: "Fairbanks".into(),
                },
                stamp,
            )
            .unwrap();
        cache
            .save_weather(
                &CurrentConditions {
                    temperature_celsius: -3.0,
                    min_temperature: -6.0,
                    max_temperature: 1.0,
                    icon_code: "04d".into(),
                    condition_text: "overcast clouds".into(),
                },
                stamp,
            )
            .unwrap();

        let weather = Arc::new(CountingWeather::default());
        let resolver = DeviceLocationResolver::new(
            Arc::new(FixedPosition::new(Some(Coordinates::new(64.84, -147.72)))),
            Arc::new(NoGeocoder),
        );
        let orchestrator = RefreshOrchestrator::new(cache, Arc::new(resolver), weather.clone())
            .with_clock(Arc::new(ManualClock::new(now())));
        let tile = TileService::new(Arc::new(orchestrator))
            .with_utc_offset(FixedOffset::east_opt(0).unwrap());
        (weather, tile)
    }

    #[tokio::test]
    async fn test_fresh_tile_renders_cached_values() {
        let (weather, tile) = tile_with_weather_age(Duration::minutes(2));

        let frame = tile.render();

        assert_eq!(frame.location, "Fairbanks");
        assert_eq!(frame.celsius_text, "-3°C");
        assert_eq!(frame.fahrenheit_text, "27°F");
        assert!(!frame.compact);
        assert_eq!(frame.icon, ConditionIcon::Cloudy);
        assert_eq!(frame.icon_code, "04d");
        assert_eq!(frame.condition, "Overcast clouds");
        assert_eq!(frame.updated_text, "Updated: 12:32");
        assert!(!frame.stale);
        assert!(!frame.refresh_requested);
        assert_eq!(frame.freshness_interval_secs, 900);

        tokio::task::yield_now().await;
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_tile_renders_immediately_and_requests_refresh() {
        let (weather, tile) = tile_with_weather_age(Duration::minutes(6));

        let frame = tile.render();

        // Old values are still shown
        assert_eq!(frame.celsius_text, "-3°C");
        assert!(frame.stale);
        assert!(frame.refresh_requested);

        let mut status = tile.orchestrator.status();
        status.wait_for(|s| !s.loading && s.last_trigger.is_some()).await.unwrap();
        assert_eq!(weather.calls.load(Ordering::SeqCst), 1);

        let frame = tile.render();
        assert_eq!(frame.celsius_text, "-12°C");
        assert_eq!(frame.icon, ConditionIcon::Snow);
        assert!(!frame.stale);
    }

    #[test]
    fn test_stale_tile_outside_runtime_does_not_panic() {
        let (_weather, tile) = tile_with_weather_age(Duration::hours(3));
        let frame = tile.render();
        assert!(frame.stale);
        assert!(!frame.refresh_requested);
    }

    #[test]
    fn test_never_updated_label() {
        let cache =
            Arc::new(PreferencesCache::new(Arc::new(MemoryKeyValueStore::new())).unwrap());
        let orchestrator = RefreshOrchestrator::new(
            cache,
            Arc::new(DeviceLocationResolver::new(
                Arc::new(FixedPosition::new(None)),
                Arc::new(NoGeocoder),
            )),
            Arc::new(CountingWeather::default()),
        );
        let frame = TileService::new(Arc::new(orchestrator)).render();
        assert_eq!(frame.updated_text, "Updated: --:--");
        assert_eq!(frame.location, "Unknown");
        assert_eq!(frame.celsius_text, "20°C");
        assert_eq!(frame.fahrenheit_text, "68°F");
    }

    #[test]
    fn test_compact_font_for_long_labels() {
        assert!(needs_compact_temperature("-12°C", "10°F"));
        assert!(needs_compact_temperature("38°C", "100°F"));
        assert!(!needs_compact_temperature("18°C", "64°F"));
    }

    #[test]
    fn test_icon_resources_cover_all_codes() {
        let resources = TileService::icon_resources();
        assert_eq!(resources.len(), 18);
        assert!(resources.contains(&("01n", "ic_weather_clear_night")));
        assert!(resources.contains(&("50d", "ic_weather_mist")));
    }
}
