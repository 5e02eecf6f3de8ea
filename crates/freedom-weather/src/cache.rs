//! Typed preferences cache with reactive observation.
//!
//! Reads apply the documented defaults for any key that was never written.
//! Every successful write is pushed to subscribers through a `watch` channel.

use std::sync::Arc;

use tokio::sync::watch;

use crate::store::{KeyValueStore, PrefKey, PrefValue};
use crate::types::{
    CacheError, CachedReading, CurrentConditions, ResolvedLocation, DEFAULT_CONDITION_TEXT,
    DEFAULT_ICON_CODE, DEFAULT_LOCATION_NAME, DEFAULT_MAX_TEMP, DEFAULT_MIN_TEMP, DEFAULT_TEMP_C,
    DEFAULT_TEMP_F,
};
use crate::units::celsius_to_fahrenheit;

pub struct PreferencesCache {
    store: Arc<dyn KeyValueStore>,
    tx: watch::Sender<CachedReading>,
}

impl PreferencesCache {
    /// Wrap a store, reading its current contents as the initial value.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Result<Self, CacheError> {
        let initial = read_reading(store.as_ref())?;
        let (tx, _rx) = watch::channel(initial);
        Ok(Self { store, tx })
    }

    /// Read the reading straight from the backing store.
    pub fn load(&self) -> Result<CachedReading, CacheError> {
        read_reading(self.store.as_ref())
    }

    /// Last reading observed by this cache, without touching the store.
    pub fn current(&self) -> CachedReading {
        self.tx.borrow().clone()
    }

    /// Receiver that sees every write made through this cache.
    pub fn subscribe(&self) -> watch::Receiver<CachedReading> {
        self.tx.subscribe()
    }

    /// Persist a resolved location and stamp `last_updated_location`.
    pub fn save_location(
        &self,
        location: &ResolvedLocation,
        now_ms: i64,
    ) -> Result<CachedReading, CacheError> {
        self.store.apply(&[
            (
                PrefKey::LocationName,
                PrefValue::Text(location.place_name.clone()),
            ),
            (
                PrefKey::Latitude,
                PrefValue::Double(location.coordinates.latitude),
            ),
            (
                PrefKey::Longitude,
                PrefValue::Double(location.coordinates.longitude),
            ),
            (PrefKey::LastUpdatedLocation, PrefValue::Long(now_ms)),
        ])?;

        tracing::debug!(
            "Saved location {} ({}, {})",
            location.place_name,
            location.coordinates.latitude,
            location.coordinates.longitude
        );
        self.publish()
    }

    /// Persist provider conditions and stamp `last_updated`.
    /// Fahrenheit is always derived here from the Celsius reading.
    pub fn save_weather(
        &self,
        conditions: &CurrentConditions,
        now_ms: i64,
    ) -> Result<CachedReading, CacheError> {
        let fahrenheit = celsius_to_fahrenheit(conditions.temperature_celsius);

        self.store.apply(&[
            (
                PrefKey::TempC,
                PrefValue::Double(conditions.temperature_celsius),
            ),
            (PrefKey::TempF, PrefValue::Double(fahrenheit)),
            (
                PrefKey::MinTemp,
                PrefValue::Double(conditions.min_temperature),
            ),
            (
                PrefKey::MaxTemp,
                PrefValue::Double(conditions.max_temperature),
            ),
            (
                PrefKey::ConditionIcon,
                PrefValue::Text(conditions.icon_code.clone()),
            ),
            (
                PrefKey::ConditionText,
                PrefValue::Text(conditions.condition_text.clone()),
            ),
            (PrefKey::LastUpdated, PrefValue::Long(now_ms)),
        ])?;

        tracing::debug!(
            "Saved weather: {:.1}°C, icon {}, {}",
            conditions.temperature_celsius,
            conditions.icon_code,
            conditions.condition_text
        );
        self.publish()
    }

    fn publish(&self) -> Result<CachedReading, CacheError> {
        let reading = self.load()?;
        self.tx.send_replace(reading.clone());
        Ok(reading)
    }
}

fn read_reading(store: &dyn KeyValueStore) -> Result<CachedReading, CacheError> {
    Ok(CachedReading {
        location_name: store
            .get_text(PrefKey::LocationName)?
            .unwrap_or_else(|| DEFAULT_LOCATION_NAME.to_string()),
        latitude: store.get_double(PrefKey::Latitude)?.unwrap_or(0.0),
        longitude: store.get_double(PrefKey::Longitude)?.unwrap_or(0.0),
        temperature_celsius: store.get_double(PrefKey::TempC)?.unwrap_or(DEFAULT_TEMP_C),
        temperature_fahrenheit: store.get_double(PrefKey::TempF)?.unwrap_or(DEFAULT_TEMP_F),
        min_temperature: store.get_double(PrefKey::MinTemp)?.unwrap_or(DEFAULT_MIN_TEMP),
        max_temperature: store.get_double(PrefKey::MaxTemp)?.unwrap_or(DEFAULT_MAX_TEMP),
        condition_icon_code: store
            .get_text(PrefKey::ConditionIcon)?
            .unwrap_or_else(|| DEFAULT_ICON_CODE.to_string()),
        condition_text: store
            .get_text(PrefKey::ConditionText)?
            .unwrap_or_else(|| DEFAULT_CONDITION_TEXT.to_string()),
        last_updated: store.get_long(PrefKey::LastUpdated)?.unwrap_or(0),
        last_updated_location: store.get_long(PrefKey::LastUpdatedLocation)?.unwrap_or(0),
    })
}
