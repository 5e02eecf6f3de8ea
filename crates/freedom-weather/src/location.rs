//! Location resolution: raw coordinates plus a place name.

use std::sync::Arc;

use async_trait::async_trait;

use crate::format::coordinate_label;
use crate::geocode::ReverseGeocoder;
use crate::types::{Coordinates, LocationError, ResolvedLocation};

/// Where the device currently is, without any naming.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Resolves the device's location to coordinates and a display name.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn current_location(&self) -> Result<ResolvedLocation, LocationError>;
}

/// Position pinned in configuration. Hosts without a positioning service
/// use this; no pinned position means the location is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPosition {
    coordinates: Option<Coordinates>,
}

impl FixedPosition {
    pub fn new(coordinates: Option<Coordinates>) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        self.coordinates.ok_or(LocationError::Unavailable)
    }
}

/// Combines a position source with a reverse geocoder. A failed lookup
/// never fails the call; the name falls back to "lat, lon".
pub struct DeviceLocationResolver {
    source: Arc<dyn PositionSource>,
    geocoder: Arc<dyn ReverseGeocoder>,
}

impl DeviceLocationResolver {
    pub fn new(source: Arc<dyn PositionSource>, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        Self { source, geocoder }
    }
}

#[async_trait]
impl LocationResolver for DeviceLocationResolver {
    async fn current_location(&self) -> Result<ResolvedLocation, LocationError> {
        let coordinates = self.source.current_position().await.map_err(|e| {
            tracing::warn!("Failed to get position: {}", e);
            e
        })?;
        tracing::debug!(
            "Position received - lat: {}, lon: {}",
            coordinates.latitude,
            coordinates.longitude
        );

        let place_name = match self.geocoder.reverse(coordinates).await {
            Some(name) => name,
            None => {
                let fallback = coordinate_label(coordinates);
                tracing::debug!("Geocoding failed, using coordinates: {}", fallback);
                fallback
            }
        };

        Ok(ResolvedLocation {
            coordinates,
            place_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::NoGeocoder;

    struct NamedGeocoder(&'static str);

    #[async_trait]
    impl ReverseGeocoder for NamedGeocoder {
        async fn reverse(&self, _coordinates: Coordinates) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    struct DeniedSource;

    #[async_trait]
    impl PositionSource for DeniedSource {
        async fn current_position(&self) -> Result<Coordinates, LocationError> {
            Err(LocationError::PermissionDenied)
        }
    }

    #[tokio::test]
    async fn test_fixed_position_without_coordinates_is_unavailable() {
        let source = FixedPosition::new(None);
        assert_eq!(
            source.current_position().await,
            Err(LocationError::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_resolver_uses_geocoded_name() {
        let resolver = DeviceLocationResolver::new(
            Arc::new(FixedPosition::new(Some(Coordinates::new(37.77, -122.42)))),
            Arc::new(NamedGeocoder("San Francisco")),
        );
        let location = resolver.current_location().await.unwrap();
        assert_eq!(location.place_name, "San Francisco");
        assert_eq!(location.coordinates, Coordinates::new(37.77, -122.42));
    }

    #[tokio::test]
    async fn test_resolver_falls_back_to_coordinates() {
        let resolver = DeviceLocationResolver::new(
            Arc::new(FixedPosition::new(Some(Coordinates::new(51.5074, -0.1278)))),
            Arc::new(NoGeocoder),
        );
        let location = resolver.current_location().await.unwrap();
        assert_eq!(location.place_name, "51.51, -0.13");
    }

    #[tokio::test]
    async fn test_resolver_propagates_position_errors() {
        let resolver = DeviceLocationResolver::new(Arc::new(DeniedSource), Arc::new(NoGeocoder));
        assert_eq!(
            resolver.current_location().await,
            Err(LocationError::PermissionDenied)
        );
    }
}
