//! Weather engine for FreedomWeather
//!
//! Resolves the device location, fetches current conditions from
//! OpenWeatherMap and keeps the last reading in a persistent preferences
//! cache. The refresh orchestrator decides per trigger whether the cached
//! location can be reused; the tile and the interactive view only ever read
//! the cache.

pub mod types;
pub mod units;
pub mod icons;
pub mod format;
pub mod clock;
pub mod store;
pub mod cache;
pub mod provider;
pub mod geocode;
pub mod location;
pub mod staleness;
pub mod refresh_state;
pub mod orchestrator;
pub mod retry;
pub mod connectivity;
pub mod scheduler;
pub mod tile;
pub mod view_model;

pub use types::*;
pub use cache::PreferencesCache;
pub use clock::{Clock, SystemClock};
pub use connectivity::{AlwaysOnline, Connectivity, TcpConnectivity};
pub use geocode::{NoGeocoder, NominatimGeocoder, ReverseGeocoder};
pub use icons::ConditionIcon;
pub use location::{DeviceLocationResolver, FixedPosition, LocationResolver, PositionSource};
pub use orchestrator::{RefreshFailure, RefreshOrchestrator, RefreshOutcome, RefreshStatus, WidgetEvent};
pub use provider::{OpenWeatherClient, WeatherSource};
pub use scheduler::PeriodicRefresh;
pub use staleness::StalenessPolicy;
pub use store::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use tile::{TileService, TileSnapshot};
pub use view_model::{SelectionState, ViewSnapshot, WeatherViewModel};
