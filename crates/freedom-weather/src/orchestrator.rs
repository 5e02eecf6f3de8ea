//! Refresh orchestration: the single place that decides whether and how to
//! refresh weather data.
//!
//! Per trigger it reads the cache, picks a path from the staleness policy,
//! resolves location when needed (persisting it before any weather fetch),
//! fetches weather, persists it, then clears the loading flag and notifies
//! widget observers regardless of outcome.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::cache::PreferencesCache;
use crate::clock::{Clock, SystemClock};
use crate::location::LocationResolver;
use crate::provider::WeatherSource;
use crate::refresh_state::RefreshGate;
use crate::staleness::{RefreshPath, StalenessPolicy};
use crate::types::{CacheError, CachedReading, LocationError, RefreshTrigger, WeatherError};

const WIDGET_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum RefreshFailure {
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl RefreshFailure {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Location(e) => e.user_message(),
            Self::Weather(e) => e.user_message(),
            Self::Cache(_) => "Could not save weather data",
        }
    }
}

#[derive(Debug)]
pub enum RefreshOutcome {
    /// Weather was fetched and persisted; carries the new cached reading.
    Succeeded(CachedReading),
    Failed(RefreshFailure),
    /// Another refresh was already running; this trigger was folded into it.
    Coalesced,
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn failure(&self) -> Option<&RefreshFailure> {
        match self {
            Self::Failed(f) => Some(f),
            _ => None,
        }
    }
}

/// Observable refresh status for presentation surfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshStatus {
    pub loading: bool,
    /// Shown in place of the place name after a location failure.
    pub location_message: Option<String>,
    pub last_error: Option<String>,
    pub last_trigger: Option<RefreshTrigger>,
}

/// Sent to widget surfaces after every refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetEvent {
    CacheMayHaveChanged,
}

pub struct RefreshOrchestrator {
    cache: Arc<PreferencesCache>,
    locations: Arc<dyn LocationResolver>,
    weather: Arc<dyn WeatherSource>,
    clock: Arc<dyn Clock>,
    policy: StalenessPolicy,
    gate: RefreshGate,
    status: watch::Sender<RefreshStatus>,
    widgets: broadcast::Sender<WidgetEvent>,
}

impl RefreshOrchestrator {
    pub fn new(
        cache: Arc<PreferencesCache>,
        locations: Arc<dyn LocationResolver>,
        weather: Arc<dyn WeatherSource>,
    ) -> Self {
        let (status, _) = watch::channel(RefreshStatus::default());
        let (widgets, _) = broadcast::channel(WIDGET_CHANNEL_CAPACITY);

        Self {
            cache,
            locations,
            weather,
            clock: Arc::new(SystemClock),
            policy: StalenessPolicy::default(),
            gate: RefreshGate::new(),
            status,
            widgets,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: StalenessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache(&self) -> &Arc<PreferencesCache> {
        &self.cache
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    pub fn status(&self) -> watch::Receiver<RefreshStatus> {
        self.status.subscribe()
    }

    pub fn subscribe_widgets(&self) -> broadcast::Receiver<WidgetEvent> {
        self.widgets.subscribe()
    }

    /// Run one refresh. Failures are reported in the outcome, never raised.
    pub async fn refresh(&self, trigger: RefreshTrigger, force_location: bool) -> RefreshOutcome {
        let Some(_guard) = self.gate.try_begin(trigger) else {
            tracing::debug!("Refresh ({}) coalesced into in-flight refresh", trigger);
            return RefreshOutcome::Coalesced;
        };

        tracing::info!(
            "Refresh started ({}, force_location={})",
            trigger,
            force_location
        );
        self.status.send_modify(|s| {
            s.loading = true;
            s.last_trigger = Some(trigger);
        });

        let outcome = self.run(force_location).await;

        self.status.send_modify(|s| {
            s.loading = false;
            match &outcome {
                RefreshOutcome::Succeeded(_) => {
                    s.location_message = None;
                    s.last_error = None;
                }
                RefreshOutcome::Failed(failure) => {
                    if let RefreshFailure::Location(e) = failure {
                        s.location_message = Some(e.user_message().to_string());
                    }
                    s.last_error = Some(failure.user_message().to_string());
                }
                RefreshOutcome::Coalesced => {}
            }
        });

        // No subscribers is fine
        let _ = self.widgets.send(WidgetEvent::CacheMayHaveChanged);

        match &outcome {
            RefreshOutcome::Succeeded(_) => tracing::info!("Refresh ({}) succeeded", trigger),
            RefreshOutcome::Failed(e) => tracing::warn!("Refresh ({}) failed: {}", trigger, e),
            RefreshOutcome::Coalesced => {}
        }
        outcome
    }

    /// Fire-and-forget refresh on the current tokio runtime.
    /// Returns `None` when called outside a runtime.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        trigger: RefreshTrigger,
        force_location: bool,
    ) -> Option<JoinHandle<RefreshOutcome>> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("Cannot spawn refresh ({}): {}", trigger, e);
                return None;
            }
        };
        let this = Arc::clone(self);
        Some(handle.spawn(async move { this.refresh(trigger, force_location).await }))
    }

    async fn run(&self, force_location: bool) -> RefreshOutcome {
        match self.try_run(force_location).await {
            Ok(reading) => RefreshOutcome::Succeeded(reading),
            Err(failure) => RefreshOutcome::Failed(failure),
        }
    }

    async fn try_run(&self, force_location: bool) -> Result<CachedReading, RefreshFailure> {
        let reading = self.cache.load()?;

        let coordinates = match self
            .policy
            .refresh_path(&reading, force_location, self.clock.now())
        {
            RefreshPath::WeatherOnly => {
                tracing::debug!(
                    "Location fresh, reusing {}, {}",
                    reading.latitude,
                    reading.longitude
                );
                reading.coordinates()
            }
            RefreshPath::Location(reason) => {
                tracing::info!("Resolving location ({:?})", reason);
                let location = self.locations.current_location().await?;
                self.cache
                    .save_location(&location, self.clock.now_millis())?;
                self.status.send_modify(|s| s.location_message = None);
                location.coordinates
            }
        };

        let conditions = self.weather.current_conditions(coordinates).await?;
        let reading = self
            .cache
            .save_weather(&conditions, self.clock.now_millis())?;
        Ok(reading)
    }
}
