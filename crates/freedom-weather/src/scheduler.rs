//! Periodic background refresh.
//!
//! Ticks on a fixed interval, skipping ticks while offline. A failed
//! refresh is retried with exponential backoff; the orchestrator itself
//! never retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::connectivity::Connectivity;
use crate::orchestrator::{RefreshOrchestrator, RefreshOutcome};
use crate::retry::{is_retryable_failure, RetryConfig, RetryDecision};
use crate::types::RefreshTrigger;

pub struct PeriodicRefresh {
    orchestrator: Arc<RefreshOrchestrator>,
    connectivity: Arc<dyn Connectivity>,
    interval: Duration,
    retry: RetryConfig,
}

impl PeriodicRefresh {
    /// Backoff delays are capped at `interval`.
    pub fn new(
        orchestrator: Arc<RefreshOrchestrator>,
        connectivity: Arc<dyn Connectivity>,
        interval: Duration,
    ) -> Self {
        let retry = RetryConfig {
            max_delay: interval,
            ..RetryConfig::default()
        };
        Self {
            orchestrator,
            connectivity,
            interval,
            retry,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Run until `cancel` fires. The first refresh happens one interval
    /// after start.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; the caller has just refreshed
        ticker.tick().await;

        tracing::info!("Periodic refresh every {:?}", self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !self.connectivity.is_online().await {
                tracing::debug!("Offline, skipping periodic refresh");
                continue;
            }

            if self.tick(&cancel).await.is_none() {
                break;
            }
        }
        tracing::info!("Periodic refresh stopped");
    }

    /// One periodic refresh including its retries. `None` if cancelled
    /// while waiting to retry.
    pub async fn tick(&self, cancel: &CancellationToken) -> Option<RefreshOutcome> {
        let mut attempt = 0;
        loop {
            let outcome = self
                .orchestrator
                .refresh(RefreshTrigger::PeriodicTimer, false)
                .await;

            let retryable = match &outcome {
                RefreshOutcome::Failed(failure) => {
                    is_retryable_failure(failure) == RetryDecision::Retry
                }
                _ => false,
            };
            if !retryable {
                return Some(outcome);
            }
            if attempt >= self.retry.max_retries {
                tracing::warn!(
                    "Periodic refresh still failing after {} retries, waiting for next tick",
                    attempt
                );
                return Some(outcome);
            }

            let delay = self.retry.delay_for_attempt(attempt);
            attempt += 1;
            tracing::info!(
                "Retry attempt {} of {}, waiting {:?}",
                attempt,
                self.retry.max_retries,
                delay
            );
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PreferencesCache;
    use crate::connectivity::AlwaysOnline;
    use crate::location::LocationResolver;
    use crate::provider::WeatherSource;
    use crate::store::MemoryKeyValueStore;
    use crate::types::{
        Coordinates, CurrentConditions, LocationError, ResolvedLocation, WeatherError,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: AtomicUsize,
        error: Option<LocationError>,
    }

    #[async_trait]
    impl LocationResolver for CountingResolver {
        async fn current_location(&self) -> Result<ResolvedLocation, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.error {
                Some(e) => Err(e.clone()),
                None => Ok(ResolvedLocation {
                    coordinates: Coordinates::new(47.6, -122.3),
                    place_name: "Seattle".into(),
                }),
            }
        }
    }

    struct SunnyWeather;

    #[async_trait]
    impl WeatherSource for SunnyWeather {
        async fn current_conditions(
            &self,
            _coordinates: Coordinates,
        ) -> Result<CurrentConditions, WeatherError> {
            Ok(CurrentConditions {
                temperature_celsius: 21.0,
                min_temperature: 17.0,
                max_temperature: 24.0,
                icon_code: "01d".into(),
                condition_text: "Clear".into(),
            })
        }
    }

    struct Offline;

    #[async_trait]
    impl Connectivity for Offline {
        async fn is_online(&self) -> bool {
            false
        }
    }

    fn scheduler(
        error: Option<LocationError>,
        connectivity: Arc<dyn Connectivity>,
    ) -> (Arc<CountingResolver>, PeriodicRefresh) {
        let cache =
            Arc::new(PreferencesCache::new(Arc::new(MemoryKeyValueStore::new())).unwrap());
        let resolver = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
            error,
        });
        let orchestrator = Arc::new(RefreshOrchestrator::new(
            cache,
            resolver.clone(),
            Arc::new(SunnyWeather),
        ));
        let periodic = PeriodicRefresh::new(orchestrator, connectivity, Duration::from_secs(900))
            .with_retry(RetryConfig::new(2, 1_000, 10_000));
        (resolver, periodic)
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let (resolver, periodic) =
            scheduler(Some(LocationError::Unavailable), Arc::new(AlwaysOnline));

        let outcome = periodic.tick(&CancellationToken::new()).await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Failed(_)));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_is_not_retried() {
        let (resolver, periodic) =
            scheduler(Some(LocationError::PermissionDenied), Arc::new(AlwaysOnline));

        periodic.tick(&CancellationToken::new()).await.unwrap();

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_needs_no_retry() {
        let (resolver, periodic) = scheduler(None, Arc::new(AlwaysOnline));

        let outcome = periodic.tick(&CancellationToken::new()).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let (_resolver, periodic) =
            scheduler(Some(LocationError::Unavailable), Arc::new(AlwaysOnline));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(periodic.tick(&cancel).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_on_interval_until_cancelled() {
        let (resolver, periodic) = scheduler(None, Arc::new(AlwaysOnline));
        let cancel = CancellationToken::new();
        let handle = Arc::new(periodic).spawn(cancel.clone());

        // Nothing on start, one refresh per interval after that
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_ticks_are_skipped() {
        let (resolver, periodic) = scheduler(None, Arc::new(Offline));
        let cancel = CancellationToken::new();
        let handle = Arc::new(periodic).spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(3 * 900 + 1)).await;
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
