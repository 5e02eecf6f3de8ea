//! FreedomWeather: headless host for the weather engine.
//!
//! Runs an app-foreground refresh, prints the tile, then keeps the periodic
//! refresh going and prints the view whenever widgets are notified.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use freedom_core::{App, Config};
use freedom_weather::{
    Coordinates, DeviceLocationResolver, FixedPosition, NoGeocoder, NominatimGeocoder,
    OpenWeatherClient, PeriodicRefresh, PreferencesCache, RefreshOrchestrator, RefreshOutcome,
    RefreshTrigger, ReverseGeocoder, SqliteKeyValueStore, StalenessPolicy, TcpConnectivity,
    TileService, ViewSnapshot, WeatherViewModel,
};

/// Wearable weather display engine
#[derive(Parser)]
#[command(name = "freedomweather", about = "Wearable weather display engine")]
struct Cli {
    /// Config file (defaults to <config dir>/freedomweather/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh once, print the tile, and exit.
    #[arg(long)]
    once: bool,

    /// Re-resolve the location even if the cached one is fresh.
    #[arg(long)]
    force_location: bool,
}

fn staleness_policy(config: &Config) -> StalenessPolicy {
    StalenessPolicy {
        location_max_age: chrono::Duration::minutes(i64::from(config.weather.location_stale_minutes)),
        tile_max_age: chrono::Duration::minutes(i64::from(config.weather.tile_stale_minutes)),
    }
}

fn build_orchestrator(app: &App) -> Result<Arc<RefreshOrchestrator>> {
    let config = app.config();
    let api_key = app.api_key()?;

    let prefs_path = config.storage.effective_preferences_path();
    if let Some(parent) = prefs_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create data directory")?;
    }
    let store = SqliteKeyValueStore::open(&prefs_path)
        .with_context(|| format!("Failed to open preferences at {}", prefs_path.display()))?;
    let cache = Arc::new(PreferencesCache::new(Arc::new(store))?);
    tracing::info!("Preferences: {}", prefs_path.display());

    let position = config
        .location
        .fixed_position()
        .map(|(lat, lon)| Coordinates::new(lat, lon));
    let geocoder: Arc<dyn ReverseGeocoder> = if config.location.reverse_geocoding {
        Arc::new(NominatimGeocoder::with_base_url(&config.location.geocoder_url)?)
    } else {
        Arc::new(NoGeocoder)
    };
    let resolver = DeviceLocationResolver::new(Arc::new(FixedPosition::new(position)), geocoder);
    let client = OpenWeatherClient::with_base_url(&config.weather.base_url, api_key)?;

    let orchestrator = RefreshOrchestrator::new(cache, Arc::new(resolver), Arc::new(client))
        .with_policy(staleness_policy(config));
    Ok(Arc::new(orchestrator))
}

fn describe(view: &ViewSnapshot) -> String {
    let mut line = format!(
        "{}: {} / {} (min {}, max {}), {}",
        view.location_label,
        view.celsius_text,
        view.fahrenheit_text,
        view.min_text,
        view.max_text,
        view.condition
    );
    if view.loading {
        line.push_str(" [refreshing]");
    }
    line
}

#[tokio::main]
async fn main() -> Result<()> {
    freedom_core::init()?;
    let cli = Cli::parse();

    let app = App::load(cli.config.as_deref())?;
    let orchestrator = build_orchestrator(&app)?;

    match orchestrator
        .refresh(RefreshTrigger::AppForeground, cli.force_location)
        .await
    {
        RefreshOutcome::Failed(failure) => {
            tracing::warn!("Initial refresh failed: {}", failure);
            eprintln!("{}", failure.user_message());
        }
        RefreshOutcome::Succeeded(_) | RefreshOutcome::Coalesced => {}
    }

    let tile = TileService::new(orchestrator.clone());
    println!("{}", tile.render());
    if cli.once {
        return Ok(());
    }

    let config = app.config();
    let connectivity = Arc::new(TcpConnectivity::for_url(&config.weather.base_url)?);
    let interval = Duration::from_secs(u64::from(config.weather.refresh_minutes) * 60);
    let scheduler = Arc::new(PeriodicRefresh::new(
        orchestrator.clone(),
        connectivity,
        interval,
    ));
    let scheduler_handle = scheduler.spawn(app.shutdown_token());

    let mut view = WeatherViewModel::new(orchestrator.clone());
    let mut widgets = orchestrator.subscribe_widgets();
    tracing::info!("FreedomWeather running, Ctrl-C to exit");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
                app.shutdown();
                break;
            }
            event = widgets.recv() => match event {
                Ok(_) | Err(RecvError::Lagged(_)) => println!("{}", describe(&view.snapshot())),
                Err(RecvError::Closed) => break,
            },
        }
    }

    scheduler_handle
        .await
        .context("Periodic refresh task failed")?;
    Ok(())
}
