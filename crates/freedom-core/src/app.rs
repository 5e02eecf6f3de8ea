use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{AppError, ConfigError};

/// Application state and lifecycle: validated config plus a shutdown signal
/// shared by every background task.
pub struct App {
    config: Config,
    shutdown: CancellationToken,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Load and validate configuration from `path`, or the default location.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let config = match path {
            Some(p) => Config::load_from(p)?,
            None => Config::load()?,
        };

        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }
        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(Self::new(config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The weather API key, required before any refresh can run.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        self.config
            .weather
            .resolved_api_key()
            .ok_or_else(|| ConfigError::MissingSetting("weather.api_key".to_string()))
    }

    /// Token cancelled when the application shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        tracing::info!("Shutting down application");
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
