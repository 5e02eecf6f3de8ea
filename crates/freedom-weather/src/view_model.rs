//! State behind the full-screen interactive view.
//!
//! Observes the cache and the refresh status, and layers a transient
//! rotary-input override on top of the cached reading. The override is
//! display only and is discarded as soon as a new reading lands.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::format::{condition_label, format_celsius, format_fahrenheit, needs_compact_temperature};
use crate::icons::ConditionIcon;
use crate::orchestrator::{RefreshOrchestrator, RefreshOutcome, RefreshStatus};
use crate::types::{CachedReading, RefreshTrigger};
use crate::units::{celsius_to_fahrenheit, fahrenheit_delta_to_celsius, fahrenheit_to_celsius};

/// Which temperature field rotary input adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SelectionState {
    #[default]
    None,
    Celsius,
    Fahrenheit,
}

impl SelectionState {
    /// None -> Celsius -> Fahrenheit -> None
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Celsius,
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::None,
        }
    }
}

/// Apply a rotary delta to `reading` in the selected unit. The sibling unit
/// is recomputed and min/max (Celsius) shift by the same amount, so the
/// min..max spread is preserved.
pub fn apply_rotary_delta(reading: &mut CachedReading, selection: SelectionState, delta: f64) {
    let celsius_delta = match selection {
        SelectionState::None => return,
        SelectionState::Celsius => {
            reading.temperature_celsius += delta;
            reading.temperature_fahrenheit = celsius_to_fahrenheit(reading.temperature_celsius);
            delta
        }
        SelectionState::Fahrenheit => {
            reading.temperature_fahrenheit += delta;
            reading.temperature_celsius = fahrenheit_to_celsius(reading.temperature_fahrenheit);
            fahrenheit_delta_to_celsius(delta)
        }
    };
    reading.min_temperature += celsius_delta;
    reading.max_temperature += celsius_delta;
}

/// One frame of the interactive view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub reading: CachedReading,
    /// Location line: the place name, or the last location error.
    pub location_label: String,
    pub celsius_text: String,
    pub fahrenheit_text: String,
    pub compact: bool,
    pub min_text: String,
    pub max_text: String,
    pub icon: ConditionIcon,
    pub condition: String,
    pub selection: SelectionState,
    /// Values shown differ from the cache because of rotary input.
    pub adjusted: bool,
    pub loading: bool,
}

pub struct WeatherViewModel {
    orchestrator: Arc<RefreshOrchestrator>,
    readings: watch::Receiver<CachedReading>,
    status: watch::Receiver<RefreshStatus>,
    selection: SelectionState,
    adjusted: Option<CachedReading>,
}

impl WeatherViewModel {
    pub fn new(orchestrator: Arc<RefreshOrchestrator>) -> Self {
        let readings = orchestrator.cache().subscribe();
        let status = orchestrator.status();
        Self {
            orchestrator,
            readings,
            status,
            selection: SelectionState::None,
            adjusted: None,
        }
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    /// Leaving selection entirely drops any rotary override.
    pub fn select(&mut self, selection: SelectionState) {
        self.selection = selection;
        if selection == SelectionState::None {
            self.reset_adjustment();
        }
    }

    /// Tap handler: move to the next selection.
    pub fn cycle_selection(&mut self) -> SelectionState {
        self.select(self.selection.next());
        self.selection
    }

    /// Rotary handler. Returns false when nothing is selected.
    pub fn rotate(&mut self, delta: f64) -> bool {
        if self.selection == SelectionState::None {
            return false;
        }
        self.sync_reading();
        let mut reading = match self.adjusted.take() {
            Some(r) => r,
            None => self.readings.borrow().clone(),
        };
        apply_rotary_delta(&mut reading, self.selection, delta);
        self.adjusted = Some(reading);
        true
    }

    /// Drop any rotary override.
    pub fn reset_adjustment(&mut self) {
        if self.adjusted.take().is_some() {
            tracing::debug!("Rotary adjustment cleared");
        }
    }

    pub fn snapshot(&mut self) -> ViewSnapshot {
        self.sync_reading();
        let status = self.status.borrow().clone();
        let adjusted = self.adjusted.is_some();
        let reading = match &self.adjusted {
            Some(r) => r.clone(),
            None => self.readings.borrow().clone(),
        };

        let celsius_text = format_celsius(reading.temperature_celsius);
        let fahrenheit_text = format_fahrenheit(reading.temperature_fahrenheit);
        let compact = needs_compact_temperature(&celsius_text, &fahrenheit_text);

        ViewSnapshot {
            location_label: status
                .location_message
                .unwrap_or_else(|| reading.location_name.clone()),
            min_text: format_celsius(reading.min_temperature),
            max_text: format_celsius(reading.max_temperature),
            icon: ConditionIcon::from_code(&reading.condition_icon_code),
            condition: condition_label(&reading.condition_text),
            celsius_text,
            fahrenheit_text,
            compact,
            selection: self.selection,
            adjusted,
            loading: status.loading,
            reading,
        }
    }

    /// Wait until the cache or the refresh status changes. Returns false
    /// once the orchestrator is gone.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            r = self.readings.changed() => r.is_ok(),
            r = self.status.changed() => r.is_ok(),
        }
    }

    pub async fn on_foreground(&self) -> RefreshOutcome {
        self.orchestrator
            .refresh(RefreshTrigger::AppForeground, false)
            .await
    }

    /// User-requested refresh; `force_location` re-resolves the location too.
    pub async fn refresh(&self, force_location: bool) -> RefreshOutcome {
        self.orchestrator
            .refresh(RefreshTrigger::ManualUserRequest, force_location)
            .await
    }

    fn sync_reading(&mut self) {
        if self.readings.has_changed().unwrap_or(false) {
            self.readings.mark_unchanged();
            if self.adjusted.take().is_some() {
                tracing::debug!("New reading arrived, dropping rotary adjustment");
            }
        }
    }
}
