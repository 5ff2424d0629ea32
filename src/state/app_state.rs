//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::RefreshState;
use crate::{
    clock::{ClockInputs, ClockReading},
    errors::{ClockError, ClockResult},
    tasks::ClockHandle,
};

/// Main application state: the running clock plus refresh metadata
#[derive(Debug)]
pub struct AppState {
    /// The running clock; dropping it stops the timer
    pub clock: ClockHandle,
    /// Backend refresh outcome and errors
    pub refresh_state: Arc<Mutex<RefreshState>>,
    /// Wakes the refresh task for an out-of-schedule fetch
    pub refresh_requested: Notify,
    /// Whether a backend is configured at all
    pub backend_configured: bool,
    /// Zone label from configuration, used until the backend reports one
    pub zone_label: String,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
}

impl AppState {
    pub fn new(clock: ClockHandle, port: u16, host: String, zone_label: String, backend_configured: bool) -> Self {
        Self {
            clock,
            refresh_state: Arc::new(Mutex::new(RefreshState::new())),
            refresh_requested: Notify::new(),
            backend_configured,
            zone_label,
            start_time: Instant::now(),
            port,
            host,
        }
    }

    /// Hand new inputs to the clock. Returns whether they differed from the current ones.
    pub fn publish_inputs(&self, source: &str, inputs: ClockInputs) -> bool {
        let changed = self.clock.set_inputs(inputs);
        if changed {
            info!("Clock inputs updated from {}", source);
        }
        changed
    }

    /// Hand authoritative inputs to the clock. The timer recomputes even when
    /// they are unchanged. Returns whether they differed from the current ones.
    pub fn sync_inputs(&self, source: &str, inputs: ClockInputs) -> bool {
        let changed = self.clock.sync_inputs(inputs);
        if changed {
            info!("Clock inputs updated from {}", source);
        } else {
            debug!("Clock inputs confirmed by {}", source);
        }
        changed
    }

    pub fn current_reading(&self) -> ClockReading {
        self.clock.reading()
    }

    pub fn current_inputs(&self) -> ClockInputs {
        self.clock.inputs()
    }

    /// Record a successful backend refresh
    pub fn record_refresh_success(&self, time_zone_label: Option<String>) -> ClockResult<()> {
        let mut state = self.lock_refresh_state()?;
        state.record_success(Utc::now(), time_zone_label);
        Ok(())
    }

    /// Record a failed backend refresh
    pub fn record_refresh_failure(&self, error: String) -> ClockResult<()> {
        let mut state = self.lock_refresh_state()?;
        warn!("Adding error to state: {}", error);
        state.record_failure(Utc::now(), error);
        Ok(())
    }

    /// Get current refresh state
    pub fn get_refresh_state(&self) -> ClockResult<RefreshState> {
        self.lock_refresh_state().map(|state| state.clone())
    }

    /// Zone label to show next to the clock: the backend's, else the configured one
    pub fn time_zone_label(&self) -> String {
        self.refresh_state
            .lock()
            .ok()
            .and_then(|state| state.time_zone_label.clone())
            .unwrap_or_else(|| self.zone_label.clone())
    }

    /// Ask the refresh task to fetch now
    pub fn request_refresh(&self) -> ClockResult<()> {
        if !self.backend_configured {
            return Err(ClockError::State("no backend configured".to_string()));
        }
        self.refresh_requested.notify_one();
        info!("Manual refresh requested");
        Ok(())
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    fn lock_refresh_state(&self) -> ClockResult<std::sync::MutexGuard<'_, RefreshState>> {
        self.refresh_state
            .lock()
            .map_err(|e| ClockError::State(format!("Failed to lock refresh state: {}", e)))
    }
}
