//! Backend refresh bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Keep only the most recent errors
const MAX_ERRORS: usize = 20;

/// Outcome of the periodic backend re-fetch, reported by `/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshState {
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    /// Zone label reported by the backend with the last session status
    pub time_zone_label: Option<String>,
    /// List of current errors for client visibility
    pub errors: Vec<String>,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, at: DateTime<Utc>, time_zone_label: Option<String>) {
        self.last_attempt = Some(at);
        self.last_success = Some(at);
        self.consecutive_failures = 0;
        if time_zone_label.is_some() {
            self.time_zone_label = time_zone_label;
        }
        self.clear_errors_for("refresh");
    }

    pub fn record_failure(&mut self, at: DateTime<Utc>, error: String) {
        self.last_attempt = Some(at);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.add_error(format!("refresh: {}", error));
    }

    /// Add an error, dropping the oldest beyond the cap
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
        if self.errors.len() > MAX_ERRORS {
            let excess = self.errors.len() - MAX_ERRORS;
            self.errors.drain(..excess);
        }
    }

    /// Clear errors for a specific component
    pub fn clear_errors_for(&mut self, component: &str) {
        let initial_count = self.errors.len();
        let prefix = format!("{}:", component.to_lowercase());
        self.errors.retain(|error| !error.to_lowercase().starts_with(&prefix));

        if self.errors.len() != initial_count {
            tracing::info!("Cleared {} errors for component: {}", initial_count - self.errors.len(), component);
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures == 0
    }
}
