//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    clock::{ClockInputs, ClockReading},
    state::RefreshState,
};

/// Response for action endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    pub fn new(status: String, message: String) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn accepted(message: String) -> Self {
        Self::new("accepted".to_string(), message)
    }

    pub fn error(message: String) -> Self {
        Self::new("error".to_string(), message)
    }
}

/// Current clock value, ready to render
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockResponse {
    /// `HH:MM:SS`
    pub display: String,
    #[serde(flatten)]
    pub reading: ClockReading,
    pub time_zone_label: String,
}

impl ClockResponse {
    pub fn new(reading: ClockReading, time_zone_label: String) -> Self {
        Self {
            display: reading.elapsed.to_string(),
            reading,
            time_zone_label,
        }
    }
}

/// Status response with refresh information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub inputs: ClockInputs,
    pub clock_running: bool,
    pub backend_configured: bool,
    /// False while the last backend refresh failed
    pub refresh_healthy: bool,
    pub refresh: RefreshState,
    pub uptime: String,
    pub port: u16,
    pub host: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
