//! Configuration and CLI argument handling

use std::time::Duration;
use chrono::FixedOffset;
use clap::Parser;

use crate::{
    clock::wall::parse_utc_offset,
    errors::ClockResult,
    services::BackendConfig,
};

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "punch-clock")]
#[command(about = "A live work-duration clock daemon for HR attendance clients")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Base URL of the HR backend; without it the clock is driven through PUT /clock/inputs only
    #[arg(long, env = "PUNCH_CLOCK_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Bearer token sent to the backend
    #[arg(long, env = "PUNCH_CLOCK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path of the session-status endpoint
    #[arg(long, default_value = "/attendance/session-status")]
    pub status_path: String,

    /// Path of the accumulated-duration endpoint
    #[arg(long, default_value = "/attendance/accumulated-duration")]
    pub duration_path: String,

    /// Backend refresh period in minutes (at most one day)
    #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..=1440))]
    pub refresh_minutes: u64,

    /// UTC offset bare session times are read in, e.g. +05:30 (defaults to the host's offset)
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset: Option<String>,

    /// Zone label shown until the backend reports one
    #[arg(long, default_value = "local")]
    pub zone_label: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_minutes * 60)
    }

    /// The configured offset, or `None` to use the host's
    pub fn offset(&self) -> ClockResult<Option<FixedOffset>> {
        self.utc_offset.as_deref().map(parse_utc_offset).transpose()
    }

    /// Backend client settings, when a backend URL is configured
    pub fn backend(&self) -> Option<BackendConfig> {
        let url = self.backend_url.as_deref().filter(|u| !u.trim().is_empty())?;
        let mut backend = BackendConfig::new(url);
        backend.token = self.token.clone().filter(|t| !t.is_empty());
        backend.status_path = self.status_path.clone();
        backend.duration_path = self.duration_path.clone();
        Some(backend)
    }
}
