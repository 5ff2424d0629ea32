//! Punch Clock - a live "time worked today" clock for HR attendance clients
//!
//! This is the main entry point for the punch-clock daemon.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use punch_clock::{
    api::create_router,
    clock::{ClockInputs, SystemClock, WallClock},
    config::Config,
    services::{AttendanceBackend, HttpBackend},
    state::AppState,
    tasks::{refresh_task, ClockHandle},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("punch_clock={},tower_http=info", config.log_level()))
        .init();

    info!("Starting punch-clock v{}", env!("CARGO_PKG_VERSION"));

    let system_clock = match config.offset()? {
        Some(offset) => SystemClock::new(offset),
        None => SystemClock::local(),
    };
    info!(
        "Configuration: host={}, port={}, refresh={}min, offset={}, zone={}",
        config.host,
        config.port,
        config.refresh_minutes,
        system_clock.offset(),
        config.zone_label
    );
    let wall: Arc<dyn WallClock> = Arc::new(system_clock);

    // The clock starts at zero until the first refresh or input push
    let clock = ClockHandle::spawn(ClockInputs::default(), Arc::clone(&wall));

    let backend_config = config.backend();
    let state = Arc::new(AppState::new(
        clock,
        config.port,
        config.host.clone(),
        config.zone_label.clone(),
        backend_config.is_some(),
    ));

    // Start the backend refresh background task
    match backend_config {
        Some(backend_config) => {
            info!("Polling backend at {}", backend_config.base_url);
            let backend: Arc<dyn AttendanceBackend> = Arc::new(HttpBackend::new(backend_config)?);
            let refresh_state = Arc::clone(&state);
            let refresh_wall = Arc::clone(&wall);
            let every = config.refresh_interval();
            tokio::spawn(async move {
                refresh_task(refresh_state, backend, refresh_wall, every).await;
            });
        }
        None => warn!("No backend URL configured, clock inputs must be pushed via PUT /clock/inputs"),
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /clock        - Current time worked today");
    info!("  PUT  /clock/inputs - Replace clock inputs");
    info!("  POST /refresh      - Re-fetch from backend now");
    info!("  GET  /status       - Refresh status and inputs");
    info!("  GET  /health       - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
