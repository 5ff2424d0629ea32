//! HTTP endpoint handlers

use std::{sync::Arc, time::Duration};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{clock::ClockInputs, state::AppState};
use super::responses::{ApiResponse, ClockResponse, HealthResponse, StatusResponse};

/// How long `PUT /clock/inputs` waits for the timer to publish the new reading
const READING_WAIT: Duration = Duration::from_secs(1);

/// Handle GET /clock - Return the current clock reading
pub async fn clock_handler(State(state): State<Arc<AppState>>) -> Json<ClockResponse> {
    Json(ClockResponse::new(state.current_reading(), state.time_zone_label()))
}

/// Handle PUT /clock/inputs - Replace the clock inputs directly
pub async fn set_inputs_handler(
    State(state): State<Arc<AppState>>,
    Json(inputs): Json<ClockInputs>,
) -> Json<ClockResponse> {
    let mut readings = state.clock.subscribe();

    if state.publish_inputs("api", inputs) {
        info!("Inputs endpoint called - clock inputs replaced");
    } else {
        info!("Inputs endpoint called - inputs unchanged");
    }

    // Skip readings from ticks of the previous inputs
    let revision = state.clock.revision();
    let waited = tokio::time::timeout(READING_WAIT, async {
        readings.wait_for(|r| r.revision >= revision).await.map(|r| r.clone())
    })
    .await;
    let reading = match waited {
        Ok(Ok(reading)) => reading,
        _ => {
            warn!("Clock did not publish a reading for the new inputs within {:?}", READING_WAIT);
            state.current_reading()
        }
    };

    Json(ClockResponse::new(reading, state.time_zone_label()))
}

/// Handle POST /refresh - Trigger an immediate backend re-fetch
pub async fn refresh_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ApiResponse>) {
    match state.request_refresh() {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::accepted("Refresh scheduled".to_string())),
        ),
        Err(e) => {
            warn!("Refresh endpoint called without a usable backend: {}", e);
            (StatusCode::CONFLICT, Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// Handle GET /status - Return refresh status and current inputs
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let refresh = match state.get_refresh_state() {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to get refresh state: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Ok(Json(StatusResponse {
        inputs: state.current_inputs(),
        clock_running: state.clock.is_running(),
        backend_configured: state.backend_configured,
        refresh_healthy: refresh.is_healthy(),
        refresh,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
