//! Unified error type for the clock, the backend client and the shared state.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClockError {
    // ---------------------------
    // Parsing
    // ---------------------------
    #[error("Invalid duration format: {0}")]
    InvalidDuration(String),

    #[error("Invalid UTC offset: {0}")]
    InvalidOffset(String),

    // ---------------------------
    // Backend
    // ---------------------------
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ---------------------------
    // Runtime
    // ---------------------------
    #[error("State error: {0}")]
    State(String),
}

pub type ClockResult<T> = Result<T, ClockError>;
