//! External service module
//!
//! This module contains the client for the HR backend the clock is fed from.

pub mod backend;

// Re-export main types
pub use backend::{
    AccumulatedDuration, AttendanceBackend, BackendConfig, HttpBackend, RetryPolicy, SessionStatus,
};
