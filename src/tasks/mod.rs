//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod clock_timer;
pub mod refresh;

// Re-export main functions
pub use clock_timer::{clock_timer_task, ClockHandle, InputUpdate};
pub use refresh::{merge_inputs, refresh_once, refresh_task};
