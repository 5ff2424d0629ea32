//! Punch Clock - a live "time worked today" clock for HR attendance clients
//!
//! The clock is fed a server baseline duration and the open session's start
//! time, ticks once per second while a session is open, and is served over a
//! small local HTTP API. Inputs come from periodic polling of the HR backend
//! or are pushed directly through the API.

pub mod api;
pub mod clock;
pub mod config;
pub mod errors;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use clock::{compute_elapsed, Activity, ClockInputs, ClockReading, ElapsedDisplay, WorkDuration};
pub use config::Config;
pub use errors::{ClockError, ClockResult};
pub use state::AppState;
pub use tasks::ClockHandle;
pub use utils::signals::shutdown_signal;
