//! Process-level helpers
//!
//! Signal handling used by the daemon to shut down cleanly.

pub mod signals;

pub use signals::shutdown_signal;
