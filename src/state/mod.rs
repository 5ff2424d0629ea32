//! State management module
//!
//! This module contains the shared application state and the refresh bookkeeping.

pub mod app_state;
pub mod refresh_state;

// Re-export main types
pub use app_state::AppState;
pub use refresh_state::RefreshState;
