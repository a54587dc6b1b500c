//! Slidecut Common Utilities
//!
//! Shared infrastructure for all Slidecut crates:
//! - Error types and result aliases
//! - Playback clock with pluggable time-advance strategies
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
