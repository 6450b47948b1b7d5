//! Core utilities for the ember renderer.
//!
//! This crate provides foundational types used across the engine:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timing
//! - Configuration loading

pub mod config;
mod error;
mod logging;
mod timer;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::{MAX_FRAME_TIME, Timer};
