//! Kairos - console audio auditor
//!
//! Reads text and log buffers aloud through a text-to-speech engine.
//! Input is sanitized before it can reach the engine, and synthesis runs
//! on a dedicated worker thread so callers are never stalled.

pub mod config;
pub mod error;
pub mod platform;
pub mod sanitize;
pub mod speech;

pub use error::{KairosError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "kairos";
