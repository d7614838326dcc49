//! litscan-common: Shared errors, configuration and the HTTP client used across all litscan crates.

pub mod config;
pub mod error;
pub mod sandbox;

// Re-export commonly used types
pub use config::ScrapeConfig;
pub use error::{LitscanError, Result};
