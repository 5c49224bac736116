//! Configuration module for themeforge
//!
//! Provides types and parsing for `forge.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{default_config, load_config, ConfigError};
pub use schema::*;
