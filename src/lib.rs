//! themeforge - configuration-driven build orchestrator for theme assets
//!
//! This library provides functionality to:
//! - Resolve themes and their path layout from `forge.toml`
//! - Stream files through lint, compile, image and removal stages
//! - Compose tasks in series and in parallel, and re-run them on file changes

pub mod cli;
pub mod color;
pub mod config;
pub mod logging;
pub mod options;
pub mod paths;
pub mod pipeline;
pub mod stages;
pub mod task;
pub mod tasks;
pub mod theme;
pub mod validate;
pub mod watch;
