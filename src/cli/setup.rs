//! Configuration, root and theme resolution before any task runs.

use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use super::GlobalArgs;
use crate::config::loader::{
    default_config, find_config, load_config, merge_cli_overrides, project_root, validate_config, CliOverrides,
    ConfigError,
};
use crate::options::TaskOptions;
use crate::task::BuildContext;
use crate::theme::{ThemeError, ThemeResolver};

/// Failure before the task graph exists
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Error loading config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error("project root {} is not accessible: {source}", .path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Canonical project root.
///
/// `--root` wins, then the directory holding the config file, then the
/// working directory. Canonical paths keep watcher events comparable to the
/// watch patterns.
pub fn resolve_root(explicit: Option<&PathBuf>, config_path: Option<&PathBuf>) -> Result<PathBuf, SetupError> {
    let root = match (explicit, config_path.and_then(|p| project_root(p))) {
        (Some(root), _) => root.clone(),
        (None, Some(parent)) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    root.canonicalize().map_err(|source| SetupError::Root { path: root, source })
}

/// Load configuration, apply overrides, resolve the theme.
pub fn build_context(global: &GlobalArgs, options: TaskOptions) -> Result<BuildContext, SetupError> {
    let config_path = global.config.clone().or_else(find_config);
    let mut config = match &config_path {
        Some(path) => {
            debug!("Using config: {}", path.display());
            load_config(Some(path))?
        }
        None => {
            debug!("No forge.toml found, using defaults");
            default_config()
        }
    };

    let overrides = CliOverrides {
        static_dir: global.static_dir.clone(),
        media_dir: global.media_dir.clone(),
        debounce_ms: global.debounce_ms,
    };
    merge_cli_overrides(&mut config, &overrides);
    validate_config(&config)?;

    let root = resolve_root(global.root.as_ref(), config_path.as_ref())?;
    let theme = ThemeResolver::new(&config.themes).resolve(global.theme.as_deref())?;
    debug!(theme = %theme.identifier, root = %root.display(), "resolved invocation");

    Ok(BuildContext::new(config, root, theme).with_options(options))
}
