//! Invocation context shared by every task of one run.

use std::path::{Path, PathBuf};

use crate::config::ForgeConfig;
use crate::options::TaskOptions;
use crate::paths::PathTemplater;
use crate::theme::ThemeDescriptor;

/// Read-only state of one invocation.
///
/// Built once after configuration and theme resolution, then shared behind an
/// `Arc` by all tasks, including parallel siblings and watch-spawned runs.
#[derive(Debug, Clone)]
pub struct BuildContext {
    config: ForgeConfig,
    /// Project root directory (where forge.toml is located)
    project_root: PathBuf,
    theme: ThemeDescriptor,
    options: TaskOptions,
}

impl BuildContext {
    pub fn new(config: ForgeConfig, project_root: PathBuf, theme: ThemeDescriptor) -> Self {
        Self { config, project_root, theme, options: TaskOptions::default() }
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// The resolved theme
    pub fn theme(&self) -> &ThemeDescriptor {
        &self.theme
    }

    pub fn options(&self) -> &TaskOptions {
        &self.options
    }

    /// Path templates over the configured layout
    pub fn paths(&self) -> PathTemplater<'_> {
        PathTemplater::new(&self.config.project)
    }

    pub fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }
}
