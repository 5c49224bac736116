//! File-watch triggers.
//!
//! A subscription watches the literal base directory of a glob and, for every
//! debounced batch of changes that touches a matching path, spawns a run of
//! the subscribed task. Runs are fire-and-forget: a new batch never waits for
//! the previous run, and a failing run is logged without ending the watch.

use glob::{MatchOptions, Pattern};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::pipeline::glob_base;
use crate::task::{format_duration, RunReport, SchedulerError, TaskGraph};

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),

    #[error("failed to watch {}: {source}", .path.display())]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("watch directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("invalid watch pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("file watcher failed: {0}")]
    Watcher(#[source] notify::Error),
}

fn match_options() -> MatchOptions {
    MatchOptions { case_sensitive: true, require_literal_separator: true, require_literal_leading_dot: false }
}

/// True when any changed path matches the pattern
pub fn batch_matches<'a>(pattern: &Pattern, paths: impl IntoIterator<Item = &'a Path>) -> bool {
    paths.into_iter().any(|p| pattern.matches_path_with(p, match_options()))
}

/// Start a task run in the background and return immediately.
pub fn spawn_run(graph: Arc<TaskGraph>, task: String) -> JoinHandle<Result<RunReport, SchedulerError>> {
    tokio::spawn(async move {
        let result = graph.run(&task).await;
        match &result {
            Ok(report) => info!(
                task = %task,
                "watch run of '{}' finished in {}",
                task,
                format_duration(report.total_duration)
            ),
            Err(e) => error!(task = %task, "watch run of '{}' failed: {}", task, e),
        }
        result
    })
}

/// Glob-to-task subscriptions over one task graph.
#[derive(Debug, Clone)]
pub struct WatchTrigger {
    graph: Arc<TaskGraph>,
    debounce: Duration,
}

impl WatchTrigger {
    /// Trigger using the configured debounce delay
    pub fn new(graph: Arc<TaskGraph>) -> Self {
        let debounce = Duration::from_millis(u64::from(graph.context().config().watch.debounce_ms));
        Self { graph, debounce }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Run `task` whenever files matching `glob` change.
    ///
    /// Relative globs are resolved against the project root. The future only
    /// resolves when the watcher fails or its event stream ends.
    pub async fn subscribe(&self, glob: &str, task: &str) -> Result<(), WatchError> {
        let root = self.graph.context().project_root();
        let full = if Path::new(glob).is_absolute() {
            glob.to_string()
        } else {
            format!("{}/{}", root.to_string_lossy().trim_end_matches('/'), glob)
        };
        let pattern = Pattern::new(&full).map_err(|e| WatchError::InvalidPattern {
            pattern: glob.to_string(),
            message: e.msg.to_string(),
        })?;
        let base = glob_base(&full);
        if !base.is_dir() {
            return Err(WatchError::DirectoryNotFound(base));
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<DebounceEventResult>();
        let mut debouncer = new_debouncer(self.debounce, move |result: DebounceEventResult| {
            // Receiver gone means the subscription ended
            let _ = tx.send(result);
        })
        .map_err(WatchError::WatcherInit)?;
        debouncer
            .watcher()
            .watch(&base, RecursiveMode::Recursive)
            .map_err(|source| WatchError::WatchPath { path: base.clone(), source })?;

        info!(task, "Watching {} for changes (debounce {})", full, format_duration(self.debounce));

        while let Some(result) = rx.recv().await {
            let events = result.map_err(WatchError::Watcher)?;
            let changed: Vec<&Path> = events
                .iter()
                .filter(|e| matches!(e.kind, DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous))
                .map(|e| e.path.as_path())
                .collect();
            if !batch_matches(&pattern, changed.iter().copied()) {
                debug!(count = changed.len(), "ignoring unrelated changes");
                continue;
            }
            for path in &changed {
                if let Some(name) = path.file_name() {
                    info!(task, "Changed: {}", name.to_string_lossy());
                }
            }
            spawn_run(Arc::clone(&self.graph), task.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_matches() {
        let pattern = Pattern::new("/shop/pub/static/frontend/Acme/luma/en_US/**/*.less").unwrap();
        let less = Path::new("/shop/pub/static/frontend/Acme/luma/en_US/css/source/_theme.less");
        let css = Path::new("/shop/pub/static/frontend/Acme/luma/en_US/css/styles-m.css");
        assert!(batch_matches(&pattern, [less, css]));
        assert!(!batch_matches(&pattern, [css]));
        assert!(!batch_matches(&pattern, std::iter::empty::<&Path>()));
    }

    #[test]
    fn test_watch_error_display() {
        let err = WatchError::DirectoryNotFound(PathBuf::from("pub/static"));
        assert_eq!(err.to_string(), "watch directory not found: pub/static");
    }
}
