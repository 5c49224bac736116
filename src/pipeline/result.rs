//! Pipeline outcomes.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::stage::{Effect, StageError};

/// Fatal pipeline error.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The enumeration worker panicked or was cancelled
    #[error("file enumeration failed: {0}")]
    Producer(String),

    #[error("{task}: {count} file(s) failed")]
    FailedAfterErrors { task: String, count: usize },
}

/// What one pipeline run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub task: String,
    /// Records that passed every stage
    pub processed: usize,
    /// Records a transform dropped on purpose
    pub dropped: usize,
    pub effects: Vec<Effect>,
    /// Per-file stage errors; those records were removed from the stream
    pub failures: Vec<StageError>,
    #[serde(serialize_with = "crate::task::report::serialize_millis")]
    pub duration: Duration,
}

impl Summary {
    pub fn new(task: &str) -> Self {
        Self { task: task.to_string(), ..Default::default() }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Paths written by sinks, in order
    pub fn written(&self) -> Vec<PathBuf> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Written(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Paths removed by sinks, in order
    pub fn removed(&self) -> Vec<PathBuf> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Removed(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// One-line description
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} file(s)", self.processed)];
        let written = self.written().len();
        if written > 0 {
            parts.push(format!("{} written", written));
        }
        let removed = self.removed().len();
        if removed > 0 {
            parts.push(format!("{} removed", removed));
        }
        if self.dropped > 0 {
            parts.push(format!("{} dropped", self.dropped));
        }
        if !self.failures.is_empty() {
            parts.push(format!("{} failed", self.failures.len()));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StageErrorKind;
    use std::path::Path;

    #[test]
    fn test_summary_line() {
        let mut summary = Summary::new("compile-styles");
        summary.processed = 2;
        summary.effects.push(Effect::Written(PathBuf::from("css/a.css")));
        summary.effects.push(Effect::Ran("lessc".to_string()));
        summary.failures.push(StageError::new(
            "compile",
            Path::new("b.less"),
            StageErrorKind::Subprocess,
            "exit 1",
        ));
        assert_eq!(summary.summary(), "2 file(s), 1 written, 1 failed");
        assert_eq!(summary.written(), vec![PathBuf::from("css/a.css")]);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_empty_summary() {
        let summary = Summary::new("clean-cache");
        assert_eq!(summary.summary(), "0 file(s)");
        assert!(!summary.has_failures());
        assert!(summary.removed().is_empty());
    }
}
