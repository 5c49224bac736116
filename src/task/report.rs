//! Run reports.
//!
//! A [`RunReport`] records every leaf task a scheduler run executed, in
//! completion order, with its duration and pipeline summary.

use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::{StageError, Summary};

/// Serialize a duration as whole milliseconds
pub fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Human-readable duration (`850ms`, `2.40s`)
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// One executed leaf task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRun {
    pub task: String,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Pipeline summary, for tasks that stream files
    pub summary: Option<Summary>,
}

/// Outcome of a successful scheduler run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Task that was asked for
    pub requested: String,
    pub runs: Vec<TaskRun>,
    #[serde(serialize_with = "serialize_millis")]
    pub total_duration: Duration,
}

impl RunReport {
    pub fn new(requested: &str) -> Self {
        Self { requested: requested.to_string(), ..Default::default() }
    }

    pub fn add_run(&mut self, run: TaskRun) {
        self.runs.push(run);
    }

    /// Append the runs of a child report
    pub fn merge(&mut self, other: RunReport) {
        self.runs.extend(other.runs);
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Names of executed leaves, in completion order
    pub fn executed(&self) -> Vec<&str> {
        self.runs.iter().map(|r| r.task.as_str()).collect()
    }

    /// Per-file stage errors that were logged and swallowed
    pub fn stage_failures(&self) -> Vec<&StageError> {
        self.runs.iter().filter_map(|r| r.summary.as_ref()).flat_map(|s| s.failures.iter()).collect()
    }

    /// Every file written by any task
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.runs.iter().filter_map(|r| r.summary.as_ref()).flat_map(|s| s.written()).collect()
    }

    /// True when no stage reported a per-file error
    pub fn is_clean(&self) -> bool {
        self.stage_failures().is_empty()
    }

    /// Format a summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "'{}' finished: {} task(s) in {}",
            self.requested,
            self.runs.len(),
            format_duration(self.total_duration)
        )];

        for run in &self.runs {
            match &run.summary {
                Some(summary) => lines.push(format!(
                    "  {} ({}): {}",
                    run.task,
                    format_duration(run.duration),
                    summary.summary()
                )),
                None => lines.push(format!("  {} ({})", run.task, format_duration(run.duration))),
            }
        }

        let failures = self.stage_failures();
        if !failures.is_empty() {
            lines.push(format!("File errors ({}):", failures.len()));
            for failure in failures.iter().take(5) {
                lines.push(format!("  - {}", failure));
            }
            if failures.len() > 5 {
                lines.push(format!("  ... and {} more", failures.len() - 5));
            }
        }

        lines.join("\n")
    }
}
