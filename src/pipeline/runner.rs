//! Pipeline construction and execution.

use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::result::{PipelineError, Summary};
use super::source::SourceList;
use super::stage::{Effect, FileRecord, Sink, Stage, StageError, Transform};
use crate::config::loader::resolve_path;
use crate::stages::WriteTo;

/// Default capacity of the record channel
pub const DEFAULT_BUFFER: usize = 32;

/// A glob list streamed through ordered stages.
///
/// Built per task invocation and consumed by [`Pipeline::run`].
#[derive(Debug)]
pub struct Pipeline {
    task: String,
    root: PathBuf,
    sources: Vec<String>,
    stages: Vec<Stage>,
    dest: Option<PathBuf>,
    read: bool,
    include_dirs: bool,
    fail_after_error: bool,
    buffer: usize,
}

impl Pipeline {
    /// Create an empty pipeline owned by `task`
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            root: PathBuf::new(),
            sources: Vec::new(),
            stages: Vec::new(),
            dest: None,
            read: true,
            include_dirs: false,
            fail_after_error: false,
            buffer: DEFAULT_BUFFER,
        }
    }

    /// Directory relative patterns are resolved against
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    /// Append one source pattern (`!` prefix excludes)
    pub fn source(mut self, pattern: impl Into<String>) -> Self {
        self.sources.push(pattern.into());
        self
    }

    pub fn sources<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Append an exclusion pattern
    pub fn exclude(mut self, pattern: impl AsRef<str>) -> Self {
        self.sources.push(format!("!{}", pattern.as_ref()));
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn transform(self, stage: impl Transform + 'static) -> Self {
        self.stage(Stage::transform(stage))
    }

    pub fn sink(self, stage: impl Sink + 'static) -> Self {
        self.stage(Stage::sink(stage))
    }

    /// Write surviving records under `dir`, keeping their path relative to the glob base
    pub fn dest(mut self, dir: impl AsRef<Path>) -> Self {
        self.dest = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Whether file contents are loaded before the first stage
    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Also emit directories matched by the patterns
    pub fn include_dirs(mut self, include_dirs: bool) -> Self {
        self.include_dirs = include_dirs;
        self
    }

    /// Turn any stage error into a fatal error once the stream is drained
    pub fn fail_after_error(mut self, fail: bool) -> Self {
        self.fail_after_error = fail;
        self
    }

    /// Capacity of the producer channel
    pub fn buffer(mut self, capacity: usize) -> Self {
        self.buffer = capacity.max(1);
        self
    }

    /// Stream every surviving file through the stages.
    pub async fn run(mut self) -> Result<Summary, PipelineError> {
        let start = Instant::now();
        let list = SourceList::parse(&self.root, &self.sources)?;

        if let Some(dest) = self.dest.take() {
            self.stages.push(Stage::sink(WriteTo::new(resolve_path(&self.root, &dest))));
        }

        let (tx, mut rx) = mpsc::channel(self.buffer);
        let include_dirs = self.include_dirs;
        let producer = tokio::task::spawn_blocking(move || list.enumerate(include_dirs, tx));

        let mut summary = Summary::new(&self.task);
        while let Some(record) = rx.recv().await {
            self.process(record, &mut summary).await;
        }

        let enumerated =
            producer.await.map_err(|e| PipelineError::Producer(e.to_string()))?;
        summary.duration = start.elapsed();
        debug!(
            task = %self.task,
            enumerated,
            "pipeline finished: {}",
            summary.summary()
        );

        if self.fail_after_error && summary.has_failures() {
            return Err(PipelineError::FailedAfterErrors {
                task: self.task.clone(),
                count: summary.failures.len(),
            });
        }
        Ok(summary)
    }

    async fn process(&self, mut record: FileRecord, summary: &mut Summary) {
        if self.read && record.contents.is_none() && !record.path.is_dir() {
            match tokio::fs::read(&record.path).await {
                Ok(bytes) => record.contents = Some(bytes),
                Err(e) => {
                    self.fail(summary, StageError::io("read", &record.path, e));
                    return;
                }
            }
        }

        for stage in &self.stages {
            match stage {
                Stage::Transform(t) => match t.transform(record).await {
                    Ok(Some(next)) => record = next,
                    Ok(None) => {
                        debug!(task = %self.task, stage = t.name(), "record dropped");
                        summary.dropped += 1;
                        return;
                    }
                    Err(e) => {
                        self.fail(summary, e);
                        return;
                    }
                },
                Stage::Sink(s) => match s.sink(&record).await {
                    Ok(Effect::None) => {}
                    Ok(effect) => {
                        debug!(task = %self.task, stage = s.name(), ?effect, "effect");
                        summary.effects.push(effect);
                    }
                    Err(e) => {
                        self.fail(summary, e);
                        return;
                    }
                },
            }
        }
        summary.processed += 1;
    }

    fn fail(&self, summary: &mut Summary, err: StageError) {
        warn!(
            task = %self.task,
            stage = %err.stage,
            path = %err.path.display(),
            "{}",
            err.message
        );
        summary.failures.push(err);
    }
}
