//! File records and the stage traits they flow through.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A file flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Literal prefix of the inclusion pattern that produced the file
    pub base: PathBuf,
    /// File bytes, `None` when the pipeline does not read contents
    pub contents: Option<Vec<u8>>,
}

impl FileRecord {
    pub fn new(path: PathBuf, base: PathBuf) -> Self {
        Self { path, base, contents: None }
    }

    pub fn with_contents(mut self, contents: Vec<u8>) -> Self {
        self.contents = Some(contents);
        self
    }

    /// Path relative to `base`, or just the file name when the path lies outside it
    pub fn relative_path(&self) -> PathBuf {
        match self.path.strip_prefix(&self.base) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => self.path.file_name().map(PathBuf::from).unwrap_or_default(),
        }
    }

    /// Replace the extension, keeping the base
    pub fn with_extension(mut self, ext: &str) -> Self {
        self.path.set_extension(ext);
        self
    }

    pub fn extension(&self) -> Option<String> {
        self.path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase())
    }
}

/// Side effect reported by a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Effect {
    Written(PathBuf),
    Removed(PathBuf),
    /// An external command ran to completion
    Ran(String),
    None,
}

/// Category of a per-file stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    Io,
    Subprocess,
    Decode,
    Css,
    Encode,
}

impl fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageErrorKind::Io => "io",
            StageErrorKind::Subprocess => "subprocess",
            StageErrorKind::Decode => "decode",
            StageErrorKind::Css => "css",
            StageErrorKind::Encode => "encode",
        };
        write!(f, "{}", s)
    }
}

/// A stage failed on one file. The file is dropped from the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{stage}: {kind} error on {}: {message}", .path.display())]
pub struct StageError {
    pub stage: String,
    pub path: PathBuf,
    pub kind: StageErrorKind,
    pub message: String,
}

impl StageError {
    pub fn new(
        stage: &str,
        path: &Path,
        kind: StageErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self { stage: stage.to_string(), path: path.to_path_buf(), kind, message: message.into() }
    }

    pub fn io(stage: &str, path: &Path, err: std::io::Error) -> Self {
        Self::new(stage, path, StageErrorKind::Io, err.to_string())
    }
}

/// A stage that may replace or drop a record.
#[async_trait]
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    /// Return the (possibly new) record, or `None` to drop it silently
    async fn transform(&self, record: FileRecord) -> Result<Option<FileRecord>, StageError>;
}

/// A stage that performs a side effect and leaves the record unchanged.
#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    async fn sink(&self, record: &FileRecord) -> Result<Effect, StageError>;
}

/// One step of a pipeline.
pub enum Stage {
    Transform(Box<dyn Transform>),
    Sink(Box<dyn Sink>),
}

impl Stage {
    pub fn transform(stage: impl Transform + 'static) -> Self {
        Stage::Transform(Box::new(stage))
    }

    pub fn sink(stage: impl Sink + 'static) -> Self {
        Stage::Sink(Box::new(stage))
    }

    pub fn name(&self) -> &str {
        match self {
            Stage::Transform(t) => t.name(),
            Stage::Sink(s) => s.name(),
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Transform(t) => write!(f, "Transform({})", t.name()),
            Stage::Sink(s) => write!(f, "Sink({})", s.name()),
        }
    }
}
