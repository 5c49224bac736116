//! Filesystem sinks.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::pipeline::{Effect, FileRecord, Sink, StageError};

/// Writes each record under a directory, keeping its path relative to the
/// glob base. Records without contents are copied from their source path.
#[derive(Debug, Clone)]
pub struct WriteTo {
    dir: PathBuf,
}

impl WriteTo {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where a record lands
    pub fn target(&self, record: &FileRecord) -> PathBuf {
        self.dir.join(record.relative_path())
    }
}

#[async_trait]
impl Sink for WriteTo {
    fn name(&self) -> &str {
        "write"
    }

    async fn sink(&self, record: &FileRecord) -> Result<Effect, StageError> {
        let target = self.target(record);
        let err = |e| StageError::io("write", &target, e);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(err)?;
        }
        match &record.contents {
            Some(bytes) => tokio::fs::write(&target, bytes).await.map_err(err)?,
            None if record.path != target => {
                tokio::fs::copy(&record.path, &target).await.map_err(err)?;
            }
            None => {}
        }
        Ok(Effect::Written(target))
    }
}

/// Deletes each record's path, file or directory. A path that is already
/// gone is not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Remove;

async fn remove_path(path: &Path) -> std::io::Result<bool> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl Sink for Remove {
    fn name(&self) -> &str {
        "remove"
    }

    async fn sink(&self, record: &FileRecord) -> Result<Effect, StageError> {
        match remove_path(&record.path).await {
            Ok(true) => Ok(Effect::Removed(record.path.clone())),
            Ok(false) => Ok(Effect::None),
            Err(e) => Err(StageError::io("remove", &record.path, e)),
        }
    }
}
