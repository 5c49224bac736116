//! Cache and static-file removal.

use async_trait::async_trait;

use crate::pipeline::{Pipeline, Summary};
use crate::stages::Remove;
use crate::task::{Invocation, TaskBody, TaskError};

async fn remove_all(inv: &Invocation, globs: Vec<String>) -> Result<Summary, TaskError> {
    let summary = Pipeline::new(&inv.task)
        .root(inv.context().project_root())
        .sources(globs)
        .read(false)
        .include_dirs(true)
        .sink(Remove)
        .run()
        .await?;
    Ok(summary)
}

/// Empties the application's cache folders.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanCache;

#[async_trait]
impl TaskBody for CleanCache {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        let globs = inv.context().paths().cache_clean_globs();
        remove_all(inv, globs).await.map(Some)
    }
}

/// Removes the deployed static files and preprocessed views of the theme.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanStatic;

#[async_trait]
impl TaskBody for CleanStatic {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        let ctx = inv.context();
        let globs = ctx.paths().static_clean_globs(ctx.theme());
        remove_all(inv, globs).await.map(Some)
    }
}
