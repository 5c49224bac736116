//! `watch`

use async_trait::async_trait;
use std::sync::Arc;

use crate::pipeline::Summary;
use crate::task::{Invocation, TaskBody, TaskError};
use crate::watch::WatchTrigger;

/// Task re-run when a compiled-tree source changes
pub const WATCH_TARGET: &str = "styles";

/// Watches the theme's deployed stylesheet sources and re-runs `styles`.
///
/// Never finishes on its own; a series containing it stays open until the
/// process is interrupted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Watch;

#[async_trait]
impl TaskBody for Watch {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        let ctx = inv.context();
        let glob = ctx.paths().compiled_glob(ctx.theme());
        WatchTrigger::new(Arc::clone(&inv.graph)).subscribe(&glob, WATCH_TARGET).await?;
        Ok(None)
    }
}
