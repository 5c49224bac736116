//! `lint-scripts`

use async_trait::async_trait;

use crate::pipeline::{Pipeline, Summary};
use crate::stages::CommandCheck;
use crate::task::{Invocation, TaskBody, TaskError};

/// Lints the theme's scripts, skipping minified files and loader configs by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct LintScripts;

#[async_trait]
impl TaskBody for LintScripts {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        let ctx = inv.context();
        let lint = &ctx.config().tools.script_lint;

        let mut pipeline = Pipeline::new(&inv.task)
            .root(ctx.project_root())
            .source(ctx.paths().script_glob(ctx.theme()));
        for pattern in &lint.ignore {
            pipeline = pipeline.exclude(pattern);
        }

        let summary = pipeline
            .read(false)
            .transform(CommandCheck::new("script-lint", lint.command.clone()).with_cwd(ctx.project_root()))
            .fail_after_error(lint.fail_on_error)
            .run()
            .await?;
        Ok(Some(summary))
    }
}
