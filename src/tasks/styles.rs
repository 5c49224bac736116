//! Stylesheet tasks: `lint-styles` and `compile-styles`.

use async_trait::async_trait;

use crate::config::loader::resolve_path;
use crate::pipeline::{Pipeline, Summary};
use crate::stages::{Autoprefix, CommandCheck, CommandTransform};
use crate::task::{Invocation, TaskBody, TaskError};

/// Lints the theme's stylesheet sources.
///
/// Violations are logged per file. With `tools.style_lint.fail_on_error` they
/// fail the task once every file has been checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct LintStyles;

#[async_trait]
impl TaskBody for LintStyles {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        let ctx = inv.context();
        let lint = &ctx.config().tools.style_lint;

        let mut pipeline = Pipeline::new(&inv.task)
            .root(ctx.project_root())
            .source(ctx.paths().source_glob(ctx.theme()));
        for pattern in &lint.ignore {
            pipeline = pipeline.exclude(pattern);
        }

        let summary = pipeline
            .read(false)
            .transform(CommandCheck::new("style-lint", lint.command.clone()).with_cwd(ctx.project_root()))
            .fail_after_error(lint.fail_on_error)
            .run()
            .await?;
        Ok(Some(summary))
    }
}

/// Compiles each stylesheet entry of the theme into the static CSS folder.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileStyles;

#[async_trait]
impl TaskBody for CompileStyles {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        let ctx = inv.context();
        let theme = ctx.theme();
        let tools = &ctx.config().tools;
        let paths = ctx.paths();

        let entries = paths.entry_paths(theme).into_iter().map(|p| p.to_string_lossy().into_owned());
        let mut pipeline = Pipeline::new(&inv.task)
            .root(ctx.project_root())
            .sources(entries)
            .read(false)
            .transform(
                CommandTransform::new("style-compiler", tools.style_compiler.clone())
                    .with_cwd(ctx.project_root())
                    .with_extension(&theme.output_extension),
            );
        if tools.autoprefix.enabled {
            pipeline = pipeline.transform(Autoprefix::new(&tools.autoprefix));
        }

        let summary = pipeline.dest(paths.css_output_dir(theme)).run().await?;

        let written = summary.written();
        for entry in &theme.files {
            let expected = resolve_path(ctx.project_root(), &paths.output_path(theme, entry));
            if written.contains(&expected) {
                tracing::debug!(entry = %entry, output = %expected.display(), "compiled");
            } else {
                tracing::warn!(entry = %entry, output = %expected.display(), "entry produced no stylesheet");
            }
        }
        Ok(Some(summary))
    }
}
