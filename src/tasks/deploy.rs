//! Tasks delegating to the application CLI.

use async_trait::async_trait;
use std::time::Instant;

use crate::pipeline::Summary;
use crate::stages::Exec;
use crate::task::{Invocation, TaskBody, TaskError};

/// Theme deployed by `deploy-admin`
pub const ADMIN_THEME: &str = "Magento/backend";

async fn exec(inv: &Invocation, args: Vec<String>) -> Result<Option<Summary>, TaskError> {
    let ctx = inv.context();
    let start = Instant::now();
    let exec = Exec::new(&inv.task, &ctx.config().tools.magento, args).with_cwd(ctx.project_root());
    tracing::debug!(task = %inv.task, "{}", exec.command_line());

    let mut summary = Summary::new(&inv.task);
    match exec.run().await {
        Ok(effect) => {
            summary.effects.push(effect);
            summary.processed = 1;
        }
        Err(err) => {
            tracing::warn!(task = %inv.task, stage = %err.stage, "{}", err.message);
            summary.failures.push(err);
        }
    }
    summary.duration = start.elapsed();
    Ok(Some(summary))
}

/// Links the theme's stylesheet sources into the static tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceTheme;

#[async_trait]
impl TaskBody for SourceTheme {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        exec(inv, source_args(inv.context().theme())).await
    }
}

fn source_args(theme: &crate::theme::ThemeDescriptor) -> Vec<String> {
    let mut args = vec![
        "dev:source-theme:deploy".to_string(),
        "--theme".to_string(),
        theme.qualified_name(),
        "--locale".to_string(),
        theme.locale.clone(),
    ];
    args.extend(theme.files.iter().cloned());
    args
}

fn static_deploy_args(theme: &str) -> Vec<String> {
    ["setup:static-content:deploy", "--theme", theme, "-v", "-f"].map(String::from).to_vec()
}

/// Full static content deployment of the selected theme.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployStatic;

#[async_trait]
impl TaskBody for DeployStatic {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        exec(inv, static_deploy_args(&inv.context().theme().qualified_name())).await
    }
}

/// Static content deployment of the admin theme.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployAdmin;

#[async_trait]
impl TaskBody for DeployAdmin {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        exec(inv, static_deploy_args(ADMIN_THEME)).await
    }
}
