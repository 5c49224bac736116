//! Stages backed by external programs.
//!
//! Argument templates may contain `{name}` placeholders. Per-file stages fill
//! in `{file}` (absolute path) and `{relative}` (path below the glob base);
//! unknown placeholders are left as written.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::debug;

use crate::config::CommandConfig;
use crate::pipeline::{Effect, FileRecord, StageError, StageErrorKind, Transform};

/// Lines of tool output kept in a stage error
const MAX_DIAGNOSTIC_LINES: usize = 20;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"))
}

/// Substitute `{name}` placeholders in one argument.
pub fn render_arg(arg: &str, vars: &HashMap<&str, String>) -> String {
    placeholder()
        .replace_all(arg, |caps: &regex::Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Substitute placeholders in every argument of a template
pub fn render_args(args: &[String], vars: &HashMap<&str, String>) -> Vec<String> {
    args.iter().map(|arg| render_arg(arg, vars)).collect()
}

fn file_vars(record: &FileRecord) -> HashMap<&'static str, String> {
    HashMap::from([
        ("file", record.path.to_string_lossy().into_owned()),
        ("relative", record.relative_path().to_string_lossy().into_owned()),
    ])
}

/// Run a program to completion, capturing its output.
pub async fn run_program(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
) -> std::io::Result<Output> {
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    debug!(program, ?args, "spawning");
    command.output().await
}

/// Trimmed diagnostic text of a failed run
fn diagnostics(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() { stdout } else { stderr };
    let mut lines: Vec<&str> = text.trim().lines().take(MAX_DIAGNOSTIC_LINES + 1).collect();
    if lines.len() > MAX_DIAGNOSTIC_LINES {
        lines.truncate(MAX_DIAGNOSTIC_LINES);
        lines.push("...");
    }
    match output.status.code() {
        Some(code) if lines.is_empty() => format!("exited with status {}", code),
        Some(code) => format!("exited with status {}:\n{}", code, lines.join("\n")),
        None => "terminated by signal".to_string(),
    }
}

async fn run_for(
    stage: &str,
    command: &CommandConfig,
    cwd: Option<&Path>,
    path: &Path,
    vars: &HashMap<&str, String>,
) -> Result<Output, StageError> {
    let args = render_args(&command.args, vars);
    let output = run_program(&command.command, &args, cwd).await.map_err(|e| {
        StageError::new(
            stage,
            path,
            StageErrorKind::Io,
            format!("failed to run '{}': {}", command.command, e),
        )
    })?;
    if !output.status.success() {
        return Err(StageError::new(stage, path, StageErrorKind::Subprocess, diagnostics(&output)));
    }
    Ok(output)
}

/// Runs a checker per file; the record passes through unchanged when the
/// program exits successfully. Used for linters.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    name: String,
    command: CommandConfig,
    cwd: Option<PathBuf>,
}

impl CommandCheck {
    pub fn new(name: &str, command: CommandConfig) -> Self {
        Self { name: name.to_string(), command, cwd: None }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[async_trait]
impl Transform for CommandCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transform(&self, record: FileRecord) -> Result<Option<FileRecord>, StageError> {
        let vars = file_vars(&record);
        run_for(&self.name, &self.command, self.cwd.as_deref(), &record.path, &vars).await?;
        Ok(Some(record))
    }
}

/// Runs a program per file and replaces the record's contents with its
/// stdout. Used for stylesheet compilers.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    name: String,
    command: CommandConfig,
    cwd: Option<PathBuf>,
    extension: Option<String>,
}

impl CommandTransform {
    pub fn new(name: &str, command: CommandConfig) -> Self {
        Self { name: name.to_string(), command, cwd: None, extension: None }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Rename the record to this extension on success
    pub fn with_extension(mut self, ext: &str) -> Self {
        self.extension = Some(ext.to_string());
        self
    }
}

#[async_trait]
impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transform(&self, record: FileRecord) -> Result<Option<FileRecord>, StageError> {
        let vars = file_vars(&record);
        let output =
            run_for(&self.name, &self.command, self.cwd.as_deref(), &record.path, &vars).await?;
        let mut record = record.with_contents(output.stdout);
        if let Some(ext) = &self.extension {
            record = record.with_extension(ext);
        }
        Ok(Some(record))
    }
}

/// Runs a program once with a fixed argument list appended to the configured
/// one. Deploy tasks have no input files, so this is not a pipeline stage.
#[derive(Debug, Clone)]
pub struct Exec {
    name: String,
    command: CommandConfig,
    cwd: Option<PathBuf>,
}

impl Exec {
    /// Create an exec stage running `command` followed by `extra` arguments
    pub fn new<I, S>(name: &str, command: &CommandConfig, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut command = command.clone();
        command.args.extend(extra.into_iter().map(Into::into));
        Self { name: name.to_string(), command, cwd: None }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Rendered command line, for logs and dry runs
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.command.command.clone()];
        parts.extend(self.command.args.iter().cloned());
        parts.join(" ")
    }

    /// Run once without a file
    pub async fn run(&self) -> Result<Effect, StageError> {
        let path = self.cwd.clone().unwrap_or_default();
        let output =
            run_for(&self.name, &self.command, self.cwd.as_deref(), &path, &HashMap::new()).await?;
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(stage = %self.name, "{}", line);
        }
        Ok(Effect::Ran(self.command_line()))
    }
}
