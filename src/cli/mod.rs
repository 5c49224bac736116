//! Command-line interface implementation
//!
//! Every subcommand names one registered task. Global flags select the
//! configuration, project root and theme; task options are only accepted by
//! the subcommands that use them.

mod args;
mod setup;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

pub use args::{GlobalArgs, MediaArgs, ResizeArgs};
pub use setup::{build_context, resolve_root, SetupError};

use crate::options::TaskOptions;
use crate::task::{RunReport, SchedulerError, TaskGraph, TaskKind};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// themeforge - build front-end assets for configured themes
#[derive(Parser, Debug)]
#[command(name = "tforge")]
#[command(about = "themeforge - lint, compile, optimize and deploy theme assets")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lint the theme's stylesheet sources
    LintStyles,
    /// Compile stylesheet entries into the static CSS folder
    CompileStyles,
    /// Lint the theme's scripts
    LintScripts,
    /// Optimize the theme's PNG, JPEG and SVG files in place
    OptimizeThemeImages,
    /// Optimize every image of a media folder
    OptimizeMediaImages(MediaArgs),
    /// Resize images matched by a glob
    ResizeImages(ResizeArgs),
    /// Empty the application cache folders
    CleanCache,
    /// Remove deployed static files of the theme
    CleanStatic,
    /// Deploy the theme's stylesheet sources
    Source,
    /// Full static content deploy of the theme
    DeployStatic,
    /// Static content deploy of the admin theme
    DeployAdmin,
    /// Re-run 'styles' whenever stylesheet sources change
    Watch,
    /// lint-styles, then compile-styles
    Styles,
    /// lint-scripts
    Scripts,
    /// clean-static, source, styles
    Refresh,
    /// clean-cache, clean-static, source, styles, watch
    FullThemeSetup,
    /// List registered tasks
    Tasks,
}

impl Commands {
    /// Registered task run by this subcommand; `None` for `tasks`
    pub fn task_name(&self) -> Option<&'static str> {
        Some(match self {
            Commands::LintStyles => "lint-styles",
            Commands::CompileStyles => "compile-styles",
            Commands::LintScripts => "lint-scripts",
            Commands::OptimizeThemeImages => "optimize-theme-images",
            Commands::OptimizeMediaImages(_) => "optimize-media-images",
            Commands::ResizeImages(_) => "resize-images",
            Commands::CleanCache => "clean-cache",
            Commands::CleanStatic => "clean-static",
            Commands::Source => "source",
            Commands::DeployStatic => "deploy-static",
            Commands::DeployAdmin => "deploy-admin",
            Commands::Watch => "watch",
            Commands::Styles => "styles",
            Commands::Scripts => "scripts",
            Commands::Refresh => "refresh",
            Commands::FullThemeSetup => "full-theme-setup",
            Commands::Tasks => return None,
        })
    }

    /// Task option records filled from this subcommand's flags
    pub fn options(&self) -> TaskOptions {
        let mut options = TaskOptions::default();
        match self {
            Commands::ResizeImages(args) => options.resize = args.clone().into(),
            Commands::OptimizeMediaImages(args) => options.media = args.clone().into(),
            _ => {}
        }
        options
    }
}

/// Print the task table: name, composition, description
fn list_tasks(graph: &TaskGraph) {
    let width = graph.names().iter().map(|n| n.len()).max().unwrap_or(0);
    for name in graph.names() {
        let Some(task) = graph.get(name) else { continue };
        let detail = match task.kind {
            TaskKind::Leaf(_) => task.description.clone().unwrap_or_default(),
            _ => task.composition(),
        };
        println!("{:width$}  {}", name, detail, width = width);
    }
}

fn scheduler_status(e: &SchedulerError) -> u8 {
    if e.is_construction() {
        EXIT_INVALID_ARGS
    } else {
        EXIT_ERROR
    }
}

/// Exit status of a finished run.
///
/// Stage-level failures recorded in the report do not change the status.
pub(crate) fn exit_status(outcome: &Result<RunReport, SchedulerError>) -> u8 {
    match outcome {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => scheduler_status(e),
    }
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    crate::logging::init(cli.global.verbose, cli.global.quiet);

    let context = match build_context(&cli.global, cli.command.options()) {
        Ok(context) => context,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let graph = match crate::tasks::builtin_graph(context) {
        Ok(graph) => Arc::new(graph),
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(scheduler_status(&e));
        }
    };

    let Some(task) = cli.command.task_name() else {
        list_tasks(&graph);
        return ExitCode::from(EXIT_SUCCESS);
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start async runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let outcome = runtime.block_on(graph.run(task));
    match &outcome {
        Ok(report) => {
            if cli.global.json {
                match serde_json::to_string_pretty(report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("failed to serialize run report: {}", e);
                        return ExitCode::from(EXIT_ERROR);
                    }
                }
            } else if !cli.global.quiet {
                println!("{}", report.summary());
            }
        }
        Err(e) => {
            for (task, failure) in e.leaf_failures() {
                error!(task, "{}", failure);
            }
            error!("{}", e);
        }
    }
    ExitCode::from(exit_status(&outcome))
}
