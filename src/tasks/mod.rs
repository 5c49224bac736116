//! Built-in task catalog.
//!
//! Leaf tasks wrap one pipeline or one application command each; the
//! composites chain them the way a theme developer usually runs them.

mod clean;
mod deploy;
mod images;
mod scripts;
mod styles;
mod watch;

pub use clean::{CleanCache, CleanStatic};
pub use deploy::{DeployAdmin, DeployStatic, SourceTheme, ADMIN_THEME};
pub use images::{resize_spec, OptimizeMediaImages, OptimizeThemeImages, ResizeImages};
pub use scripts::LintScripts;
pub use styles::{CompileStyles, LintStyles};
pub use watch::{Watch, WATCH_TARGET};

use crate::task::{BuildContext, SchedulerError, TaskDescriptor, TaskGraph};

/// Register every built-in leaf task and composite.
pub fn register_builtin(graph: &mut TaskGraph) -> Result<(), SchedulerError> {
    let leaves = [
        TaskDescriptor::leaf("lint-styles", LintStyles).with_description("Lint the theme's stylesheet sources"),
        TaskDescriptor::leaf("compile-styles", CompileStyles)
            .with_description("Compile stylesheet entries into the static CSS folder"),
        TaskDescriptor::leaf("lint-scripts", LintScripts).with_description("Lint the theme's scripts"),
        TaskDescriptor::leaf("optimize-theme-images", OptimizeThemeImages)
            .with_description("Optimize the theme's PNG, JPEG and SVG files in place"),
        TaskDescriptor::leaf("optimize-media-images", OptimizeMediaImages)
            .with_description("Optimize a media folder (--input, --output)"),
        TaskDescriptor::leaf("resize-images", ResizeImages)
            .with_description("Resize images matched by --input (--width/--height)"),
        TaskDescriptor::leaf("clean-cache", CleanCache).with_description("Empty the application cache folders"),
        TaskDescriptor::leaf("clean-static", CleanStatic)
            .with_description("Remove deployed static files and preprocessed views of the theme"),
        TaskDescriptor::leaf("source", SourceTheme).with_description("Deploy the theme's stylesheet sources"),
        TaskDescriptor::leaf("deploy-static", DeployStatic)
            .with_description("Run a full static content deploy of the theme"),
        TaskDescriptor::leaf("deploy-admin", DeployAdmin)
            .with_description("Run a static content deploy of the admin theme"),
        TaskDescriptor::leaf("watch", Watch).with_description("Re-run 'styles' when stylesheet sources change"),
    ];
    for task in leaves {
        graph.register(task)?;
    }

    graph.register(TaskDescriptor::series("styles", &["lint-styles", "compile-styles"]))?;
    graph.register(TaskDescriptor::series("scripts", &["lint-scripts"]))?;
    graph.register(TaskDescriptor::series("refresh", &["clean-static", "source", "styles"]))?;
    graph.register(TaskDescriptor::series(
        "full-theme-setup",
        &["clean-cache", "clean-static", "source", "styles", "watch"],
    ))?;
    Ok(())
}

/// A task graph holding every built-in task.
pub fn builtin_graph(context: BuildContext) -> Result<TaskGraph, SchedulerError> {
    let mut graph = TaskGraph::new(context);
    register_builtin(&mut graph)?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::theme::ThemeResolver;
    use std::path::PathBuf;

    fn graph() -> TaskGraph {
        let config = parse_config(
            r#"
[themes.luma]
vendor = "Acme"
name = "luma"
files = ["css/styles-m"]
"#,
        )
        .unwrap();
        let theme = ThemeResolver::new(&config.themes).resolve(None).unwrap();
        builtin_graph(BuildContext::new(config, PathBuf::from("."), theme)).unwrap()
    }

    #[test]
    fn test_builtin_graph_is_closed() {
        let graph = graph();
        for name in graph.names() {
            graph.preflight(name).unwrap();
        }
        assert_eq!(graph.names().len(), 16);
    }

    #[test]
    fn test_composites() {
        let graph = graph();
        assert_eq!(graph.get("styles").unwrap().composition(), "series(lint-styles, compile-styles)");
        assert_eq!(graph.get("refresh").unwrap().composition(), "series(clean-static, source, styles)");
        assert_eq!(
            graph.get("full-theme-setup").unwrap().composition(),
            "series(clean-cache, clean-static, source, styles, watch)"
        );
        assert_eq!(graph.get("watch").unwrap().composition(), "task");
    }
}
