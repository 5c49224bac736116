//! Task registry and scheduler.
//!
//! Tasks are leaves (a body that usually runs one pipeline) or composites
//! that run named children in series or in parallel. The registry rejects
//! duplicate names and cycles; a run checks the whole closure of the
//! requested task before executing anything.

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

use super::context::BuildContext;
use super::report::{format_duration, RunReport, TaskRun};
use crate::pipeline::{PipelineError, Summary};
use crate::validate::ValidationError;
use crate::watch::WatchError;

/// Error raised by a leaf task body.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("{0}")]
    Failed(String),
}

/// Error raised by the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("unknown task '{name}'{}", .parent.as_ref().map(|p| format!(" (referenced by '{}')", p)).unwrap_or_default())]
    UnknownTask { name: String, parent: Option<String> },

    #[error("task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("cyclic task graph: {}", .cycle.join(" -> "))]
    CyclicTaskGraph { cycle: Vec<String> },

    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: TaskError,
    },

    #[error("'{task}': {} parallel task(s) failed", .failures.len())]
    ParallelFailed { task: String, failures: Vec<SchedulerError> },
}

impl SchedulerError {
    /// Errors raised before any task body ran
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            SchedulerError::UnknownTask { .. }
                | SchedulerError::DuplicateTask(_)
                | SchedulerError::CyclicTaskGraph { .. }
        )
    }

    /// Every failed leaf with its error, flattening parallel groups
    pub fn leaf_failures(&self) -> Vec<(&str, &TaskError)> {
        match self {
            SchedulerError::TaskFailed { task, source } => vec![(task.as_str(), source)],
            SchedulerError::ParallelFailed { failures, .. } => {
                failures.iter().flat_map(|f| f.leaf_failures()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// What a task body receives when it runs.
#[derive(Clone)]
pub struct Invocation {
    pub graph: Arc<TaskGraph>,
    pub task: String,
}

impl Invocation {
    pub fn context(&self) -> &BuildContext {
        self.graph.context()
    }
}

/// The work of a leaf task.
#[async_trait]
pub trait TaskBody: Send + Sync {
    /// Run once; a pipeline-backed task returns its summary
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError>;
}

/// A task body built from an async closure.
pub struct FnBody<F>(F);

#[async_trait]
impl<F, Fut> TaskBody for FnBody<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Summary>, TaskError>> + Send + 'static,
{
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        (self.0)(inv.clone()).await
    }
}

/// Shape of a task.
#[derive(Clone)]
pub enum TaskKind {
    Leaf(Arc<dyn TaskBody>),
    Series(Vec<String>),
    Parallel(Vec<String>),
}

impl TaskKind {
    fn children(&self) -> &[String] {
        match self {
            TaskKind::Leaf(_) => &[],
            TaskKind::Series(children) | TaskKind::Parallel(children) => children,
        }
    }
}

impl fmt::Debug for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Leaf(_) => write!(f, "Leaf"),
            TaskKind::Series(children) => write!(f, "Series({})", children.join(", ")),
            TaskKind::Parallel(children) => write!(f, "Parallel({})", children.join(", ")),
        }
    }
}

/// A named task.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub name: String,
    pub kind: TaskKind,
    pub description: Option<String>,
}

impl TaskDescriptor {
    pub fn leaf(name: &str, body: impl TaskBody + 'static) -> Self {
        Self { name: name.to_string(), kind: TaskKind::Leaf(Arc::new(body)), description: None }
    }

    /// Leaf from an async closure
    pub fn leaf_fn<F, Fut>(name: &str, f: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Summary>, TaskError>> + Send + 'static,
    {
        Self::leaf(name, FnBody(f))
    }

    pub fn series(name: &str, children: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: TaskKind::Series(children.iter().map(|c| c.to_string()).collect()),
            description: None,
        }
    }

    pub fn parallel(name: &str, children: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: TaskKind::Parallel(children.iter().map(|c| c.to_string()).collect()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// `series(a, b)` / `parallel(a, b)` / `task`
    pub fn composition(&self) -> String {
        match &self.kind {
            TaskKind::Leaf(_) => "task".to_string(),
            TaskKind::Series(c) => format!("series({})", c.join(", ")),
            TaskKind::Parallel(c) => format!("parallel({})", c.join(", ")),
        }
    }
}

/// Registry of named tasks plus the shared invocation context.
pub struct TaskGraph {
    context: Arc<BuildContext>,
    tasks: HashMap<String, TaskDescriptor>,
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraph").field("tasks", &self.names()).finish()
    }
}

impl TaskGraph {
    pub fn new(context: BuildContext) -> Self {
        Self { context: Arc::new(context), tasks: HashMap::new() }
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn get(&self, name: &str) -> Option<&TaskDescriptor> {
        self.tasks.get(name)
    }

    /// Register a new task.
    ///
    /// Fails on a duplicate name, or when the task would close a cycle with
    /// the tasks already registered. Children may be registered later.
    pub fn register(&mut self, task: TaskDescriptor) -> Result<(), SchedulerError> {
        if self.tasks.contains_key(&task.name) {
            return Err(SchedulerError::DuplicateTask(task.name));
        }
        self.check_acyclic(&task)?;
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    /// Register or overwrite a task, returning the previous definition.
    pub fn replace(&mut self, task: TaskDescriptor) -> Result<Option<TaskDescriptor>, SchedulerError> {
        self.check_acyclic(&task)?;
        Ok(self.tasks.insert(task.name.clone(), task))
    }

    fn kinds(&self) -> HashMap<&str, &TaskKind> {
        self.tasks.iter().map(|(name, task)| (name.as_str(), &task.kind)).collect()
    }

    fn check_acyclic(&self, candidate: &TaskDescriptor) -> Result<(), SchedulerError> {
        let mut kinds = self.kinds();
        kinds.insert(candidate.name.as_str(), &candidate.kind);
        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        match visit(&candidate.name, None, &kinds, &mut visited, &mut stack, false) {
            Err(e @ SchedulerError::CyclicTaskGraph { .. }) => Err(e),
            _ => Ok(()),
        }
    }

    /// Check that `name` and everything it reaches exist and form no cycle.
    pub fn preflight(&self, name: &str) -> Result<(), SchedulerError> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        visit(name, None, &self.kinds(), &mut visited, &mut stack, true)
    }

    /// Run a task and everything it composes.
    ///
    /// Nothing executes when the preflight check fails.
    pub async fn run(self: &Arc<Self>, name: &str) -> Result<RunReport, SchedulerError> {
        self.preflight(name)?;
        let start = Instant::now();
        let mut report = RunReport::new(name);
        report.merge(Arc::clone(self).run_node(name.to_string()).await?);
        Ok(report.with_duration(start.elapsed()))
    }

    fn run_node(self: Arc<Self>, name: String) -> BoxFuture<'static, Result<RunReport, SchedulerError>> {
        async move {
            let kind = self
                .tasks
                .get(&name)
                .map(|t| t.kind.clone())
                .ok_or_else(|| SchedulerError::UnknownTask { name: name.clone(), parent: None })?;

            let mut report = RunReport::new(&name);
            match kind {
                TaskKind::Leaf(body) => {
                    let inv = Invocation { graph: Arc::clone(&self), task: name.clone() };
                    info!(task = %name, "Starting '{}'", name);
                    let start = Instant::now();
                    match body.run(&inv).await {
                        Ok(summary) => {
                            let duration = start.elapsed();
                            info!(task = %name, "Finished '{}' after {}", name, format_duration(duration));
                            report.add_run(TaskRun { task: name, duration, summary });
                        }
                        Err(source) => {
                            error!(task = %name, "'{}' errored: {}", name, source);
                            return Err(SchedulerError::TaskFailed { task: name, source });
                        }
                    }
                }
                TaskKind::Series(children) => {
                    for child in children {
                        let child_report = Arc::clone(&self).run_node(child).await?;
                        report.merge(child_report);
                    }
                }
                TaskKind::Parallel(children) => {
                    let runs = children.into_iter().map(|child| Arc::clone(&self).run_node(child));
                    let mut failures = Vec::new();
                    for result in join_all(runs).await {
                        match result {
                            Ok(child_report) => report.merge(child_report),
                            Err(e) => failures.push(e),
                        }
                    }
                    if !failures.is_empty() {
                        return Err(SchedulerError::ParallelFailed { task: name, failures });
                    }
                }
            }
            Ok::<_, SchedulerError>(report)
        }
        .boxed()
    }
}

/// Depth-first walk with the visited/visiting sets of a topological sort.
///
/// `stack` holds the current path so a cycle can be reported in full.
fn visit(
    name: &str,
    parent: Option<&str>,
    kinds: &HashMap<&str, &TaskKind>,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
    require_known: bool,
) -> Result<(), SchedulerError> {
    if visited.contains(name) {
        return Ok(());
    }
    if let Some(pos) = stack.iter().position(|n| n == name) {
        let mut cycle = stack[pos..].to_vec();
        cycle.push(name.to_string());
        return Err(SchedulerError::CyclicTaskGraph { cycle });
    }

    let Some(kind) = kinds.get(name) else {
        if require_known {
            return Err(SchedulerError::UnknownTask {
                name: name.to_string(),
                parent: parent.map(str::to_string),
            });
        }
        return Ok(());
    };

    stack.push(name.to_string());
    for child in kind.children() {
        visit(child, Some(name), kinds, visited, stack, require_known)?;
    }
    stack.pop();
    visited.insert(name.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::theme::ThemeResolver;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> BuildContext {
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
        BuildContext::new(config, PathBuf::from("."), theme)
    }

    fn ok_task(name: &str) -> TaskDescriptor {
        TaskDescriptor::leaf_fn(name, |_inv| async { Ok(None) })
    }

    fn failing_task(name: &str) -> TaskDescriptor {
        TaskDescriptor::leaf_fn(name, |inv| async move {
            Err(TaskError::Failed(format!("{} broke", inv.task)))
        })
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut graph = TaskGraph::new(context());
        graph.register(ok_task("a")).unwrap();
        let err = graph.register(ok_task("a")).unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateTask(ref n) if n == "a"));
        assert!(graph.replace(ok_task("a")).unwrap().is_some());
    }

    #[test]
    fn test_self_cycle_rejected() {
        let mut graph = TaskGraph::new(context());
        let err = graph.register(TaskDescriptor::series("loop", &["loop"])).unwrap_err();
        match err {
            SchedulerError::CyclicTaskGraph { cycle } => assert_eq!(cycle, vec!["loop", "loop"]),
            other => panic!("expected cycle, got {:?}", other),
        }
        assert!(graph.get("loop").is_none());
    }

    #[test]
    fn test_indirect_cycle_rejected() {
        let mut graph = TaskGraph::new(context());
        graph.register(TaskDescriptor::series("a", &["b"])).unwrap();
        graph.register(TaskDescriptor::parallel("b", &["c"])).unwrap();
        let err = graph.register(TaskDescriptor::series("c", &["a"])).unwrap_err();
        assert_eq!(err.to_string(), "cyclic task graph: c -> a -> b -> c");
        assert!(err.is_construction());
    }

    #[test]
    fn test_preflight_unknown_child() {
        let mut graph = TaskGraph::new(context());
        graph.register(TaskDescriptor::series("styles", &["lint-styles", "compile-styles"])).unwrap();
        graph.register(ok_task("lint-styles")).unwrap();
        let err = graph.preflight("styles").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown task 'compile-styles' (referenced by 'styles')"
        );
        assert!(matches!(graph.preflight("nope"), Err(SchedulerError::UnknownTask { parent: None, .. })));
    }

    #[tokio::test]
    async fn test_unknown_child_runs_nothing() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut graph = TaskGraph::new(context());
        let c = counter.clone();
        graph
            .register(TaskDescriptor::leaf_fn("first", move |_| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                }
            }))
            .unwrap();
        graph.register(TaskDescriptor::series("all", &["first", "missing"])).unwrap();
        let graph = Arc::new(graph);

        assert!(graph.run("all").await.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_series_runs_in_order() {
        let mut graph = TaskGraph::new(context());
        for name in ["a", "b", "c"] {
            graph.register(ok_task(name)).unwrap();
        }
        graph.register(TaskDescriptor::series("abc", &["a", "b", "c"])).unwrap();
        let graph = Arc::new(graph);

        let report = graph.run("abc").await.unwrap();
        assert_eq!(report.executed(), vec!["a", "b", "c"]);
        assert_eq!(report.requested, "abc");
    }

    #[tokio::test]
    async fn test_parallel_collects_every_failure() {
        let mut graph = TaskGraph::new(context());
        graph.register(failing_task("x")).unwrap();
        graph.register(ok_task("y")).unwrap();
        graph.register(failing_task("z")).unwrap();
        graph.register(TaskDescriptor::parallel("group", &["x", "y", "z"])).unwrap();
        let graph = Arc::new(graph);

        let err = graph.run("group").await.unwrap_err();
        let failed: Vec<&str> = err.leaf_failures().into_iter().map(|(t, _)| t).collect();
        assert_eq!(failed, vec!["x", "z"]);
        assert_eq!(err.to_string(), "'group': 2 parallel task(s) failed");
        assert!(!err.is_construction());
    }

    #[test]
    fn test_composition_and_names() {
        let mut graph = TaskGraph::new(context());
        graph.register(TaskDescriptor::series("styles", &["lint", "compile"])).unwrap();
        graph.register(ok_task("lint").with_description("lint stylesheets")).unwrap();
        assert_eq!(graph.names(), vec!["lint", "styles"]);
        assert_eq!(graph.get("styles").unwrap().composition(), "series(lint, compile)");
        assert_eq!(graph.get("lint").unwrap().composition(), "task");
    }
}
