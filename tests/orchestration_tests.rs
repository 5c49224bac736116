//! Scheduler behaviour with synthetic leaf tasks.
//!
//! - Series composition stops at the first failure
//! - Parallel composition starts every child and aggregates failures
//! - Cycles and unknown tasks are rejected before anything runs

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use themeforge::config::loader::parse_config;
use themeforge::task::{BuildContext, SchedulerError, TaskDescriptor, TaskError, TaskGraph};
use themeforge::theme::ThemeResolver;

// ============================================================================
// Test Utilities
// ============================================================================

fn create_test_context() -> BuildContext {
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

fn counting(name: &str, counter: &Arc<AtomicUsize>) -> TaskDescriptor {
    let counter = Arc::clone(counter);
    TaskDescriptor::leaf_fn(name, move |_inv| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    })
}

fn failing(name: &str) -> TaskDescriptor {
    TaskDescriptor::leaf_fn(name, |inv| async move {
        Err(TaskError::Failed(format!("{} broke", inv.task)))
    })
}

type Spans = Arc<Mutex<Vec<(String, Instant, Instant)>>>;

fn sleeping(name: &str, spans: &Spans, fail: bool) -> TaskDescriptor {
    let spans = Arc::clone(spans);
    TaskDescriptor::leaf_fn(name, move |inv| {
        let spans = Arc::clone(&spans);
        async move {
            let start = Instant::now();
            tokio::time::sleep(Duration::from_millis(100)).await;
            spans.lock().unwrap().push((inv.task.clone(), start, Instant::now()));
            if fail {
                return Err(TaskError::Failed(format!("{} broke", inv.task)));
            }
            Ok(None)
        }
    })
}

// ============================================================================
// Series
// ============================================================================

#[tokio::test]
async fn test_series_runs_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut graph = TaskGraph::new(create_test_context());
    for name in ["a", "b", "c"] {
        let order = Arc::clone(&order);
        graph
            .register(TaskDescriptor::leaf_fn(name, move |inv| {
                let order = Arc::clone(&order);
                async move {
                    order.lock().unwrap().push(inv.task.clone());
                    Ok(None)
                }
            }))
            .unwrap();
    }
    graph.register(TaskDescriptor::series("all", &["a", "b", "c"])).unwrap();

    let report = Arc::new(graph).run("all").await.unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(report.executed(), vec!["a", "b", "c"]);
    assert_eq!(report.requested, "all");
}

#[tokio::test]
async fn test_series_failure_skips_the_rest() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut graph = TaskGraph::new(create_test_context());
    graph.register(failing("a")).unwrap();
    graph.register(counting("b", &counter)).unwrap();
    graph.register(counting("c", &counter)).unwrap();
    graph.register(TaskDescriptor::series("all", &["a", "b", "c"])).unwrap();

    let err = Arc::new(graph).run("all").await.unwrap_err();
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(matches!(err, SchedulerError::TaskFailed { ref task, .. } if task == "a"));
    assert!(!err.is_construction());
}

#[tokio::test]
async fn test_nested_series_failure_stops_the_outer_series() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut graph = TaskGraph::new(create_test_context());
    graph.register(counting("first", &counter)).unwrap();
    graph.register(failing("broken")).unwrap();
    graph.register(counting("last", &counter)).unwrap();
    graph.register(TaskDescriptor::series("inner", &["first", "broken"])).unwrap();
    graph.register(TaskDescriptor::series("outer", &["inner", "last"])).unwrap();

    assert!(Arc::new(graph).run("outer").await.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Parallel
// ============================================================================

#[tokio::test]
async fn test_parallel_children_overlap() {
    let spans: Spans = Arc::new(Mutex::new(Vec::new()));
    let mut graph = TaskGraph::new(create_test_context());
    graph.register(sleeping("a", &spans, false)).unwrap();
    graph.register(sleeping("b", &spans, false)).unwrap();
    graph.register(TaskDescriptor::parallel("both", &["a", "b"])).unwrap();

    let report = Arc::new(graph).run("both").await.unwrap();
    assert_eq!(report.runs.len(), 2);

    let spans = spans.lock().unwrap();
    let latest_start = spans.iter().map(|(_, start, _)| *start).max().unwrap();
    let earliest_end = spans.iter().map(|(_, _, end)| *end).min().unwrap();
    assert!(latest_start < earliest_end, "children ran one after the other");
}

#[tokio::test]
async fn test_parallel_reports_every_failure() {
    let spans: Spans = Arc::new(Mutex::new(Vec::new()));
    let mut graph = TaskGraph::new(create_test_context());
    graph.register(sleeping("a", &spans, true)).unwrap();
    graph.register(sleeping("b", &spans, true)).unwrap();
    graph.register(sleeping("c", &spans, false)).unwrap();
    graph.register(TaskDescriptor::parallel("group", &["a", "b", "c"])).unwrap();

    let err = Arc::new(graph).run("group").await.unwrap_err();
    assert_eq!(spans.lock().unwrap().len(), 3, "a failing child must not cancel its siblings");
    match &err {
        SchedulerError::ParallelFailed { task, failures } => {
            assert_eq!(task, "group");
            assert_eq!(failures.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    let mut failed: Vec<&str> = err.leaf_failures().into_iter().map(|(task, _)| task).collect();
    failed.sort_unstable();
    assert_eq!(failed, vec!["a", "b"]);
}

#[tokio::test]
async fn test_series_inside_parallel() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut graph = TaskGraph::new(create_test_context());
    graph.register(counting("a", &counter)).unwrap();
    graph.register(counting("b", &counter)).unwrap();
    graph.register(counting("c", &counter)).unwrap();
    graph.register(TaskDescriptor::series("ab", &["a", "b"])).unwrap();
    graph.register(TaskDescriptor::parallel("all", &["ab", "c"])).unwrap();

    let report = Arc::new(graph).run("all").await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert_eq!(report.runs.len(), 3);
}

// ============================================================================
// Construction errors
// ============================================================================

#[test]
fn test_cycle_rejected_at_registration() {
    let mut graph = TaskGraph::new(create_test_context());
    graph.register(TaskDescriptor::series("a", &["b"])).unwrap();
    graph.register(TaskDescriptor::series("b", &["c"])).unwrap();
    let err = graph.register(TaskDescriptor::series("c", &["a"])).unwrap_err();
    assert!(err.is_construction());
    assert_eq!(err.to_string(), "cyclic task graph: c -> a -> b -> c");
    assert!(graph.get("c").is_none());
}

#[tokio::test]
async fn test_unknown_child_runs_nothing() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut graph = TaskGraph::new(create_test_context());
    graph.register(counting("a", &counter)).unwrap();
    graph.register(TaskDescriptor::series("all", &["a", "missing"])).unwrap();

    let err = Arc::new(graph).run("all").await.unwrap_err();
    assert_eq!(err.to_string(), "unknown task 'missing' (referenced by 'all')");
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}
