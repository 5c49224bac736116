//! Task graph execution.
//!
//! - [`context`]: the read-only [`BuildContext`] shared by every task
//! - [`graph`]: task registry, series/parallel composition and the scheduler
//! - [`report`]: [`RunReport`] describing what a run did

pub mod context;
pub mod graph;
pub mod report;

pub use context::BuildContext;
pub use graph::{
    FnBody, Invocation, SchedulerError, TaskBody, TaskDescriptor, TaskError, TaskGraph, TaskKind,
};
pub use report::{format_duration, RunReport, TaskRun};
