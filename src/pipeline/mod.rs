//! Streaming file pipelines.
//!
//! A [`Pipeline`] enumerates files from an ordered glob list, streams them
//! through a bounded channel, and passes each one through its stages in
//! declared order. Stage failures are per file: the record is dropped, the
//! error lands in the [`Summary`], and the rest of the stream continues.
//!
//! ```ignore
//! let summary = Pipeline::new("lint-styles")
//!     .root(&ctx.project_root)
//!     .source(paths.source_glob(&theme))
//!     .exclude("**/_module.less")
//!     .transform(CommandCheck::new("stylelint", lint_command))
//!     .run()
//!     .await?;
//! ```

pub mod result;
pub mod runner;
pub mod source;
pub mod stage;

pub use result::{PipelineError, Summary};
pub use runner::{Pipeline, DEFAULT_BUFFER};
pub use source::{glob_base, SourceList, SourcePattern};
pub use stage::{Effect, FileRecord, Sink, Stage, StageError, StageErrorKind, Transform};
