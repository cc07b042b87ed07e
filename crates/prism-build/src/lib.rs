//! Prism build orchestration
//!
//! Turns an installed package tree into compiled form:
//! - Format selection per entry-point, with alias collapsing
//! - Idempotency markers in each entry-point manifest
//! - Dependency-ordered scheduling on a bounded worker pool
//! - Output writing in place (with backups) or side-by-side
//!
//! The source transformation itself is supplied by the caller through
//! [`Transformer`].

pub mod error;
pub mod formats;
pub mod logging;
pub mod marker;
pub mod orchestrator;
pub mod scheduler;
pub mod task;
pub mod transformer;
pub mod writer;

// Re-export main types
pub use error::{BuildError, BuildResult};
pub use formats::{AliasClass, CompileStep, EntryPointPlan, FormatPlan, FormatResolver};
pub use logging::{LogLevel, Logger, MemoryLogger, TracingLogger};
pub use marker::{is_processed, MarkingStore};
pub use orchestrator::{Orchestrator, ProcessOptions, RunHandle, RunSummary};
pub use scheduler::{ExecutionMode, TaskScheduler};
pub use task::{Task, TaskExecutor, TaskQueue, TaskReport};
pub use transformer::{
    Diagnostic, EntryPointBundle, TransformOutcome, TransformedFile, Transformer,
};
pub use writer::{CompiledFormat, OutputWriter, WritePolicy, BACKUP_SUFFIX, POINTER_SUFFIX};

// Re-export prism-package types for convenience
pub use prism_package::{EntryPoint, EntryPointFormat, FormatProperty, PathMappings};
