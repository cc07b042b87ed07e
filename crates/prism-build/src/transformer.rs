//! The seam to the source transformation
//!
//! Compiling a bundle is someone else's job. The orchestrator hands a
//! [`Transformer`] one bundle per compiled format and writes what comes back.

use crate::error::BuildResult;
use prism_package::{EntryPoint, EntryPointFormat, FormatProperty};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Everything a transformer needs to compile one format of an entry-point
#[derive(Debug, Clone)]
pub struct EntryPointBundle<'a> {
    pub entry_point: &'a EntryPoint,
    /// Property being compiled
    pub property: FormatProperty,
    pub format: EntryPointFormat,
    /// File the property points at
    pub entry_file: PathBuf,
    /// Files reachable from the entry file through relative imports, entry file first
    pub files: Vec<PathBuf>,
    /// Declarations entry file, when declarations are processed with this bundle
    pub typings: Option<PathBuf>,
    pub generate_deep_reexports: bool,
}

/// Output for one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedFile {
    /// Path of the original file
    pub path: PathBuf,
    pub contents: String,
}

impl TransformedFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Whether this is a type declaration file
    pub fn is_declaration(&self) -> bool {
        self.path.to_string_lossy().ends_with(".d.ts")
    }
}

/// A blocking problem found while compiling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} - error: {}",
            self.file.display(),
            self.line,
            self.column,
            self.message
        )
    }
}

/// What a transformer made of a bundle
#[derive(Debug, Clone)]
pub enum TransformOutcome {
    Success(Vec<TransformedFile>),
    Diagnostics(Vec<Diagnostic>),
}

/// Compiles bundles
///
/// Implementations are shared between worker threads.
pub trait Transformer: Send + Sync {
    /// Compile `bundle`. An `Err` is an unexpected fault and aborts the run
    /// just like diagnostics do.
    fn transform(&self, bundle: &EntryPointBundle<'_>) -> BuildResult<TransformOutcome>;
}

/// One diagnostic per line
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
