//! Prism package model
//!
//! Discovers entry-points in an installed package tree, resolves the modules
//! their compiled formats import and orders them so dependencies come first.

pub mod build_order;
pub mod dependency_host;
pub mod entry_point;
pub mod format;
pub mod locator;
pub mod manifest;
pub mod module_resolver;
pub mod path_mappings;
pub mod paths;
pub mod resolver;

pub use build_order::DependencyGraph;
pub use dependency_host::{
    host_for, CollectedDependencies, DeepImport, DependencyCollector, DependencyHost,
    DependencyInfo,
};
pub use entry_point::{EntryPoint, EntryPointStatus, PackageInfo};
pub use format::{EntryPointFormat, FormatProperty, TYPINGS_PROPERTY};
pub use locator::{DiscoveredEntryPoints, EntryPointLocator, OUTPUT_DIR_NAME};
pub use manifest::{Manifest, MANIFEST_FILE_NAME, PROCESSED_MARKERS_KEY};
pub use module_resolver::{ModuleResolver, ResolvedModule};
pub use path_mappings::PathMappings;
pub use resolver::{
    DependencyResolver, InvalidEntryPoint, ResolvedDependencies, SortedEntryPoints,
};

use std::path::PathBuf;

/// Package model errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Failed to read {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to parse manifest {path}: {error}")]
    ManifestParse {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("Invalid manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("Invalid tsconfig {path}: {reason}")]
    InvalidTsConfig { path: PathBuf, reason: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("The target entry-point \"{target}\" has missing dependencies:\n{}", format_missing(.missing))]
    MissingDependencies { target: PathBuf, missing: Vec<String> },

    #[error("Entry-point not found: {0}")]
    EntryPointNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] prism_config::ConfigError),
}

impl PackageError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}

fn format_missing(missing: &[String]) -> String {
    missing
        .iter()
        .map(|specifier| format!(" - {}", specifier))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, PackageError>;
