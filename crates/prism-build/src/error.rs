/// Orchestrator error types
use prism_config::ConfigError;
use prism_package::PackageError;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "No supported format property to consider among [{}]. Supported properties: {}",
        .requested.join(", "),
        .supported.join(", ")
    )]
    UnsupportedProperties {
        requested: Vec<String>,
        supported: Vec<String>,
    },

    #[error(
        "The target entry-point \"{}\" has missing dependencies:\n{}",
        .target.display(),
        bullet_list(.missing)
    )]
    MissingDependencies { target: PathBuf, missing: Vec<String> },

    #[error(
        "Unable to process any formats for the following entry-points (tried {}):\n{}",
        .properties.join(", "),
        path_list(.paths)
    )]
    UnprocessableEntryPoints {
        properties: Vec<String>,
        paths: Vec<PathBuf>,
    },

    #[error("Failed to compile entry-point {entry_point}:\n{message}")]
    Compilation { entry_point: String, message: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error(
        "The entry-point {} was processed by prism {found} but this is prism {current}; \
         reinstall the package tree before processing it again",
        .path.display()
    )]
    OutdatedMarker {
        path: PathBuf,
        found: String,
        current: String,
    },

    #[error("Refusing to overwrite {}: backup file {} already exists", .path.display(), .backup.display())]
    BackupExists { path: PathBuf, backup: PathBuf },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Task for {entry_point} panicked: {message}")]
    TaskPanicked { entry_point: String, message: String },

    #[error("The run stopped without reporting a result")]
    Aborted,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Package error: {0}")]
    Package(PackageError),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a compilation error
    pub fn compilation(entry_point: impl Into<String>, message: impl ToString) -> Self {
        Self::Compilation {
            entry_point: entry_point.into(),
            message: message.to_string(),
        }
    }

    /// Create an unsupported-properties error listing every supported name
    pub fn unsupported_properties(requested: &[String]) -> Self {
        Self::UnsupportedProperties {
            requested: requested.to_vec(),
            supported: prism_package::FormatProperty::supported_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl From<PackageError> for BuildError {
    fn from(error: PackageError) -> Self {
        match error {
            PackageError::MissingDependencies { target, missing } => {
                Self::MissingDependencies { target, missing }
            }
            PackageError::CircularDependency(cycle) => Self::CircularDependency(cycle),
            PackageError::Config(error) => Self::Config(error),
            PackageError::Io { path, error } => Self::IoError { path, error },
            other => Self::Package(other),
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!(" - {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn path_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!(" - {}", path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}
