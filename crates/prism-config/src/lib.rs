//! Prism Configuration System
//!
//! Provides the processing configuration consulted while discovering
//! entry-points:
//! - Project configuration (`prism.config.toml` next to the package tree)
//! - Package-level configuration (`prism.config.toml` inside a package)
//! - Per entry-point policies (`ignore`, property overrides, deep re-exports)
//!
//! # Configuration Precedence
//!
//! For a given package the first matching source wins:
//! 1. Project config, version-qualified key (`"some-lib@^2.0.0"`)
//! 2. Project config, plain key (`"some-lib"`)
//! 3. Package-level config shipped inside the package
//!
//! # Example
//!
//! ```no_run
//! use prism_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::load(Path::new(".")).unwrap();
//! let policy = loader
//!     .package_policy(Path::new("node_modules/some-lib"), "some-lib", Some("1.2.0"))
//!     .unwrap();
//! assert!(!policy.policy_for("./testing").ignore);
//! ```

pub mod loader;
pub mod policy;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Name of the configuration file looked up in the project and package roots
pub const CONFIG_FILE_NAME: &str = "prism.config.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid version range '{range}' for package '{package}': {error}")]
    InvalidVersionRange {
        package: String,
        range: String,
        error: semver::Error,
    },

    #[error("Invalid deep import matcher '{pattern}' for package '{package}': {error}")]
    InvalidMatcher {
        package: String,
        pattern: String,
        error: regex::Error,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::ConfigLoader;
pub use policy::{normalize_entry_point_path, EntryPointPolicy, PackagePolicy, PropertyOverride};
pub use project::{EntryPointConfig, PackageConfig, ProcessingConfig};
