//! Processing Configuration (prism.config.toml)
//!
//! The project-level file maps package names to per entry-point rules.
//! A package-level file has the same shape as a single `[packages.*]` table.

use crate::policy::{normalize_entry_point_path, EntryPointPolicy, PackagePolicy, PropertyOverride};
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Project configuration from prism.config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Package key (`name` or `name@range`) → package rules
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub packages: BTreeMap<String, PackageConfig>,
}

/// Rules for one package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PackageConfig {
    /// Entry-point path relative to the package root → rules
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub entry_points: BTreeMap<String, EntryPointConfig>,

    /// Regexes over import specifiers; matching deep imports are not reported
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignorable_deep_import_matchers: Vec<String>,
}

/// Rules for one entry-point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct EntryPointConfig {
    /// Exclude the entry-point from processing
    #[serde(default)]
    pub ignore: bool,

    /// Manifest property → path, or `false` to remove the property
    #[serde(default, rename = "override")]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, PropertyOverride>,

    /// Emit deep re-exports for this entry-point
    #[serde(default)]
    pub generate_deep_reexports: bool,
}

impl From<&EntryPointConfig> for EntryPointPolicy {
    fn from(config: &EntryPointConfig) -> Self {
        Self {
            ignore: config.ignore,
            overrides: config.overrides.clone(),
            generate_deep_reexports: config.generate_deep_reexports,
        }
    }
}

impl ProcessingConfig {
    /// Parse a project configuration from TOML text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config = Self::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate keys, version ranges and matchers
    pub fn validate(&self) -> ConfigResult<()> {
        for (key, package) in &self.packages {
            let (name, range) = split_package_key(key);
            if name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("packages.\"{}\"", key),
                    reason: "package name cannot be empty".to_string(),
                });
            }
            if let Some(range) = range {
                parse_range(name, range)?;
            }
            package.validate(name)?;
        }
        Ok(())
    }

    /// Find the rules for a package, preferring a version-qualified key the
    /// installed version satisfies over a plain key
    pub fn package_config(&self, name: &str, version: Option<&str>) -> Option<&PackageConfig> {
        let installed = version.and_then(|v| Version::parse(v).ok());

        let versioned = self.packages.iter().find(|(key, _)| {
            let (key_name, range) = split_package_key(key);
            match (range, &installed) {
                (Some(range), Some(installed)) if key_name == name => VersionReq::parse(range)
                    .map(|req| req.matches(installed))
                    .unwrap_or(false),
                _ => false,
            }
        });

        versioned
            .map(|(_, config)| config)
            .or_else(|| self.packages.get(name))
    }

    /// Pure policy lookup: `(package, version, entry-point path) -> policy`
    pub fn policy_for(
        &self,
        package_name: &str,
        package_version: Option<&str>,
        entry_point_path: &str,
    ) -> EntryPointPolicy {
        self.package_config(package_name, package_version)
            .and_then(|package| {
                package
                    .entry_points
                    .iter()
                    .find(|(path, _)| {
                        normalize_entry_point_path(path)
                            == normalize_entry_point_path(entry_point_path)
                    })
                    .map(|(_, config)| EntryPointPolicy::from(config))
            })
            .unwrap_or_default()
    }
}

impl PackageConfig {
    /// Parse a package-level configuration from TOML text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a package-level configuration file
    pub fn load_from_file(path: &Path, package_name: &str) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config = Self::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate(package_name)?;
        Ok(config)
    }

    fn validate(&self, package_name: &str) -> ConfigResult<()> {
        self.compile_matchers(package_name).map(|_| ())
    }

    fn compile_matchers(&self, package_name: &str) -> ConfigResult<Vec<Regex>> {
        self.ignorable_deep_import_matchers
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|error| ConfigError::InvalidMatcher {
                    package: package_name.to_string(),
                    pattern: pattern.clone(),
                    error,
                })
            })
            .collect()
    }

    /// Compile into the lookup table used during discovery
    pub fn to_policy(&self, package_name: &str) -> ConfigResult<PackagePolicy> {
        let matchers = self.compile_matchers(package_name)?;
        let entry_points = self
            .entry_points
            .iter()
            .map(|(path, config)| (normalize_entry_point_path(path), EntryPointPolicy::from(config)))
            .collect();
        Ok(PackagePolicy::new(entry_points, matchers))
    }
}

/// Split `"@scope/name@^1.0.0"` into `("@scope/name", Some("^1.0.0"))`
fn split_package_key(key: &str) -> (&str, Option<&str>) {
    match key.rfind('@') {
        Some(idx) if idx > 0 => (&key[..idx], Some(&key[idx + 1..])),
        _ => (key, None),
    }
}

fn parse_range(package: &str, range: &str) -> ConfigResult<VersionReq> {
    VersionReq::parse(range).map_err(|error| ConfigError::InvalidVersionRange {
        package: package.to_string(),
        range: range.to_string(),
        error,
    })
}
