//! Entry-point policies
//!
//! A policy record is what the rest of the system sees of the configuration:
//! one lookup per entry-point during discovery, no further conditionals.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Replacement for a single manifest property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOverride", into = "RawOverride")]
pub enum PropertyOverride {
    /// Point the property at a different file (relative to the entry-point)
    Path(String),
    /// Remove the property, and its processing marker, from the manifest view
    Absent,
}

impl PropertyOverride {
    /// The overriding path, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Path(path) => Some(path),
            Self::Absent => None,
        }
    }
}

/// TOML has no null: `false` stands for "absent"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawOverride {
    Path(String),
    Flag(bool),
}

#[derive(Debug)]
struct OverrideError;

impl fmt::Display for OverrideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("override must be a path or `false`")
    }
}

impl TryFrom<RawOverride> for PropertyOverride {
    type Error = OverrideError;

    fn try_from(raw: RawOverride) -> Result<Self, Self::Error> {
        match raw {
            RawOverride::Path(path) => Ok(Self::Path(path)),
            RawOverride::Flag(false) => Ok(Self::Absent),
            RawOverride::Flag(true) => Err(OverrideError),
        }
    }
}

impl From<PropertyOverride> for RawOverride {
    fn from(value: PropertyOverride) -> Self {
        match value {
            PropertyOverride::Path(path) => RawOverride::Path(path),
            PropertyOverride::Absent => RawOverride::Flag(false),
        }
    }
}

/// Resolved policy for one entry-point
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPointPolicy {
    /// Skip this entry-point entirely
    pub ignore: bool,
    /// Manifest property replacements, applied before anything reads the manifest
    pub overrides: BTreeMap<String, PropertyOverride>,
    /// Ask the transformer to emit deep re-exports for this entry-point
    pub generate_deep_reexports: bool,
}

impl EntryPointPolicy {
    /// Properties the configuration removed from this entry-point
    pub fn ignored_properties(&self) -> impl Iterator<Item = &str> {
        self.overrides
            .iter()
            .filter(|(_, value)| matches!(value, PropertyOverride::Absent))
            .map(|(key, _)| key.as_str())
    }
}

/// Policies for every configured entry-point of one package
#[derive(Debug, Clone, Default)]
pub struct PackagePolicy {
    /// Normalized entry-point path → policy
    entry_points: BTreeMap<String, EntryPointPolicy>,
    /// Deep imports matching any of these are not worth a warning
    ignorable_deep_imports: Vec<Regex>,
}

impl PackagePolicy {
    pub(crate) fn new(
        entry_points: BTreeMap<String, EntryPointPolicy>,
        ignorable_deep_imports: Vec<Regex>,
    ) -> Self {
        Self {
            entry_points,
            ignorable_deep_imports,
        }
    }

    /// Look up the policy for an entry-point path relative to the package root
    pub fn policy_for(&self, entry_point_path: &str) -> EntryPointPolicy {
        self.entry_points
            .get(&normalize_entry_point_path(entry_point_path))
            .cloned()
            .unwrap_or_default()
    }

    /// Every entry-point the configuration mentions, with its policy
    pub fn configured_entry_points(&self) -> impl Iterator<Item = (&str, &EntryPointPolicy)> {
        self.entry_points
            .iter()
            .map(|(path, policy)| (path.as_str(), policy))
    }

    /// Whether a deep import of `specifier` is expected for this package
    pub fn is_ignorable_deep_import(&self, specifier: &str) -> bool {
        self.ignorable_deep_imports
            .iter()
            .any(|matcher| matcher.is_match(specifier))
    }
}

/// Normalize a package-relative entry-point path: `"."`, `"./"` and `""` all
/// become `"."`; `"./a/b/"` becomes `"a/b"`.
pub fn normalize_entry_point_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let trimmed = path
        .trim_start_matches("./")
        .trim_end_matches('/')
        .trim_start_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        ".".to_string()
    } else {
        trimmed.to_string()
    }
}
