//! Entry-point manifest (package.json)
//!
//! The manifest is kept as an insertion-ordered JSON object so that a
//! rewrite only touches the keys that were actually changed.

use crate::format::{FormatProperty, TYPES_PROPERTY, TYPINGS_PROPERTY};
use crate::{PackageError, Result};
use prism_config::PropertyOverride;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of an entry-point manifest
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Manifest key holding the processing markers
pub const PROCESSED_MARKERS_KEY: &str = "__processed_by_prism__";

/// An entry-point's package.json document
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Location of the document on disk (it may not exist yet)
    path: PathBuf,
    /// The document itself
    document: Map<String, Value>,
}

impl Manifest {
    /// Load a manifest from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PackageError::io(path, e))?;
        Self::from_str(path, &content)
    }

    /// Parse a manifest from JSON text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(path: &Path, content: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(content).map_err(|error| PackageError::ManifestParse {
                path: path.to_path_buf(),
                error,
            })?;

        match value {
            Value::Object(document) => Ok(Self {
                path: path.to_path_buf(),
                document,
            }),
            _ => Err(PackageError::InvalidManifest {
                path: path.to_path_buf(),
                reason: "expected a JSON object".to_string(),
            }),
        }
    }

    /// An empty manifest for an entry-point that only exists in configuration
    pub fn synthesized(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: Map::new(),
        }
    }

    /// Location of the manifest file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw document
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// String value of a top-level key
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.document.get(key).and_then(Value::as_str)
    }

    /// Package name
    pub fn name(&self) -> Option<&str> {
        self.get_str("name").filter(|name| !name.is_empty())
    }

    /// Package version
    pub fn version(&self) -> Option<&str> {
        self.get_str("version")
    }

    /// Relative path declared for a format property
    pub fn property_path(&self, property: FormatProperty) -> Option<&str> {
        self.get_str(property.name())
    }

    /// Relative path of the type declarations (`typings`, then `types`)
    pub fn typings(&self) -> Option<&str> {
        self.get_str(TYPINGS_PROPERTY)
            .or_else(|| self.get_str(TYPES_PROPERTY))
    }

    /// Processing markers: property name → tool version
    pub fn processed_markers(&self) -> Option<&Map<String, Value>> {
        self.document
            .get(PROCESSED_MARKERS_KEY)
            .and_then(Value::as_object)
    }

    /// Tool version that processed `property`, if any
    pub fn processed_version(&self, property: &str) -> Option<&str> {
        self.processed_markers()
            .and_then(|markers| markers.get(property))
            .and_then(Value::as_str)
    }

    /// Apply configuration overrides to the in-memory view.
    ///
    /// Removing a property also drops its processing marker.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, PropertyOverride>) {
        for (key, value) in overrides {
            match value {
                PropertyOverride::Path(path) => {
                    self.document.insert(key.clone(), Value::String(path.clone()));
                }
                PropertyOverride::Absent => {
                    self.document.shift_remove(key);
                    if let Some(Value::Object(markers)) =
                        self.document.get_mut(PROCESSED_MARKERS_KEY)
                    {
                        markers.shift_remove(key);
                    }
                }
            }
        }
    }

    /// Set a top-level key, keeping its position when it already exists
    pub fn set(&mut self, key: &str, value: Value) {
        self.document.insert(key.to_string(), value);
    }

    /// Set a top-level key; a new key is placed just before `before` when
    /// that key exists, otherwise at the end
    pub fn set_before(&mut self, key: &str, value: Value, before: &str) {
        if self.document.contains_key(key) || !self.document.contains_key(before) {
            self.set(key, value);
            return;
        }

        let mut reordered = Map::with_capacity(self.document.len() + 1);
        let mut pending = Some(value);
        for (existing_key, existing_value) in std::mem::take(&mut self.document) {
            if existing_key == before {
                if let Some(value) = pending.take() {
                    reordered.insert(key.to_string(), value);
                }
            }
            reordered.insert(existing_key, existing_value);
        }
        self.document = reordered;
    }

    /// Mutable access to a nested object, creating it when missing or not an object
    pub fn object_mut(&mut self, key: &str) -> &mut Map<String, Value> {
        let entry = self
            .document
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("entry was just made an object"),
        }
    }

    /// Serialize with two-space indentation and a trailing newline
    pub fn to_json_string(&self) -> Result<String> {
        let mut content = serde_json::to_string_pretty(&self.document).map_err(|error| {
            PackageError::ManifestParse {
                path: self.path.clone(),
                error,
            }
        })?;
        content.push('\n');
        Ok(content)
    }
}
