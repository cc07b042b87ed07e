//! Marking Store
//!
//! Processing markers live in the entry-point's own manifest under
//! [`PROCESSED_MARKERS_KEY`]. They are only ever added here; a commit merges
//! new markers into the existing map and rewrites the manifest in one step.

use crate::error::BuildResult;
use crate::writer::write_atomic;
use prism_package::{FormatProperty, Manifest, PROCESSED_MARKERS_KEY, TYPINGS_PROPERTY};
use serde_json::Value;

/// Script that keeps a processed package from being published
pub const PREPUBLISH_SCRIPT_KEY: &str = "prepublishOnly";

/// Where an existing `prepublishOnly` script is kept
pub const PREPUBLISH_BACKUP_KEY: &str = "prepublishOnly__prism_bak";

const PUBLISH_GUARD: &str = "node --eval \"console.error('ERROR: Publishing packages processed by \
prism is not allowed. Reinstall the package and publish the original instead.');process.exit(1);\"";

/// Version that processed `property` of the manifest, if any
pub fn is_processed<'a>(manifest: &'a Manifest, property: &str) -> Option<&'a str> {
    manifest.processed_version(property)
}

/// Reads and commits processing markers for one tool version
#[derive(Debug, Clone)]
pub struct MarkingStore {
    version: String,
}

impl MarkingStore {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    /// Version written into new markers
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Mark `properties` (and the declarations) as processed
    pub fn commit(&self, manifest: &mut Manifest, properties: &[FormatProperty]) -> BuildResult<()> {
        self.commit_with(manifest, properties, |_| {})
    }

    /// Apply `edit`, mark `properties` and write the manifest once.
    ///
    /// `manifest` is only updated after the file was replaced, so a failed
    /// write leaves both the file and the in-memory view untouched.
    pub fn commit_with(
        &self,
        manifest: &mut Manifest,
        properties: &[FormatProperty],
        edit: impl FnOnce(&mut Manifest),
    ) -> BuildResult<()> {
        let mut updated = manifest.clone();
        edit(&mut updated);

        let markers = updated.object_mut(PROCESSED_MARKERS_KEY);
        for property in properties {
            markers.insert(property.name().to_string(), Value::String(self.version.clone()));
        }
        markers.insert(
            TYPINGS_PROPERTY.to_string(),
            Value::String(self.version.clone()),
        );

        install_publish_guard(&mut updated);

        let content = updated.to_json_string()?;
        write_atomic(updated.path(), content.as_bytes())?;
        *manifest = updated;
        Ok(())
    }
}

fn install_publish_guard(manifest: &mut Manifest) {
    let scripts = manifest.object_mut("scripts");
    let current = scripts.get(PREPUBLISH_SCRIPT_KEY).and_then(Value::as_str);
    if current == Some(PUBLISH_GUARD) {
        return;
    }
    if let Some(existing) = scripts.get(PREPUBLISH_SCRIPT_KEY).cloned() {
        if !scripts.contains_key(PREPUBLISH_BACKUP_KEY) {
            scripts.insert(PREPUBLISH_BACKUP_KEY.to_string(), existing);
        }
    }
    scripts.insert(
        PREPUBLISH_SCRIPT_KEY.to_string(),
        Value::String(PUBLISH_GUARD.to_string()),
    );
}
