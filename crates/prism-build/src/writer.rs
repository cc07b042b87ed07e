//! Output Writer
//!
//! Commits compiled files under one of two policies and then hands the
//! manifest to the Marking Store. Declaration files are always replaced in
//! place, whatever the policy, because consumers look for them there.

use crate::error::{BuildError, BuildResult};
use crate::marker::MarkingStore;
use crate::transformer::TransformedFile;
use prism_package::paths::{relative_between, relative_slash_path};
use prism_package::{EntryPoint, FormatProperty, OUTPUT_DIR_NAME};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Suffix of the copy kept when a file is overwritten
pub const BACKUP_SUFFIX: &str = ".__prism_bak";

/// Suffix of the manifest key pointing at a side-by-side format
pub const POINTER_SUFFIX: &str = "_prism";

/// Where compiled files go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Replace the original file, keeping a backup next to it
    #[default]
    Overwrite,
    /// Write into the package's `__prism__` subtree, leaving originals alone
    SideBySide,
}

/// One compiled alias class of an entry-point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFormat {
    /// Every property sharing the compiled file
    pub properties: Vec<FormatProperty>,
    /// New location of the entry file, for side-by-side output
    pub output_entry_file: Option<PathBuf>,
}

/// Writes compiled output and the manifest changes that go with it
#[derive(Debug, Clone)]
pub struct OutputWriter {
    policy: WritePolicy,
    markers: MarkingStore,
}

impl OutputWriter {
    pub fn new(policy: WritePolicy, markers: MarkingStore) -> Self {
        Self { policy, markers }
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Write the output of one compiled format.
    ///
    /// `bundle_files` are the files of the format; in side-by-side mode the
    /// ones the transformer left alone are copied so the new tree is
    /// complete. Returns where `entry_file` ended up in side-by-side mode.
    pub fn write_bundle(
        &self,
        entry_point: &EntryPoint,
        entry_file: &Path,
        bundle_files: &[PathBuf],
        transformed: &[TransformedFile],
    ) -> BuildResult<Option<PathBuf>> {
        for file in transformed.iter().filter(|f| f.is_declaration()) {
            overwrite_with_backup(&file.path, file.contents.as_bytes())?;
        }

        let compiled: Vec<&TransformedFile> =
            transformed.iter().filter(|f| !f.is_declaration()).collect();

        match self.policy {
            WritePolicy::Overwrite => {
                for file in compiled {
                    overwrite_with_backup(&file.path, file.contents.as_bytes())?;
                }
                Ok(None)
            }
            WritePolicy::SideBySide => {
                let package_path = &entry_point.package.path;
                let written: HashSet<&Path> = compiled.iter().map(|f| f.path.as_path()).collect();

                for file in &compiled {
                    let target = side_by_side_path(package_path, &file.path);
                    create_parent(&target)?;
                    write_atomic(&target, file.contents.as_bytes())?;
                }
                for file in bundle_files {
                    if written.contains(file.as_path()) {
                        continue;
                    }
                    let target = side_by_side_path(package_path, file);
                    create_parent(&target)?;
                    fs::copy(file, &target).map_err(|e| BuildError::io(file, e))?;
                }

                Ok(Some(side_by_side_path(package_path, entry_file)))
            }
        }
    }

    /// Record the compiled formats in the manifest: pointer keys for
    /// side-by-side output plus markers for `compiled` and `mark_only`, all in
    /// one rewrite
    pub fn commit(
        &self,
        entry_point: &mut EntryPoint,
        compiled: &[CompiledFormat],
        mark_only: &[FormatProperty],
    ) -> BuildResult<()> {
        let mut properties: Vec<FormatProperty> = Vec::new();
        for property in compiled
            .iter()
            .flat_map(|c| c.properties.iter())
            .chain(mark_only)
        {
            if !properties.contains(property) {
                properties.push(*property);
            }
        }

        let pointers: Vec<(String, String, &'static str)> = compiled
            .iter()
            .filter_map(|c| c.output_entry_file.as_ref().map(|file| (c, file)))
            .flat_map(|(c, file)| {
                let value = pointer_value(&entry_point.path, file);
                c.properties.iter().map(move |property| {
                    (
                        format!("{}{}", property.name(), POINTER_SUFFIX),
                        value.clone(),
                        property.name(),
                    )
                })
            })
            .collect();

        self.markers
            .commit_with(&mut entry_point.manifest, &properties, |manifest| {
                for (key, value, before) in pointers {
                    manifest.set_before(&key, Value::String(value), before);
                }
            })
    }
}

/// `<package>/__prism__/<path inside the package>`
pub fn side_by_side_path(package_path: &Path, file: &Path) -> PathBuf {
    let relative = relative_slash_path(package_path, file).unwrap_or_else(|| {
        file.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    package_path.join(OUTPUT_DIR_NAME).join(relative)
}

/// Manifest value for a pointer key, relative to the entry-point directory
fn pointer_value(entry_point_path: &Path, file: &Path) -> String {
    let relative = relative_between(entry_point_path, file);
    if relative.starts_with("../") {
        relative
    } else {
        format!("./{}", relative)
    }
}

/// Path of the backup kept for `path`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut backup = path.as_os_str().to_owned();
    backup.push(BACKUP_SUFFIX);
    PathBuf::from(backup)
}

/// Keep the original bytes next to `path`, then replace it.
///
/// A backup that already exists means this file was written before.
fn overwrite_with_backup(path: &Path, contents: &[u8]) -> BuildResult<()> {
    let backup = backup_path(path);
    if backup.exists() {
        return Err(BuildError::BackupExists {
            path: path.to_path_buf(),
            backup,
        });
    }
    if path.exists() {
        fs::copy(path, &backup).map_err(|e| BuildError::io(&backup, e))?;
    } else {
        create_parent(path)?;
    }
    write_atomic(path, contents)
}

fn create_parent(path: &Path) -> BuildResult<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e)),
        None => Ok(()),
    }
}

/// Replace `path` with `contents` through a temporary file in the same
/// directory, so readers see either the old or the new file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> BuildResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| BuildError::io(dir, e))?;
    temp.write_all(contents)
        .map_err(|e| BuildError::io(temp.path().to_path_buf(), e))?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .map_err(|e| BuildError::io(path, e))?;
    }

    temp.persist(path)
        .map_err(|e| BuildError::io(path, e.error))?;
    Ok(())
}
