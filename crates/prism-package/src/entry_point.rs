//! Entry-points: the unit of compilation
//!
//! An entry-point is a directory of a package with its own manifest (or a
//! configured deep-import path). Its manifest is the only record of where
//! its formats live and which of them were already processed.

use crate::format::FormatProperty;
use crate::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::paths::{relative_slash_path, resolve};
use crate::Result;
use prism_config::{EntryPointPolicy, PackagePolicy};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A package root and the configuration that applies to it
#[derive(Debug, Clone)]
pub struct PackageInfo {
    /// Package root directory
    pub path: PathBuf,
    /// Package name (from its manifest, or its location in `node_modules`)
    pub name: String,
    /// Installed version, if the manifest declares one
    pub version: Option<String>,
    /// Configured policies for the package's entry-points
    pub policy: Arc<PackagePolicy>,
}

/// A compilation unit
#[derive(Debug, Clone)]
pub struct EntryPoint {
    /// Logical name (`pkg` or `pkg/sub`)
    pub name: String,
    /// Absolute entry-point directory
    pub path: PathBuf,
    /// Owning package
    pub package: PackageInfo,
    /// Manifest with configuration overrides applied
    pub manifest: Manifest,
    /// Absolute path of the type declarations entry file, if any
    pub typings: Option<PathBuf>,
    /// Configuration for this entry-point
    pub policy: EntryPointPolicy,
    /// Entry-points imported by both compiled code and declarations
    pub dependencies: BTreeSet<PathBuf>,
    /// Entry-points imported only by compiled code
    pub private_dependencies: BTreeSet<PathBuf>,
}

/// Outcome of inspecting a candidate entry-point directory
#[derive(Debug, Clone)]
pub enum EntryPointStatus {
    /// A compilable entry-point
    Valid(Box<EntryPoint>),
    /// Configuration says to skip it
    Ignored,
    /// No manifest and no configuration entry
    NoManifest,
    /// Manifest present but unusable (no name, no format files, ...)
    Incompatible(String),
}

impl EntryPoint {
    /// Path of this entry-point relative to its package, `"."` for the root
    pub fn relative_path(&self) -> String {
        relative_slash_path(&self.package.path, &self.path).unwrap_or_else(|| ".".to_string())
    }

    /// Absolute file a format property points at, when declared
    pub fn format_path(&self, property: FormatProperty) -> Option<PathBuf> {
        self.manifest
            .property_path(property)
            .map(|relative| resolve(&self.path, relative))
    }

    /// Declared format properties whose file exists, in canonical order
    pub fn available_formats(&self) -> Vec<FormatProperty> {
        FormatProperty::ALL
            .iter()
            .copied()
            .filter(|property| {
                self.format_path(*property)
                    .map_or(false, |path| path.is_file())
            })
            .collect()
    }

    /// Every dependency edge, public and private
    pub fn all_dependencies(&self) -> impl Iterator<Item = &PathBuf> {
        self.dependencies.iter().chain(self.private_dependencies.iter())
    }

    /// Inspect `entry_point_path` inside `package`
    pub fn load(package: &PackageInfo, entry_point_path: &Path) -> Result<EntryPointStatus> {
        let relative = relative_slash_path(&package.path, entry_point_path)
            .unwrap_or_else(|| ".".to_string());
        let policy = package.policy.policy_for(&relative);
        if policy.ignore {
            return Ok(EntryPointStatus::Ignored);
        }

        let manifest_path = entry_point_path.join(MANIFEST_FILE_NAME);
        let configured = package
            .policy
            .configured_entry_points()
            .any(|(path, _)| path == relative);
        let mut manifest = if manifest_path.is_file() {
            Manifest::from_file(&manifest_path)?
        } else if configured {
            Manifest::synthesized(&manifest_path)
        } else {
            return Ok(EntryPointStatus::NoManifest);
        };
        manifest.apply_overrides(&policy.overrides);

        let name = match manifest.name() {
            Some(name) => name.to_string(),
            None if configured || (manifest_path.is_file() && relative != ".") => {
                entry_point_name(&package.name, &relative)
            }
            None => {
                return Ok(EntryPointStatus::Incompatible(
                    "manifest has no name".to_string(),
                ))
            }
        };

        let typings = manifest
            .typings()
            .map(|relative| resolve(entry_point_path, relative))
            .filter(|path| path.is_file());

        let entry_point = EntryPoint {
            name,
            path: entry_point_path.to_path_buf(),
            package: package.clone(),
            manifest,
            typings,
            policy,
            dependencies: BTreeSet::new(),
            private_dependencies: BTreeSet::new(),
        };

        if entry_point.available_formats().is_empty() {
            return Ok(EntryPointStatus::Incompatible(
                "no format property points at an existing file".to_string(),
            ));
        }

        Ok(EntryPointStatus::Valid(Box::new(entry_point)))
    }
}

/// `pkg` for the package root, `pkg/sub/path` otherwise
fn entry_point_name(package_name: &str, relative: &str) -> String {
    if relative == "." {
        package_name.to_string()
    } else {
        format!("{}/{}", package_name, relative)
    }
}
