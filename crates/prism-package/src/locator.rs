//! Entry-Point Locator
//!
//! Walks the installed package tree below each base path and turns every
//! directory that qualifies into an [`EntryPoint`]. Configuration is consulted
//! once per package; the resulting policy travels with the entry-points.

use crate::entry_point::{EntryPoint, EntryPointStatus, PackageInfo};
use crate::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::path_mappings::PathMappings;
use crate::paths::{normalize, resolve};
use crate::{PackageError, Result};
use prism_config::ConfigLoader;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Directory holding side-by-side compiled output inside a package
pub const OUTPUT_DIR_NAME: &str = "__prism__";

const NODE_MODULES: &str = "node_modules";

/// Result of a discovery walk
#[derive(Debug, Default)]
pub struct DiscoveredEntryPoints {
    /// Compilable entry-points in discovery order
    pub entry_points: Vec<EntryPoint>,
    /// Entry-points skipped by configuration
    pub ignored: Vec<PathBuf>,
    /// Directories with a manifest that cannot be compiled, and why
    pub incompatible: Vec<(PathBuf, String)>,
}

/// Discovers entry-points below a set of base paths
#[derive(Debug)]
pub struct EntryPointLocator {
    base_paths: Vec<PathBuf>,
    config: ConfigLoader,
    packages: HashMap<PathBuf, PackageInfo>,
}

impl EntryPointLocator {
    /// Create a locator rooted at `base_path`.
    ///
    /// Directories targeted by `path_mappings` become additional base paths.
    pub fn new(
        base_path: impl AsRef<Path>,
        config: ConfigLoader,
        path_mappings: Option<&PathMappings>,
    ) -> Self {
        let mut candidates = vec![normalize(base_path.as_ref())];
        if let Some(mappings) = path_mappings {
            candidates.extend(mappings.base_paths().iter().map(|p| normalize(p)));
        }

        let mut base_paths: Vec<PathBuf> = Vec::new();
        for candidate in &candidates {
            if base_paths.contains(candidate) {
                continue;
            }
            let nested = candidates
                .iter()
                .any(|other| other != candidate && candidate.starts_with(other));
            if !nested {
                base_paths.push(candidate.clone());
            }
        }

        Self {
            base_paths,
            config,
            packages: HashMap::new(),
        }
    }

    /// Roots searched for packages, in search order
    pub fn base_paths(&self) -> &[PathBuf] {
        &self.base_paths
    }

    /// Configuration in use
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// Discover every entry-point below the base paths
    pub fn find_entry_points(&mut self) -> Result<DiscoveredEntryPoints> {
        let mut discovered = DiscoveredEntryPoints::default();
        let mut seen = HashSet::new();

        for base_path in self.base_paths.clone() {
            self.walk_packages(&base_path, &mut discovered, &mut seen)?;
        }

        Ok(discovered)
    }

    /// Inspect the single entry-point at `path`
    pub fn locate_entry_point(&mut self, path: &Path) -> Result<EntryPointStatus> {
        let path = normalize(path);
        if !path.is_dir() {
            return Err(PackageError::EntryPointNotFound(path));
        }

        let package_root = self.package_root(&path);
        let package = self.package_info(&package_root)?;
        load_status(&package, &path)
    }

    /// Directories declared as entry-points by configuration alone, with no
    /// manifest on disk
    pub fn configured_entry_points(&mut self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for base_path in self.base_paths.clone() {
            self.collect_configured(&base_path, &mut found)?;
        }
        Ok(found)
    }

    fn collect_configured(&mut self, dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
        for package_path in package_dirs(dir)? {
            let package = self.package_info(&package_path)?;
            for (configured, _) in package.policy.configured_entry_points() {
                let path = resolve(&package_path, configured);
                if !path.join(MANIFEST_FILE_NAME).is_file() && !found.contains(&path) {
                    found.push(path);
                }
            }
            let nested = package_path.join(NODE_MODULES);
            if nested.is_dir() {
                self.collect_configured(&nested, found)?;
            }
        }
        Ok(())
    }

    fn walk_packages(
        &mut self,
        dir: &Path,
        discovered: &mut DiscoveredEntryPoints,
        seen: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        for package_path in package_dirs(dir)? {
            self.walk_package(&package_path, discovered, seen)?;
        }
        Ok(())
    }

    fn walk_package(
        &mut self,
        package_path: &Path,
        discovered: &mut DiscoveredEntryPoints,
        seen: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let package = self.package_info(package_path)?;

        let mut candidates = vec![package_path.to_path_buf()];
        let walker = WalkDir::new(package_path)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                entry.file_type().is_dir() && !is_skipped_dir(&name) && name != NODE_MODULES
            });
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                PackageError::io(path, e.into())
            })?;
            if entry.path().join(MANIFEST_FILE_NAME).is_file() {
                candidates.push(entry.path().to_path_buf());
            }
        }

        for (configured, _) in package.policy.configured_entry_points() {
            let path = resolve(package_path, configured);
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }

        for candidate in candidates {
            if !seen.insert(candidate.clone()) {
                continue;
            }
            match load_status(&package, &candidate)? {
                EntryPointStatus::Valid(entry_point) => discovered.entry_points.push(*entry_point),
                EntryPointStatus::Ignored => discovered.ignored.push(candidate),
                EntryPointStatus::Incompatible(reason) => {
                    discovered.incompatible.push((candidate, reason))
                }
                EntryPointStatus::NoManifest => {}
            }
        }

        let nested = package_path.join(NODE_MODULES);
        if nested.is_dir() {
            self.walk_packages(&nested, discovered, seen)?;
        }
        Ok(())
    }

    /// Owning package of an entry-point directory: the nearest ancestor that
    /// sits directly in a `node_modules` folder or base path
    fn package_root(&self, path: &Path) -> PathBuf {
        for ancestor in path.ancestors() {
            let Some(parent) = ancestor.parent() else {
                break;
            };
            if self.is_package_container(parent) {
                return ancestor.to_path_buf();
            }
            if file_name(parent).starts_with('@') {
                if let Some(grandparent) = parent.parent() {
                    if self.is_package_container(grandparent) {
                        return ancestor.to_path_buf();
                    }
                }
            }
        }

        path.ancestors()
            .find(|ancestor| ancestor.join(MANIFEST_FILE_NAME).is_file())
            .unwrap_or(path)
            .to_path_buf()
    }

    fn is_package_container(&self, dir: &Path) -> bool {
        file_name(dir) == NODE_MODULES || self.base_paths.iter().any(|base| base == dir)
    }

    /// Read (once) the package-level facts and policy for `package_path`
    fn package_info(&mut self, package_path: &Path) -> Result<PackageInfo> {
        if let Some(info) = self.packages.get(package_path) {
            return Ok(info.clone());
        }

        let manifest_path = package_path.join(MANIFEST_FILE_NAME);
        let manifest = if manifest_path.is_file() {
            Manifest::from_file(&manifest_path).ok()
        } else {
            None
        };
        let name = manifest
            .as_ref()
            .and_then(|m| m.name().map(str::to_string))
            .unwrap_or_else(|| package_name_from_path(package_path));
        let version = manifest
            .as_ref()
            .and_then(|m| m.version().map(str::to_string));

        let policy = self
            .config
            .package_policy(package_path, &name, version.as_deref())?;

        let info = PackageInfo {
            path: package_path.to_path_buf(),
            name,
            version,
            policy: Arc::new(policy),
        };
        self.packages.insert(package_path.to_path_buf(), info.clone());
        Ok(info)
    }
}

/// Load a candidate; an unreadable manifest makes it incompatible, not fatal
fn load_status(package: &PackageInfo, path: &Path) -> Result<EntryPointStatus> {
    match EntryPoint::load(package, path) {
        Err(e @ PackageError::ManifestParse { .. })
        | Err(e @ PackageError::InvalidManifest { .. }) => {
            Ok(EntryPointStatus::Incompatible(e.to_string()))
        }
        other => other,
    }
}

/// Every package directly inside `dir` (scoped packages included)
fn package_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut packages = Vec::new();
    for child in sorted_subdirectories(dir)? {
        let name = file_name(&child);
        if name.starts_with('@') {
            for scoped in sorted_subdirectories(&child)? {
                if !is_skipped_dir(&file_name(&scoped)) {
                    packages.push(scoped);
                }
            }
        } else if !is_skipped_dir(&name) {
            packages.push(child);
        }
    }
    Ok(packages)
}

fn sorted_subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| PackageError::io(dir, e))? {
        let entry = entry.map_err(|e| PackageError::io(dir, e))?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || name == OUTPUT_DIR_NAME
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `@scope/name` or `name`, from where the package is installed
fn package_name_from_path(package_path: &Path) -> String {
    let name = file_name(package_path);
    match package_path.parent().map(file_name) {
        Some(scope) if scope.starts_with('@') => format!("{}/{}", scope, name),
        _ => name,
    }
}
