//! Import specifier resolution
//!
//! Resolves the specifiers found in compiled code to files or entry-point
//! directories. Path mappings are tried first, then the `node_modules`
//! lookup every package manager lays out.

use crate::manifest::MANIFEST_FILE_NAME;
use crate::path_mappings::PathMappings;
use crate::paths::{normalize, resolve};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Node built-ins never live in the package tree
const BUILTIN_MODULES: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "crypto",
    "dgram",
    "dns",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "querystring",
    "readline",
    "stream",
    "string_decoder",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "vm",
    "worker_threads",
    "zlib",
];

/// Where a specifier points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedModule {
    /// A file of the importing entry-point itself
    Relative(PathBuf),
    /// Another entry-point (a directory holding a manifest, or one declared
    /// by configuration)
    EntryPoint(PathBuf),
    /// A file inside some package that is not an entry-point
    DeepImport(PathBuf),
    /// A runtime built-in; nothing to resolve
    Builtin,
}

/// Resolves import specifiers relative to the importing file
#[derive(Debug, Clone, Default)]
pub struct ModuleResolver {
    path_mappings: Option<PathMappings>,
    configured_entry_points: BTreeSet<PathBuf>,
}

impl ModuleResolver {
    /// Create a resolver, optionally honoring path mappings
    pub fn new(path_mappings: Option<PathMappings>) -> Self {
        Self {
            path_mappings,
            configured_entry_points: BTreeSet::new(),
        }
    }

    /// Also treat `dirs` as entry-points although they hold no manifest
    pub fn with_configured_entry_points(
        mut self,
        dirs: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        self.configured_entry_points
            .extend(dirs.into_iter().map(|dir| normalize(&dir)));
        self
    }

    /// Path mappings in use, if any
    pub fn path_mappings(&self) -> Option<&PathMappings> {
        self.path_mappings.as_ref()
    }

    /// Resolve `specifier` as imported from `from_file`.
    ///
    /// `extensions` lists the suffixes tried when the specifier does not
    /// name an existing file (e.g. `.js`, `/index.js`).
    pub fn resolve(
        &self,
        specifier: &str,
        from_file: &Path,
        extensions: &[&str],
    ) -> Option<ResolvedModule> {
        if is_builtin(specifier) {
            return Some(ResolvedModule::Builtin);
        }

        let from_dir = from_file.parent().unwrap_or_else(|| Path::new("/"));

        if is_relative(specifier) {
            return resolve_as_file(&resolve(from_dir, specifier), extensions)
                .map(ResolvedModule::Relative);
        }

        if let Some(mappings) = &self.path_mappings {
            for candidate in mappings.candidates(specifier) {
                if let Some(resolved) = self.resolve_in_package_tree(&candidate, extensions) {
                    return Some(resolved);
                }
            }
        }

        for ancestor in from_dir.ancestors() {
            if ancestor.file_name().map_or(false, |name| name == "node_modules") {
                continue;
            }
            let candidate = normalize(&ancestor.join("node_modules").join(specifier));
            if let Some(resolved) = self.resolve_in_package_tree(&candidate, extensions) {
                return Some(resolved);
            }
        }

        None
    }

    fn resolve_in_package_tree(
        &self,
        candidate: &Path,
        extensions: &[&str],
    ) -> Option<ResolvedModule> {
        if is_entry_point_dir(candidate)
            || self.configured_entry_points.contains(&normalize(candidate))
        {
            return Some(ResolvedModule::EntryPoint(candidate.to_path_buf()));
        }
        resolve_as_file(candidate, extensions).map(ResolvedModule::DeepImport)
    }
}

/// Whether `specifier` is resolved against the importing file
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

fn is_builtin(specifier: &str) -> bool {
    if specifier.starts_with("node:") {
        return true;
    }
    let root = specifier.split('/').next().unwrap_or(specifier);
    BUILTIN_MODULES.contains(&root)
}

/// Whether a directory is an entry-point (holds a manifest)
pub fn is_entry_point_dir(path: &Path) -> bool {
    path.is_dir() && path.join(MANIFEST_FILE_NAME).is_file()
}

/// Try `path` as a file, then with each extension appended
pub fn resolve_as_file(path: &Path, extensions: &[&str]) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let base = path.to_string_lossy();
    extensions
        .iter()
        .map(|ext| PathBuf::from(format!("{}{}", base, ext)))
        .find(|candidate| candidate.is_file())
}
