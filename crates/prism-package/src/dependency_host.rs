//! Dependency hosts
//!
//! A host knows how one module format spells an import. The collector walks
//! an entry-point's files starting at a format's entry file, follows
//! relative imports inside the entry-point and classifies everything else.

use crate::format::EntryPointFormat;
use crate::module_resolver::{is_relative, ModuleResolver, ResolvedModule};
use crate::{PackageError, Result};
use regex::Regex;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Extracts import specifiers from the source of one module format
pub trait DependencyHost: Send + Sync {
    /// Specifiers imported by `source`, in source order
    fn extract_imports(&self, source: &str) -> Vec<String>;

    /// Suffixes tried when a specifier does not name a file directly
    fn extensions(&self) -> &'static [&'static str] {
        &[".js", ".mjs", "/index.js", "/index.mjs"]
    }
}

/// A deep import: a file inside a package that is not an entry-point
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeepImport {
    /// Specifier as written in the source
    pub specifier: String,
    /// File it resolved to
    pub path: PathBuf,
}

/// What an entry-point's compiled code needs from outside itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyInfo {
    /// Entry-point directories imported
    pub dependencies: BTreeSet<PathBuf>,
    /// Specifiers that resolved to nothing
    pub missing: BTreeSet<String>,
    /// Imports reaching into packages past their entry-points
    pub deep_imports: BTreeSet<DeepImport>,
}

impl DependencyInfo {
    /// Whether every import resolved
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Dependency info plus every file the walk visited
#[derive(Debug, Clone, Default)]
pub struct CollectedDependencies {
    pub info: DependencyInfo,
    /// Files of the entry-point reachable from the entry file, entry file first
    pub files: Vec<PathBuf>,
}

fn esm_static() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)(?:^|[;}\s])(?:import|export)\s+(?:type\s+)?(?:[\w$*{}\s,]+?\s+from\s+)?['"]([^'"\n]+)['"]"#,
        )
        .expect("valid ESM import pattern")
    })
}

fn dynamic_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).expect("valid dynamic import pattern")
    })
}

fn require_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).expect("valid require pattern")
    })
}

fn amd_define() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bdefine\s*\(\s*(?:['"][^'"]*['"]\s*,\s*)?\[([^\]]*)\]"#)
            .expect("valid AMD define pattern")
    })
}

fn quoted() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"['"]([^'"\n]+)['"]"#).expect("valid string pattern"))
}

fn captures(re: &Regex, source: &str, out: &mut Vec<String>) {
    out.extend(re.captures_iter(source).map(|c| c[1].to_string()));
}

/// ES module syntax (esm5, esm2015)
#[derive(Debug, Clone, Copy, Default)]
pub struct EsmDependencyHost;

impl DependencyHost for EsmDependencyHost {
    fn extract_imports(&self, source: &str) -> Vec<String> {
        let mut imports = Vec::new();
        captures(esm_static(), source, &mut imports);
        captures(dynamic_import(), source, &mut imports);
        imports
    }
}

/// `require()` calls
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonJsDependencyHost;

impl DependencyHost for CommonJsDependencyHost {
    fn extract_imports(&self, source: &str) -> Vec<String> {
        let mut imports = Vec::new();
        captures(require_call(), source, &mut imports);
        imports
    }
}

/// UMD wrappers: the CommonJS branch and the AMD dependency array
#[derive(Debug, Clone, Copy, Default)]
pub struct UmdDependencyHost;

impl DependencyHost for UmdDependencyHost {
    fn extract_imports(&self, source: &str) -> Vec<String> {
        const AMD_SPECIALS: &[&str] = &["exports", "require", "module"];

        let mut imports = Vec::new();
        captures(require_call(), source, &mut imports);
        for array in amd_define().captures_iter(source) {
            for specifier in quoted().captures_iter(&array[1]) {
                let specifier = &specifier[1];
                if !AMD_SPECIALS.contains(&specifier) && !imports.iter().any(|i| i == specifier) {
                    imports.push(specifier.to_string());
                }
            }
        }
        imports
    }
}

/// Type declaration files
#[derive(Debug, Clone, Copy, Default)]
pub struct DtsDependencyHost;

impl DependencyHost for DtsDependencyHost {
    fn extract_imports(&self, source: &str) -> Vec<String> {
        EsmDependencyHost.extract_imports(source)
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".d.ts", "/index.d.ts"]
    }
}

/// The host that understands `format`
pub fn host_for(format: EntryPointFormat) -> Box<dyn DependencyHost> {
    match format {
        EntryPointFormat::Esm2015 | EntryPointFormat::Esm5 => Box::new(EsmDependencyHost),
        EntryPointFormat::Umd => Box::new(UmdDependencyHost),
        EntryPointFormat::CommonJs => Box::new(CommonJsDependencyHost),
    }
}

/// Walks an entry-point's files collecting its external dependencies
#[derive(Debug, Clone, Copy)]
pub struct DependencyCollector<'a> {
    resolver: &'a ModuleResolver,
}

impl<'a> DependencyCollector<'a> {
    pub fn new(resolver: &'a ModuleResolver) -> Self {
        Self { resolver }
    }

    /// Collect the dependencies reachable from `entry_file`.
    ///
    /// Relative imports that leave `entry_point_path` still count as files
    /// of the bundle; packages share code between entry-points that way.
    pub fn collect(
        &self,
        host: &dyn DependencyHost,
        entry_file: &Path,
    ) -> Result<CollectedDependencies> {
        let mut collected = CollectedDependencies::default();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        seen.insert(entry_file.to_path_buf());
        queue.push_back(entry_file.to_path_buf());

        while let Some(file) = queue.pop_front() {
            let source =
                std::fs::read_to_string(&file).map_err(|e| PackageError::io(&file, e))?;
            collected.files.push(file.clone());

            for specifier in host.extract_imports(&source) {
                match self.resolver.resolve(&specifier, &file, host.extensions()) {
                    Some(ResolvedModule::Relative(path)) => {
                        if seen.insert(path.clone()) {
                            queue.push_back(path);
                        }
                    }
                    Some(ResolvedModule::EntryPoint(path)) => {
                        collected.info.dependencies.insert(path);
                    }
                    Some(ResolvedModule::DeepImport(path)) => {
                        collected
                            .info
                            .deep_imports
                            .insert(DeepImport { specifier, path });
                    }
                    Some(ResolvedModule::Builtin) => {}
                    None => {
                        let missing = if is_relative(&specifier) {
                            format!("{} (from {})", specifier, file.display())
                        } else {
                            specifier
                        };
                        collected.info.missing.insert(missing);
                    }
                }
            }
        }

        Ok(collected)
    }
}
