//! Dependency Resolver
//!
//! Works out which entry-points each entry-point's compiled code imports and
//! orders them so that dependencies are compiled first. Discovery mode
//! resolves every located entry-point independently; targeted mode follows
//! the import closure of a single entry-point.

use crate::build_order::DependencyGraph;
use crate::dependency_host::{host_for, DeepImport, DependencyCollector, DtsDependencyHost};
use crate::entry_point::{EntryPoint, EntryPointStatus};
use crate::format::FormatProperty;
use crate::locator::EntryPointLocator;
use crate::module_resolver::ModuleResolver;
use crate::paths::normalize;
use crate::{PackageError, Result};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Imports of one entry-point, as seen through one of its formats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDependencies {
    /// Property whose compiled code was scanned; `None` when the entry-point
    /// declares none of the requested properties
    pub property: Option<FormatProperty>,
    /// Entry-points imported by compiled code and declarations alike
    pub dependencies: BTreeSet<PathBuf>,
    /// Entry-points imported only by compiled code
    pub private_dependencies: BTreeSet<PathBuf>,
    /// Specifiers that resolved to nothing
    pub missing: BTreeSet<String>,
    /// Deep imports the package configuration does not expect
    pub deep_imports: BTreeSet<DeepImport>,
}

impl ResolvedDependencies {
    /// Every dependency edge, public and private
    pub fn all(&self) -> impl Iterator<Item = &PathBuf> {
        self.dependencies.iter().chain(self.private_dependencies.iter())
    }
}

/// An entry-point that was excluded because something it needs is missing
#[derive(Debug, Clone)]
pub struct InvalidEntryPoint {
    pub entry_point: EntryPoint,
    /// Unresolved specifiers, or the invalid entry-points it depends on
    pub missing: Vec<String>,
}

/// Entry-points in compile order
#[derive(Debug, Default)]
pub struct SortedEntryPoints {
    /// Valid entry-points, dependencies first, with their edges filled in
    pub entry_points: Vec<EntryPoint>,
    /// Edges between the valid entry-points, nodes in discovery order
    pub graph: DependencyGraph,
    /// Excluded entry-points, in discovery order
    pub invalid: Vec<InvalidEntryPoint>,
    /// Unexpected deep imports: importing entry-point and the import
    pub deep_imports: Vec<(PathBuf, DeepImport)>,
}

/// Resolves entry-point dependencies and compile order
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    module_resolver: ModuleResolver,
}

impl DependencyResolver {
    pub fn new(module_resolver: ModuleResolver) -> Self {
        Self { module_resolver }
    }

    /// Module resolver in use
    pub fn module_resolver(&self) -> &ModuleResolver {
        &self.module_resolver
    }

    /// Find the dependencies of `entry_point`.
    ///
    /// Each requested property the entry-point declares is tried in order
    /// and the first whose imports all resolve wins. When none resolves
    /// fully, the first attempt is reported with its missing specifiers.
    pub fn resolve_dependencies(
        &self,
        entry_point: &EntryPoint,
        properties: &[FormatProperty],
    ) -> Result<ResolvedDependencies> {
        let collector = DependencyCollector::new(&self.module_resolver);
        let mut first_attempt = None;

        for &property in properties {
            let Some(file) = entry_point.format_path(property).filter(|p| p.is_file()) else {
                continue;
            };
            let Some(format) = property.format(|| std::fs::read_to_string(&file).ok()) else {
                continue;
            };

            let collected = collector.collect(host_for(format).as_ref(), &file)?;
            let complete = collected.info.is_complete();
            let attempt = (property, collected.info);
            if complete {
                first_attempt = Some(attempt);
                break;
            }
            if first_attempt.is_none() {
                first_attempt = Some(attempt);
            }
        }

        let Some((property, info)) = first_attempt else {
            return Ok(ResolvedDependencies::default());
        };

        let typings_dependencies = match &entry_point.typings {
            Some(typings) => collector.collect(&DtsDependencyHost, typings)?.info.dependencies,
            None => BTreeSet::new(),
        };

        let own_path = normalize(&entry_point.path);
        let (dependencies, private_dependencies): (BTreeSet<PathBuf>, BTreeSet<PathBuf>) = info
            .dependencies
            .into_iter()
            .filter(|dep| *dep != own_path)
            .partition(|dep| typings_dependencies.contains(dep));

        let policy = &entry_point.package.policy;
        let deep_imports = info
            .deep_imports
            .into_iter()
            .filter(|import| !policy.is_ignorable_deep_import(&import.specifier))
            .collect();

        Ok(ResolvedDependencies {
            property: Some(property),
            dependencies,
            private_dependencies,
            missing: info.missing,
            deep_imports,
        })
    }

    /// Discovery mode: order every entry-point, excluding those with missing
    /// dependencies and everything that depends on them
    pub fn sort_entry_points_by_dependency(
        &self,
        entry_points: Vec<EntryPoint>,
        properties: &[FormatProperty],
    ) -> Result<SortedEntryPoints> {
        let mut resolved = Vec::with_capacity(entry_points.len());
        for entry_point in entry_points {
            let dependencies = self.resolve_dependencies(&entry_point, properties)?;
            resolved.push((entry_point, dependencies));
        }
        build_sorted(resolved)
    }

    /// Targeted mode: order the import closure of the entry-point at
    /// `target`. Any missing import anywhere in the closure is fatal.
    pub fn sort_target_closure(
        &self,
        locator: &mut EntryPointLocator,
        target: &Path,
        properties: &[FormatProperty],
    ) -> Result<SortedEntryPoints> {
        let target = normalize(target);
        let root = match locator.locate_entry_point(&target)? {
            EntryPointStatus::Valid(entry_point) => *entry_point,
            EntryPointStatus::Ignored => return Ok(SortedEntryPoints::default()),
            EntryPointStatus::NoManifest | EntryPointStatus::Incompatible(_) => {
                return Err(PackageError::EntryPointNotFound(target))
            }
        };

        let mut resolved = Vec::new();
        let mut missing = BTreeSet::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(root.path.clone());
        queue.push_back(root);

        while let Some(entry_point) = queue.pop_front() {
            let dependencies = self.resolve_dependencies(&entry_point, properties)?;
            missing.extend(dependencies.missing.iter().cloned());

            for dep in dependencies.all() {
                if !seen.insert(dep.clone()) {
                    continue;
                }
                if let EntryPointStatus::Valid(dep_entry_point) = locator.locate_entry_point(dep)? {
                    queue.push_back(*dep_entry_point);
                }
            }
            resolved.push((entry_point, dependencies));
        }

        if !missing.is_empty() {
            return Err(PackageError::MissingDependencies {
                target,
                missing: missing.into_iter().collect(),
            });
        }

        build_sorted(resolved)
    }
}

/// Build the graph, drop invalid entry-points and sort the rest
fn build_sorted(resolved: Vec<(EntryPoint, ResolvedDependencies)>) -> Result<SortedEntryPoints> {
    let mut full = DependencyGraph::new();
    for (entry_point, _) in &resolved {
        full.add_node(entry_point.path.clone());
    }
    for (entry_point, dependencies) in &resolved {
        for dep in dependencies.all() {
            full.add_dependency(&entry_point.path, dep);
        }
    }
    full.topological_order()?;

    // Missing imports invalidate an entry-point and, transitively, its dependents
    let mut invalid: HashMap<PathBuf, Vec<String>> = HashMap::new();
    let mut queue = VecDeque::new();
    for (entry_point, dependencies) in &resolved {
        if !dependencies.missing.is_empty() {
            invalid.insert(
                entry_point.path.clone(),
                dependencies.missing.iter().cloned().collect(),
            );
            queue.push_back(entry_point.path.clone());
        }
    }
    while let Some(path) = queue.pop_front() {
        for dependent in full.dependents_of(&path) {
            let reason = path.display().to_string();
            match invalid.get_mut(dependent) {
                Some(reasons) => {
                    if !reasons.contains(&reason) {
                        reasons.push(reason);
                    }
                }
                None => {
                    invalid.insert(dependent.to_path_buf(), vec![reason]);
                    queue.push_back(dependent.to_path_buf());
                }
            }
        }
    }

    let mut sorted = SortedEntryPoints::default();
    let mut valid = HashMap::new();
    for (mut entry_point, dependencies) in resolved {
        if let Some(missing) = invalid.remove(&entry_point.path) {
            sorted.invalid.push(InvalidEntryPoint {
                entry_point,
                missing,
            });
            continue;
        }
        sorted.graph.add_node(entry_point.path.clone());
        sorted.deep_imports.extend(
            dependencies
                .deep_imports
                .iter()
                .map(|import| (entry_point.path.clone(), import.clone())),
        );
        entry_point.dependencies = dependencies.dependencies;
        entry_point.private_dependencies = dependencies.private_dependencies;
        valid.insert(entry_point.path.clone(), entry_point);
    }

    let nodes = sorted.graph.nodes().to_vec();
    for node in &nodes {
        if let Some(entry_point) = valid.get(node) {
            for dep in entry_point.all_dependencies() {
                sorted.graph.add_dependency(node, dep);
            }
        }
    }

    for path in sorted.graph.topological_order()? {
        if let Some(entry_point) = valid.remove(&path) {
            sorted.entry_points.push(entry_point);
        }
    }
    Ok(sorted)
}
