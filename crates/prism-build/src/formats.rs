//! Format Resolver
//!
//! Decides, per entry-point, which of the requested format properties get
//! compiled in this run. Properties whose declared paths resolve to the same
//! file form an alias class: the class is compiled once and marked as a
//! whole.

use crate::error::{BuildError, BuildResult};
use prism_package::{EntryPoint, EntryPointFormat, FormatProperty, TYPINGS_PROPERTY};
use std::collections::HashSet;
use std::path::PathBuf;

/// Properties sharing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasClass {
    pub path: PathBuf,
    /// Members in canonical property order
    pub properties: Vec<FormatProperty>,
}

/// One format to hand to the transformer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileStep {
    pub property: FormatProperty,
    pub format: EntryPointFormat,
    /// File the property points at
    pub path: PathBuf,
    /// The property's whole alias class, itself included
    pub aliases: Vec<FormatProperty>,
}

/// Work for one entry-point
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatPlan {
    /// Formats to compile, in priority order
    pub compile: Vec<CompileStep>,
    /// Unmarked aliases of already-processed properties, marked without compiling
    pub mark_only: Vec<FormatProperty>,
}

impl FormatPlan {
    /// Every property this plan will mark
    pub fn marked_properties(&self) -> Vec<FormatProperty> {
        let mut properties = Vec::new();
        for property in self
            .compile
            .iter()
            .flat_map(|step| step.aliases.iter())
            .chain(&self.mark_only)
        {
            if !properties.contains(property) {
                properties.push(*property);
            }
        }
        properties
    }
}

/// What to do with an entry-point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPointPlan {
    Work(FormatPlan),
    /// Nothing left to do for the requested properties
    Processed,
    /// No requested property can be compiled
    Unprocessable,
}

/// Picks the formats to compile
#[derive(Debug, Clone)]
pub struct FormatResolver {
    requested: Vec<String>,
    properties: Vec<FormatProperty>,
    compile_all_formats: bool,
    version: String,
}

impl FormatResolver {
    /// `requested` is the caller's priority list; names outside the
    /// supported set are kept only for error messages.
    pub fn new(
        requested: &[String],
        compile_all_formats: bool,
        version: impl Into<String>,
    ) -> BuildResult<Self> {
        let mut properties = Vec::new();
        for name in requested {
            if let Some(property) = FormatProperty::from_name(name) {
                if !properties.contains(&property) {
                    properties.push(property);
                }
            }
        }
        if properties.is_empty() {
            return Err(BuildError::unsupported_properties(requested));
        }

        Ok(Self {
            requested: requested.to_vec(),
            properties,
            compile_all_formats,
            version: version.into(),
        })
    }

    /// Supported requested properties, in priority order
    pub fn properties(&self) -> &[FormatProperty] {
        &self.properties
    }

    /// Fail when none of `entry_points` declares any requested property
    pub fn validate(&self, entry_points: &[EntryPoint]) -> BuildResult<()> {
        if entry_points.is_empty() {
            return Ok(());
        }
        let declared = entry_points.iter().any(|ep| {
            self.properties
                .iter()
                .any(|property| ep.manifest.property_path(*property).is_some())
        });
        if declared {
            Ok(())
        } else {
            Err(BuildError::unsupported_properties(&self.requested))
        }
    }

    /// Alias classes over every declared property of `entry_point`
    pub fn alias_classes(entry_point: &EntryPoint) -> Vec<AliasClass> {
        let mut classes: Vec<AliasClass> = Vec::new();
        for property in FormatProperty::ALL {
            let Some(path) = entry_point.format_path(property) else {
                continue;
            };
            match classes.iter_mut().find(|class| class.path == path) {
                Some(class) => class.properties.push(property),
                None => classes.push(AliasClass {
                    path,
                    properties: vec![property],
                }),
            }
        }
        classes
    }

    /// Fail when a marker was written by another version
    pub fn check_markers(&self, entry_point: &EntryPoint) -> BuildResult<()> {
        let Some(markers) = entry_point.manifest.processed_markers() else {
            return Ok(());
        };
        for version in markers.values() {
            let found = version.as_str().unwrap_or_default();
            if found != self.version {
                return Err(BuildError::OutdatedMarker {
                    path: entry_point.path.clone(),
                    found: found.to_string(),
                    current: self.version.clone(),
                });
            }
        }
        Ok(())
    }

    /// Decide what to compile for `entry_point`
    pub fn plan(&self, entry_point: &EntryPoint) -> BuildResult<EntryPointPlan> {
        self.check_markers(entry_point)?;

        let classes = Self::alias_classes(entry_point);
        let class_of = |property: FormatProperty| {
            classes
                .iter()
                .find(|class| class.properties.contains(&property))
        };
        let mut marked: HashSet<FormatProperty> = FormatProperty::ALL
            .iter()
            .copied()
            .filter(|p| entry_point.manifest.processed_version(p.name()).is_some())
            .collect();

        let requested: Vec<FormatProperty> = self
            .properties
            .iter()
            .copied()
            .filter(|p| class_of(*p).is_some())
            .collect();
        let any_processed = requested.iter().any(|p| marked.contains(p));

        let mut plan = FormatPlan::default();

        if !self.compile_all_formats {
            // The first compilable property decides
            let first = requested
                .iter()
                .find_map(|property| compile_step(*property, class_of(*property)));
            match first {
                Some(step) if step.aliases.iter().any(|p| marked.contains(p)) => {
                    return Ok(EntryPointPlan::Processed);
                }
                Some(step) => plan.compile.push(step),
                None => {}
            }
        } else {
            for property in &requested {
                let Some(class) = class_of(*property) else {
                    continue;
                };
                if class.properties.iter().any(|p| marked.contains(p)) {
                    for alias in &class.properties {
                        if marked.insert(*alias) {
                            plan.mark_only.push(*alias);
                        }
                    }
                    continue;
                }
                if let Some(step) = compile_step(*property, Some(class)) {
                    marked.extend(class.properties.iter().copied());
                    plan.compile.push(step);
                }
            }
        }

        if plan.compile.is_empty() && plan.mark_only.is_empty() {
            return Ok(if any_processed {
                EntryPointPlan::Processed
            } else {
                EntryPointPlan::Unprocessable
            });
        }
        Ok(EntryPointPlan::Work(plan))
    }

    /// Whether declarations still need processing
    pub fn process_typings(entry_point: &EntryPoint) -> bool {
        entry_point.typings.is_some()
            && entry_point
                .manifest
                .processed_markers()
                .map_or(true, |markers| !markers.contains_key(TYPINGS_PROPERTY))
    }
}

/// A step for `property`, if its file exists and its format is known
fn compile_step(property: FormatProperty, class: Option<&AliasClass>) -> Option<CompileStep> {
    let class = class?;
    if !class.path.is_file() {
        return None;
    }
    let format = property.format(|| std::fs::read_to_string(&class.path).ok())?;
    Some(CompileStep {
        property,
        format,
        path: class.path.clone(),
        aliases: class.properties.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_config::PackagePolicy;
    use prism_package::{EntryPointStatus, PackageInfo};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn entry_point(dir: &Path, manifest: &str, files: &[&str]) -> EntryPoint {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("package.json"), manifest).unwrap();
        for file in files {
            fs::write(dir.join(file), "export const x = 1;").unwrap();
        }
        let package = PackageInfo {
            path: dir.to_path_buf(),
            name: "lib".to_string(),
            version: None,
            policy: Arc::new(PackagePolicy::default()),
        };
        match EntryPoint::load(&package, dir).unwrap() {
            EntryPointStatus::Valid(ep) => *ep,
            other => panic!("expected valid entry-point, got {:?}", other),
        }
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn work(plan: EntryPointPlan) -> FormatPlan {
        match plan {
            EntryPointPlan::Work(plan) => plan,
            other => panic!("expected work, got {:?}", other),
        }
    }

    const ALIASED: &str =
        r#"{"name": "lib", "es2015": "./a.js", "esm2015": "./a.js", "main": "./b.js"}"#;

    #[test]
    fn test_alias_classes_group_by_file() {
        let temp = TempDir::new().unwrap();
        let ep = entry_point(temp.path(), ALIASED, &["a.js", "b.js"]);
        let classes = FormatResolver::alias_classes(&ep);
        assert_eq!(classes.len(), 2);
        assert_eq!(
            classes[0].properties,
            vec![FormatProperty::Es2015, FormatProperty::Esm2015]
        );
        assert_eq!(classes[1].properties, vec![FormatProperty::Main]);
    }

    #[test]
    fn test_alias_class_compiled_once() {
        let temp = TempDir::new().unwrap();
        let ep = entry_point(temp.path(), ALIASED, &["a.js", "b.js"]);
        let resolver = FormatResolver::new(&names(&["es2015", "esm2015"]), true, "1.0.0").unwrap();

        let plan = work(resolver.plan(&ep).unwrap());
        assert_eq!(plan.compile.len(), 1);
        assert_eq!(plan.compile[0].property, FormatProperty::Es2015);
        assert_eq!(plan.compile[0].format, EntryPointFormat::Esm2015);
        assert!(plan.mark_only.is_empty());
        assert_eq!(
            plan.marked_properties(),
            vec![FormatProperty::Es2015, FormatProperty::Esm2015]
        );
    }

    #[test]
    fn test_first_only_stops_at_first_compilable_property() {
        let temp = TempDir::new().unwrap();
        let ep = entry_point(
            temp.path(),
            r#"{"name": "lib", "fesm2015": "./gone.js", "module": "./m.js", "main": "./b.js"}"#,
            &["m.js", "b.js"],
        );
        let resolver =
            FormatResolver::new(&names(&["fesm2015", "module", "main"]), false, "1.0.0").unwrap();

        let plan = work(resolver.plan(&ep).unwrap());
        assert_eq!(plan.compile.len(), 1);
        assert_eq!(plan.compile[0].property, FormatProperty::Module);
        assert_eq!(plan.compile[0].aliases, vec![FormatProperty::Module]);
    }

    #[test]
    fn test_first_only_ignores_marks_below_the_first_property() {
        let temp = TempDir::new().unwrap();
        let ep = entry_point(
            temp.path(),
            r#"{"name": "lib", "es2015": "./a.js", "module": "./m.js",
                "__processed_by_prism__": {"module": "1.0.0"}}"#,
            &["a.js", "m.js"],
        );
        let resolver = FormatResolver::new(&names(&["es2015", "module"]), false, "1.0.0").unwrap();

        let plan = work(resolver.plan(&ep).unwrap());
        assert_eq!(plan.compile.len(), 1);
        assert_eq!(plan.compile[0].property, FormatProperty::Es2015);
        assert!(plan.mark_only.is_empty());
    }

    #[test]
    fn test_first_only_skips_when_the_first_alias_class_is_marked() {
        let temp = TempDir::new().unwrap();
        let ep = entry_point(
            temp.path(),
            r#"{"name": "lib", "es2015": "./a.js", "esm2015": "./a.js", "main": "./b.js",
                "__processed_by_prism__": {"esm2015": "1.0.0"}}"#,
            &["a.js", "b.js"],
        );
        let resolver = FormatResolver::new(&names(&["es2015", "main"]), false, "1.0.0").unwrap();
        assert_eq!(resolver.plan(&ep).unwrap(), EntryPointPlan::Processed);
    }

    #[test]
    fn test_marked_alias_is_marked_for_free() {
        let temp = TempDir::new().unwrap();
        let ep = entry_point(
            temp.path(),
            r#"{"name": "lib", "es2015": "./a.js", "esm2015": "./a.js", "main": "./b.js",
                "__processed_by_prism__": {"es2015": "1.0.0"}}"#,
            &["a.js", "b.js"],
        );
        let resolver = FormatResolver::new(&names(&["esm2015", "main"]), true, "1.0.0").unwrap();

        let plan = work(resolver.plan(&ep).unwrap());
        assert_eq!(plan.mark_only, vec![FormatProperty::Esm2015]);
        assert_eq!(plan.compile.len(), 1);
        assert_eq!(plan.compile[0].property, FormatProperty::Main);
    }

    #[test]
    fn test_processed_and_unprocessable() {
        let temp = TempDir::new().unwrap();
        let ep = entry_point(
            &temp.path().join("done"),
            r#"{"name": "lib", "module": "./m.js", "__processed_by_prism__": {"module": "1.0.0"}}"#,
            &["m.js"],
        );
        let resolver = FormatResolver::new(&names(&["module", "main"]), false, "1.0.0").unwrap();
        assert_eq!(resolver.plan(&ep).unwrap(), EntryPointPlan::Processed);

        let other = entry_point(
            &temp.path().join("other"),
            r#"{"name": "other", "browser": "./b.js"}"#,
            &["b.js"],
        );
        assert_eq!(resolver.plan(&other).unwrap(), EntryPointPlan::Unprocessable);
    }

    #[test]
    fn test_outdated_marker_is_fatal() {
        let temp = TempDir::new().unwrap();
        let ep = entry_point(
            temp.path(),
            r#"{"name": "lib", "module": "./m.js", "__processed_by_prism__": {"module": "0.9.0"}}"#,
            &["m.js"],
        );
        let resolver = FormatResolver::new(&names(&["module"]), true, "1.0.0").unwrap();
        assert!(matches!(
            resolver.plan(&ep),
            Err(BuildError::OutdatedMarker { .. })
        ));
    }

    #[test]
    fn test_unknown_names_only() {
        let err = FormatResolver::new(&names(&["x1", "y2"]), true, "1.0.0").unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedProperties { .. }));
    }

    #[test]
    fn test_validate_requires_a_declared_property() {
        let temp = TempDir::new().unwrap();
        let ep = entry_point(temp.path(), r#"{"name": "lib", "main": "./b.js"}"#, &["b.js"]);

        let resolver = FormatResolver::new(&names(&["fesm5", "x1"]), true, "1.0.0").unwrap();
        match resolver.validate(std::slice::from_ref(&ep)) {
            Err(BuildError::UnsupportedProperties { requested, .. }) => {
                assert_eq!(requested, names(&["fesm5", "x1"]));
            }
            other => panic!("expected UnsupportedProperties, got {:?}", other),
        }

        let resolver = FormatResolver::new(&names(&["main"]), true, "1.0.0").unwrap();
        assert!(resolver.validate(&[ep]).is_ok());
    }
}
