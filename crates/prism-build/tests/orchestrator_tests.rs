//! End-to-end runs over package trees on disk

use pretty_assertions::assert_eq;
use prism_build::{
    BuildError, BuildResult, Diagnostic, EntryPointBundle, ExecutionMode, FormatProperty,
    LogLevel, MemoryLogger, Orchestrator, ProcessOptions, TransformOutcome, TransformedFile,
    Transformer,
};
use rstest::rstest;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// One transformer call
#[derive(Debug, Clone)]
struct Call {
    entry_point: String,
    property: FormatProperty,
    typings: Option<PathBuf>,
}

/// Prefixes every bundle file and records what it was asked to do
#[derive(Default)]
struct RecordingTransformer {
    calls: Mutex<Vec<Call>>,
    /// Dependencies found unmarked when a dependent was compiled
    unmarked_dependencies: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingTransformer {
    fn failing_on(name: &str) -> Self {
        Self {
            fail_on: Some(name.to_string()),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn compiled(&self, name: &str) -> Vec<FormatProperty> {
        self.calls()
            .into_iter()
            .filter(|call| call.entry_point == name)
            .map(|call| call.property)
            .collect()
    }
}

impl Transformer for RecordingTransformer {
    fn transform(&self, bundle: &EntryPointBundle<'_>) -> BuildResult<TransformOutcome> {
        let entry_point = bundle.entry_point;
        for dep in entry_point.all_dependencies() {
            let manifest = fs::read_to_string(dep.join("package.json")).unwrap();
            if !manifest.contains("__processed_by_prism__") {
                self.unmarked_dependencies
                    .lock()
                    .unwrap()
                    .push(dep.display().to_string());
            }
        }
        self.calls.lock().unwrap().push(Call {
            entry_point: entry_point.name.clone(),
            property: bundle.property,
            typings: bundle.typings.clone(),
        });

        if self.fail_on.as_deref() == Some(entry_point.name.as_str()) {
            return Ok(TransformOutcome::Diagnostics(vec![Diagnostic {
                file: bundle.entry_file.clone(),
                line: 1,
                column: 1,
                message: "Unexpected decorator".to_string(),
            }]));
        }

        let mut files = Vec::new();
        for file in &bundle.files {
            let original = fs::read_to_string(file).unwrap();
            files.push(TransformedFile::new(
                file,
                format!("/* compiled as {} */\n{}", bundle.format, original),
            ));
        }
        if let Some(typings) = &bundle.typings {
            let original = fs::read_to_string(typings).unwrap();
            files.push(TransformedFile::new(
                typings,
                format!("/* compiled */\n{}", original),
            ));
        }
        Ok(TransformOutcome::Success(files))
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A package shipping esm2015 (aliased by es2015), esm5 (`module`), a UMD
/// `main` bundle and typings, each importing `deps`
fn package(nm: &Path, name: &str, deps: &[&str]) {
    let dir = nm.join(name);
    write(
        &dir.join("package.json"),
        &format!(
            r#"{{
  "name": "{name}",
  "version": "1.0.0",
  "typings": "./index.d.ts",
  "es2015": "./esm2015/index.js",
  "esm2015": "./esm2015/index.js",
  "module": "./esm5/index.js",
  "main": "./bundles/{name}.umd.js"
}}
"#
        ),
    );

    let imports: String = deps
        .iter()
        .map(|dep| format!("import '{}';\n", dep))
        .collect();
    write(
        &dir.join("esm2015/index.js"),
        &format!("{}export * from './impl';\n", imports),
    );
    write(&dir.join("esm2015/impl.js"), "export const value = 1;\n");
    write(
        &dir.join("esm5/index.js"),
        &format!("{}export var value = 1;\n", imports),
    );

    let amd: String = deps.iter().map(|dep| format!(", '{}'", dep)).collect();
    let requires: String = deps
        .iter()
        .map(|dep| format!(", require('{}')", dep))
        .collect();
    write(
        &dir.join(format!("bundles/{}.umd.js", name)),
        &format!(
            "(function (global, factory) {{\n  typeof exports === 'object' ? factory(exports{requires}) :\n  typeof define === 'function' && define.amd ? define(['exports'{amd}], factory) : factory({{}});\n}}(this, function (exports) {{ exports.value = 1; }}));\n"
        ),
    );

    let reexports: String = deps
        .iter()
        .filter(|dep| !dep.starts_with("missing"))
        .map(|dep| format!("export * from '{}';\n", dep))
        .collect();
    write(
        &dir.join("index.d.ts"),
        &format!("{}export declare const value: number;\n", reexports),
    );
}

/// app → common → core, plus an unrelated leaf
fn tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let nm = temp.path().join("node_modules");
    package(&nm, "app", &["common"]);
    package(&nm, "common", &["core"]);
    package(&nm, "core", &[]);
    package(&nm, "leaf", &[]);
    temp
}

fn options(root: &Path) -> ProcessOptions {
    ProcessOptions::new(root.join("node_modules"))
        .with_tool_version("1.0.0")
        .with_execution_mode(ExecutionMode::Synchronous)
}

fn manifest(dir: &Path) -> serde_json::Map<String, Value> {
    let content = fs::read_to_string(dir.join("package.json")).unwrap();
    match serde_json::from_str(&content).unwrap() {
        Value::Object(map) => map,
        other => panic!("manifest is not an object: {}", other),
    }
}

fn markers(dir: &Path) -> Vec<String> {
    manifest(dir)
        .get("__processed_by_prism__")
        .and_then(Value::as_object)
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}

/// Every file below `dir` with its bytes
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.insert(path.clone(), fs::read(&path).unwrap());
            }
        }
    }
    files
}

#[rstest]
#[case::in_thread(ExecutionMode::Synchronous)]
#[case::pool(ExecutionMode::Parallel)]
fn test_dependencies_are_committed_before_dependents_compile(#[case] mode: ExecutionMode) {
    let temp = tree();
    let transformer = Arc::new(RecordingTransformer::default());
    let options = options(temp.path())
        .with_execution_mode(mode)
        .with_max_workers(4);

    let summary = Orchestrator::new(options, transformer.clone()).run().unwrap();

    assert_eq!(summary.discovered, 4);
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.skipped, 0);
    assert!(transformer.unmarked_dependencies.lock().unwrap().is_empty());

    let calls = transformer.calls();
    let first = |name: &str| calls.iter().position(|c| c.entry_point == name).unwrap();
    let last = |name: &str| calls.iter().rposition(|c| c.entry_point == name).unwrap();
    assert!(last("core") < first("common"));
    assert!(last("common") < first("app"));
}

#[test]
fn test_compile_all_collapses_aliases_and_processes_typings_once() {
    let temp = tree();
    let transformer = Arc::new(RecordingTransformer::default());

    let summary = Orchestrator::new(options(temp.path()), transformer.clone())
        .run()
        .unwrap();

    assert_eq!(
        transformer.compiled("core"),
        vec![
            FormatProperty::Es2015,
            FormatProperty::Main,
            FormatProperty::Module
        ]
    );
    let core_calls: Vec<Call> = transformer
        .calls()
        .into_iter()
        .filter(|c| c.entry_point == "core")
        .collect();
    assert!(core_calls[0].typings.is_some());
    assert!(core_calls[1..].iter().all(|c| c.typings.is_none()));

    let core = temp.path().join("node_modules/core");
    assert_eq!(
        markers(&core),
        vec!["es2015", "esm2015", "main", "module", "typings"]
    );
    assert_eq!(summary.compiled.len(), 12);
}

#[test]
fn test_second_run_writes_nothing_and_logs_skips() {
    let temp = tree();
    Orchestrator::new(
        options(temp.path()),
        Arc::new(RecordingTransformer::default()),
    )
    .run()
    .unwrap();
    let before = snapshot(temp.path());

    let logger = Arc::new(MemoryLogger::new());
    let transformer = Arc::new(RecordingTransformer::default());
    let summary = Orchestrator::new(
        options(temp.path()).with_logger(logger.clone()),
        transformer.clone(),
    )
    .run()
    .unwrap();

    assert!(transformer.calls().is_empty());
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped, 4);
    assert_eq!(snapshot(temp.path()), before);
    assert!(logger.contains(
        LogLevel::Debug,
        "Skipping core : es2015, esm2015, main, module (already compiled)."
    ));
}

/// Package `p`: es2015 and esm2015 share `a.js`, main is `b.js`
fn alias_package() -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("node_modules/p");
    write(
        &dir.join("package.json"),
        r#"{"name": "p", "es2015": "./a.js", "esm2015": "./a.js", "main": "./b.js"}"#,
    );
    write(&dir.join("a.js"), "export const a = 1;\n");
    write(&dir.join("b.js"), "exports.b = 1;\n");
    temp
}

#[test]
fn test_aliased_properties_compile_once() {
    let temp = alias_package();
    let dir = temp.path().join("node_modules/p");
    let transformer = Arc::new(RecordingTransformer::default());

    Orchestrator::new(
        options(temp.path()).with_properties(["es2015", "esm2015"]),
        transformer.clone(),
    )
    .run()
    .unwrap();

    assert_eq!(transformer.compiled("p"), vec![FormatProperty::Es2015]);
    assert_eq!(markers(&dir), vec!["es2015", "esm2015", "typings"]);
    assert_eq!(manifest(&dir)["main"], Value::String("./b.js".into()));
    assert_eq!(fs::read_to_string(dir.join("b.js")).unwrap(), "exports.b = 1;\n");

    let before = fs::read(dir.join("package.json")).unwrap();
    let logger = Arc::new(MemoryLogger::new());
    let transformer = Arc::new(RecordingTransformer::default());
    Orchestrator::new(
        options(temp.path())
            .with_properties(["esm2015"])
            .with_logger(logger.clone()),
        transformer.clone(),
    )
    .run()
    .unwrap();

    assert!(transformer.calls().is_empty());
    assert_eq!(fs::read(dir.join("package.json")).unwrap(), before);
    assert!(logger.contains(LogLevel::Debug, "Skipping p : esm2015 (already compiled)."));
}

#[test]
fn test_first_only_marks_a_single_alias_class() {
    let temp = tree();
    let transformer = Arc::new(RecordingTransformer::default());

    Orchestrator::new(
        options(temp.path())
            .with_properties(["module", "main"])
            .with_compile_all_formats(false),
        transformer.clone(),
    )
    .run()
    .unwrap();

    assert_eq!(transformer.compiled("core"), vec![FormatProperty::Module]);
    let core = temp.path().join("node_modules/core");
    assert_eq!(markers(&core), vec!["module", "typings"]);
}

#[test]
fn test_first_only_compiles_the_first_unmarked_property() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("node_modules/p");
    write(
        &dir.join("package.json"),
        r#"{"name": "p", "es2015": "./a.js", "module": "./m.js",
  "__processed_by_prism__": {"module": "1.0.0"}}"#,
    );
    write(&dir.join("a.js"), "export const a = 1;\n");
    write(&dir.join("m.js"), "export var m = 1;\n");

    let first_only = || {
        options(temp.path())
            .with_properties(["es2015", "module"])
            .with_compile_all_formats(false)
    };
    let transformer = Arc::new(RecordingTransformer::default());
    Orchestrator::new(first_only(), transformer.clone())
        .run()
        .unwrap();

    assert_eq!(transformer.compiled("p"), vec![FormatProperty::Es2015]);
    assert_eq!(markers(&dir), vec!["module", "es2015", "typings"]);
    assert_eq!(
        manifest(&dir)["__processed_by_prism__"],
        serde_json::json!({"module": "1.0.0", "es2015": "1.0.0", "typings": "1.0.0"})
    );
    assert_eq!(fs::read_to_string(dir.join("m.js")).unwrap(), "export var m = 1;\n");

    let transformer = Arc::new(RecordingTransformer::default());
    Orchestrator::new(first_only(), transformer.clone())
        .run()
        .unwrap();
    assert!(transformer.calls().is_empty());
}

#[test]
fn test_targeted_run_compiles_only_the_closure() {
    let temp = tree();
    let transformer = Arc::new(RecordingTransformer::default());
    let target = temp.path().join("node_modules/common");

    let summary = Orchestrator::new(
        options(temp.path()).with_target(&target),
        transformer.clone(),
    )
    .run()
    .unwrap();

    assert_eq!(summary.processed, 2);
    assert!(transformer.compiled("app").is_empty());
    assert!(transformer.compiled("leaf").is_empty());
    assert!(!transformer.compiled("core").is_empty());

    let logger = Arc::new(MemoryLogger::new());
    let again = Orchestrator::new(
        options(temp.path())
            .with_target(&target)
            .with_logger(logger.clone()),
        Arc::new(RecordingTransformer::default()),
    )
    .run()
    .unwrap();
    assert_eq!(again.skipped, 1);
    assert!(logger.contains(LogLevel::Debug, "has already been processed"));
}

/// `lib/deep` has no manifest; configuration declares it and `app` imports it
fn configured_deep_import() -> TempDir {
    let temp = TempDir::new().unwrap();
    let nm = temp.path().join("node_modules");
    write(
        &temp.path().join("prism.config.toml"),
        "[packages.\"lib\".entry-points.\"./deep\".override]\nmodule = \"./widget.js\"\n",
    );
    write(
        &nm.join("app/package.json"),
        r#"{"name": "app", "module": "./index.js"}"#,
    );
    write(&nm.join("app/index.js"), "import { w } from 'lib/deep';\n");
    write(
        &nm.join("lib/package.json"),
        r#"{"name": "lib", "module": "./index.js"}"#,
    );
    write(&nm.join("lib/index.js"), "export const l = 1;\n");
    write(&nm.join("lib/deep/widget.js"), "export const w = 1;\n");
    temp
}

#[rstest]
#[case::discovery(false)]
#[case::targeted(true)]
fn test_configured_entry_point_is_compiled_before_its_importer(#[case] targeted: bool) {
    let temp = configured_deep_import();
    let nm = temp.path().join("node_modules");
    let mut options = options(temp.path()).with_properties(["module"]);
    if targeted {
        options = options.with_target(nm.join("app"));
    }
    let transformer = Arc::new(RecordingTransformer::default());

    let summary = Orchestrator::new(options, transformer.clone()).run().unwrap();

    assert_eq!(summary.invalid, 0);
    let order: Vec<String> = transformer
        .calls()
        .into_iter()
        .map(|call| call.entry_point)
        .collect();
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(position("lib/deep") < position("app"));
    assert!(transformer.unmarked_dependencies.lock().unwrap().is_empty());
    assert_eq!(markers(&nm.join("app")), vec!["module", "typings"]);
}

#[test]
fn test_configured_property_removal_is_logged_and_honored() {
    let temp = tree();
    write(
        &temp.path().join("prism.config.toml"),
        "[packages.core.entry-points.\".\".override]\nmain = false\n",
    );
    let logger = Arc::new(MemoryLogger::new());
    let transformer = Arc::new(RecordingTransformer::default());

    Orchestrator::new(
        options(temp.path()).with_logger(logger.clone()),
        transformer.clone(),
    )
    .run()
    .unwrap();

    assert!(logger.contains(
        LogLevel::Debug,
        "Ignoring property main of entry-point core (configured)"
    ));
    assert!(!transformer.compiled("core").contains(&FormatProperty::Main));
    assert!(transformer.compiled("leaf").contains(&FormatProperty::Main));
    let core = temp.path().join("node_modules/core");
    assert!(!markers(&core).contains(&"main".to_string()));
}

#[test]
fn test_targeted_missing_dependency_changes_nothing() {
    let temp = TempDir::new().unwrap();
    let nm = temp.path().join("node_modules");
    package(&nm, "app", &["core", "missing-lib"]);
    package(&nm, "core", &[]);
    let before = snapshot(temp.path());
    let transformer = Arc::new(RecordingTransformer::default());

    let err = Orchestrator::new(
        options(temp.path()).with_target(nm.join("app")),
        transformer.clone(),
    )
    .run()
    .unwrap_err();

    match err {
        BuildError::MissingDependencies { target, missing } => {
            assert_eq!(target, nm.join("app"));
            assert_eq!(missing, vec!["missing-lib"]);
        }
        other => panic!("expected MissingDependencies, got {:?}", other),
    }
    assert!(transformer.calls().is_empty());
    assert_eq!(snapshot(temp.path()), before);
}

#[test]
fn test_unknown_properties_are_rejected() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("node_modules/lib");
    write(
        &dir.join("package.json"),
        r#"{"name": "lib", "main": "./index.js", "module": "./index.mjs"}"#,
    );
    write(&dir.join("index.js"), "exports.a = 1;\n");
    write(&dir.join("index.mjs"), "export const a = 1;\n");

    let err = Orchestrator::new(
        options(temp.path()).with_properties(["x1", "y2"]),
        Arc::new(RecordingTransformer::default()),
    )
    .run()
    .unwrap_err();

    assert!(matches!(err, BuildError::UnsupportedProperties { .. }));
    let message = err.to_string();
    assert!(message.contains("[x1, y2]"));
    assert!(message.contains("main"));
    assert!(message.contains("module"));
}

#[test]
fn test_no_entry_point_declares_a_requested_property() {
    let temp = alias_package();
    let err = Orchestrator::new(
        options(temp.path()).with_properties(["fesm5", "x1"]),
        Arc::new(RecordingTransformer::default()),
    )
    .run()
    .unwrap_err();

    match err {
        BuildError::UnsupportedProperties { requested, .. } => {
            assert_eq!(requested, vec!["fesm5", "x1"]);
        }
        other => panic!("expected UnsupportedProperties, got {:?}", other),
    }
}

#[test]
fn test_unprocessable_entry_points_are_reported_together() {
    let temp = tree();
    let nm = temp.path().join("node_modules");
    for name in ["b-umd-only", "a-umd-only"] {
        write(
            &nm.join(name).join("package.json"),
            &format!(r#"{{"name": "{}", "browser": "./index.js"}}"#, name),
        );
        write(&nm.join(name).join("index.js"), "exports.a = 1;\n");
    }
    let transformer = Arc::new(RecordingTransformer::default());

    let err = Orchestrator::new(
        options(temp.path()).with_properties(["module"]),
        transformer.clone(),
    )
    .run()
    .unwrap_err();

    match err {
        BuildError::UnprocessableEntryPoints { properties, paths } => {
            assert_eq!(properties, vec!["module"]);
            assert_eq!(paths, vec![nm.join("a-umd-only"), nm.join("b-umd-only")]);
        }
        other => panic!("expected UnprocessableEntryPoints, got {:?}", other),
    }
    assert!(transformer.calls().is_empty());
}

#[test]
fn test_compilation_diagnostics_stop_the_run() {
    let temp = tree();
    let nm = temp.path().join("node_modules");
    let transformer = Arc::new(RecordingTransformer::failing_on("common"));

    let err = Orchestrator::new(options(temp.path()), transformer.clone())
        .run()
        .unwrap_err();

    assert!(matches!(err, BuildError::Compilation { .. }));
    assert!(err
        .to_string()
        .contains("esm2015/index.js:1:1 - error: Unexpected decorator"));
    assert!(!markers(&nm.join("core")).is_empty());
    assert!(markers(&nm.join("common")).is_empty());
    assert!(transformer.compiled("app").is_empty());
}

#[test]
fn test_outdated_marker_is_fatal() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("node_modules/lib");
    write(
        &dir.join("package.json"),
        r#"{"name": "lib", "module": "./index.js", "__processed_by_prism__": {"module": "0.0.1"}}"#,
    );
    write(&dir.join("index.js"), "export const a = 1;\n");

    let err = Orchestrator::new(
        options(temp.path()),
        Arc::new(RecordingTransformer::default()),
    )
    .run()
    .unwrap_err();

    match err {
        BuildError::OutdatedMarker { found, current, .. } => {
            assert_eq!(found, "0.0.1");
            assert_eq!(current, "1.0.0");
        }
        other => panic!("expected OutdatedMarker, got {:?}", other),
    }
}

#[test]
fn test_side_by_side_keeps_originals() {
    let temp = tree();
    let core = temp.path().join("node_modules/core");
    let original = fs::read_to_string(core.join("esm2015/index.js")).unwrap();
    let original_typings = fs::read_to_string(core.join("index.d.ts")).unwrap();

    Orchestrator::new(
        options(temp.path()).with_new_entry_point_formats(true),
        Arc::new(RecordingTransformer::default()),
    )
    .run()
    .unwrap();

    assert_eq!(
        fs::read_to_string(core.join("esm2015/index.js")).unwrap(),
        original
    );
    assert!(!core.join("esm2015/index.js.__prism_bak").exists());
    assert!(fs::read_to_string(core.join("__prism__/esm2015/index.js"))
        .unwrap()
        .starts_with("/* compiled as esm2015 */"));
    assert!(core.join("__prism__/esm2015/impl.js").is_file());

    assert!(fs::read_to_string(core.join("index.d.ts"))
        .unwrap()
        .starts_with("/* compiled */"));
    assert_eq!(
        fs::read_to_string(core.join("index.d.ts.__prism_bak")).unwrap(),
        original_typings
    );

    let manifest = manifest(&core);
    assert_eq!(
        manifest["es2015_prism"],
        Value::String("./__prism__/esm2015/index.js".into())
    );
    assert_eq!(
        manifest["main_prism"],
        Value::String("./__prism__/bundles/core.umd.js".into())
    );
    let keys: Vec<&String> = manifest.keys().collect();
    let position = |key: &str| keys.iter().position(|k| *k == key).unwrap();
    assert_eq!(position("es2015_prism") + 1, position("es2015"));
    assert_eq!(position("esm2015_prism") + 1, position("esm2015"));
}

#[test]
fn test_overwrite_keeps_backups() {
    let temp = tree();
    let core = temp.path().join("node_modules/core");
    let original = fs::read_to_string(core.join("esm5/index.js")).unwrap();

    Orchestrator::new(
        options(temp.path()),
        Arc::new(RecordingTransformer::default()),
    )
    .run()
    .unwrap();

    assert!(fs::read_to_string(core.join("esm5/index.js"))
        .unwrap()
        .starts_with("/* compiled as esm5 */"));
    assert_eq!(
        fs::read_to_string(core.join("esm5/index.js.__prism_bak")).unwrap(),
        original
    );
    assert!(!core.join("__prism__").exists());
    assert!(!manifest(&core).contains_key("module_prism"));
    assert_eq!(
        manifest(&core)["scripts"]["prepublishOnly__prism_bak"],
        Value::Null
    );
}

#[test]
fn test_summary_serializes() {
    let temp = alias_package();
    let summary = Orchestrator::new(
        options(temp.path()).with_properties(["es2015"]),
        Arc::new(RecordingTransformer::default()),
    )
    .run()
    .unwrap();

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["processed"], 1);
    assert_eq!(json["compiled"], serde_json::json!([["p", "es2015"]]));
}

#[tokio::test]
async fn test_run_async_resolves_to_the_run_result() {
    let temp = tree();
    let handle = Orchestrator::new(
        options(temp.path()).with_execution_mode(ExecutionMode::Parallel),
        Arc::new(RecordingTransformer::default()),
    )
    .run_async();

    let summary = handle.await.unwrap();
    assert_eq!(summary.processed, 4);

    let err = Orchestrator::new(
        options(temp.path()).with_properties(["x1"]),
        Arc::new(RecordingTransformer::default()),
    )
    .run_async()
    .await
    .unwrap_err();
    assert!(matches!(err, BuildError::UnsupportedProperties { .. }));
}
