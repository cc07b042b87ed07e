//! Run orchestration
//!
//! One run: locate entry-points, order them, decide per entry-point what to
//! compile, then dispatch the work and commit the results.
use crate::error::{BuildError, BuildResult};
use crate::formats::{EntryPointPlan, FormatResolver};
use crate::logging::{Logger, TracingLogger};
use crate::marker::MarkingStore;
use crate::scheduler::{ExecutionMode, TaskScheduler};
use crate::task::{Task, TaskExecutor, TaskQueue, TaskReport};
use crate::transformer::{format_diagnostics, EntryPointBundle, TransformOutcome, Transformer};
use crate::writer::{CompiledFormat, OutputWriter, WritePolicy};
use prism_config::ConfigLoader;
use prism_package::{
    host_for, DependencyCollector, DependencyResolver, EntryPointLocator,
    EntryPointStatus, FormatProperty, ModuleResolver, PathMappings, SortedEntryPoints,
};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Invocation parameters
#[derive(Clone)]
pub struct ProcessOptions {
    /// Directory holding the installed packages (`node_modules`)
    pub base_path: PathBuf,
    /// Process only this entry-point and what it depends on
    pub target_entry_point_path: Option<PathBuf>,
    /// Format properties to consider, highest priority first
    pub properties_to_consider: Vec<String>,
    /// Compile every requested format instead of the first usable one
    pub compile_all_formats: bool,
    /// Write compiled formats side-by-side instead of over the originals
    pub create_new_entry_point_formats: bool,
    pub path_mappings: Option<PathMappings>,
    /// `tsconfig.json` to read path mappings from when none are given
    pub tsconfig_path: Option<PathBuf>,
    pub execution_mode: ExecutionMode,
    pub max_workers: Option<usize>,
    /// Project configuration file, instead of looking next to `base_path`
    pub config_path: Option<PathBuf>,
    /// Version written into processing markers
    pub tool_version: String,
    pub logger: Arc<dyn Logger>,
}

impl ProcessOptions {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            target_entry_point_path: None,
            properties_to_consider: FormatProperty::supported_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            compile_all_formats: true,
            create_new_entry_point_formats: false,
            path_mappings: None,
            tsconfig_path: None,
            execution_mode: ExecutionMode::default(),
            max_workers: None,
            config_path: None,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            logger: Arc::new(TracingLogger),
        }
    }

    pub fn with_target(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_entry_point_path = Some(path.into());
        self
    }

    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties_to_consider = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_compile_all_formats(mut self, compile_all: bool) -> Self {
        self.compile_all_formats = compile_all;
        self
    }

    pub fn with_new_entry_point_formats(mut self, side_by_side: bool) -> Self {
        self.create_new_entry_point_formats = side_by_side;
        self
    }

    pub fn with_path_mappings(mut self, mappings: PathMappings) -> Self {
        self.path_mappings = Some(mappings);
        self
    }

    pub fn with_tsconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.tsconfig_path = Some(path.into());
        self
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = Some(max);
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = version.into();
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Output policy selected by `create_new_entry_point_formats`
    pub fn write_policy(&self) -> WritePolicy {
        if self.create_new_entry_point_formats {
            WritePolicy::SideBySide
        } else {
            WritePolicy::Overwrite
        }
    }
}

impl fmt::Debug for ProcessOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessOptions")
            .field("base_path", &self.base_path)
            .field("target_entry_point_path", &self.target_entry_point_path)
            .field("properties_to_consider", &self.properties_to_consider)
            .field("compile_all_formats", &self.compile_all_formats)
            .field(
                "create_new_entry_point_formats",
                &self.create_new_entry_point_formats,
            )
            .field("path_mappings", &self.path_mappings)
            .field("tsconfig_path", &self.tsconfig_path)
            .field("execution_mode", &self.execution_mode)
            .field("max_workers", &self.max_workers)
            .field("config_path", &self.config_path)
            .field("tool_version", &self.tool_version)
            .finish_non_exhaustive()
    }
}

/// Run statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Entry-points considered, invalid ones included
    pub discovered: usize,
    /// Entry-points that had work done
    pub processed: usize,
    /// Entry-points with nothing left to do
    pub skipped: usize,
    /// Entry-points excluded for missing dependencies
    pub invalid: usize,
    /// Compiled entry-point names and properties, in completion order
    pub compiled: Vec<(String, FormatProperty)>,
    pub elapsed: Duration,
}

/// Drives a processing run
pub struct Orchestrator {
    options: ProcessOptions,
    transformer: Arc<dyn Transformer>,
}

impl Orchestrator {
    pub fn new(options: ProcessOptions, transformer: Arc<dyn Transformer>) -> Self {
        Self {
            options,
            transformer,
        }
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Process the package tree, blocking until done
    pub fn run(&self) -> BuildResult<RunSummary> {
        let start = Instant::now();
        let options = &self.options;
        let logger = options.logger.as_ref();

        let formats = FormatResolver::new(
            &options.properties_to_consider,
            options.compile_all_formats,
            options.tool_version.clone(),
        )?;
        let path_mappings = self.path_mappings()?;
        let mut locator =
            EntryPointLocator::new(&options.base_path, self.config()?, path_mappings.as_ref());

        let mut summary = RunSummary::default();
        let (sorted, resolver) = match &options.target_entry_point_path {
            Some(target) => {
                if let EntryPointStatus::Valid(entry_point) = locator.locate_entry_point(target)? {
                    formats.validate(std::slice::from_ref(&*entry_point))?;
                    if formats.plan(&entry_point)? == EntryPointPlan::Processed {
                        logger.debug(&format!(
                            "The target entry-point {} has already been processed",
                            entry_point.name
                        ));
                        summary.discovered = 1;
                        summary.skipped = 1;
                        summary.elapsed = start.elapsed();
                        return Ok(summary);
                    }
                }
                let resolver = dependency_resolver(&mut locator, path_mappings)?;
                let sorted =
                    resolver.sort_target_closure(&mut locator, target, formats.properties())?;
                (sorted, resolver)
            }
            None => {
                let discovered = locator.find_entry_points()?;
                for path in &discovered.ignored {
                    logger.debug(&format!("Ignoring entry-point {}", path.display()));
                }
                for (path, reason) in &discovered.incompatible {
                    logger.debug(&format!(
                        "Skipping incompatible entry-point {}: {}",
                        path.display(),
                        reason
                    ));
                }
                for entry_point in &discovered.entry_points {
                    for property in entry_point.policy.ignored_properties() {
                        logger.debug(&format!(
                            "Ignoring property {} of entry-point {} (configured)",
                            property, entry_point.name
                        ));
                    }
                }
                formats.validate(&discovered.entry_points)?;
                let resolver = dependency_resolver(&mut locator, path_mappings)?;
                let sorted = resolver.sort_entry_points_by_dependency(
                    discovered.entry_points,
                    formats.properties(),
                )?;
                (sorted, resolver)
            }
        };

        summary.discovered = sorted.entry_points.len() + sorted.invalid.len();
        summary.invalid = sorted.invalid.len();
        self.log_resolution(&sorted);

        let SortedEntryPoints {
            entry_points,
            graph,
            ..
        } = sorted;

        let mut tasks = Vec::new();
        let mut unprocessable = Vec::new();
        for entry_point in entry_points {
            match formats.plan(&entry_point)? {
                EntryPointPlan::Work(plan) => tasks.push(Task {
                    process_typings: FormatResolver::process_typings(&entry_point),
                    entry_point,
                    plan,
                }),
                EntryPointPlan::Processed => {
                    let done: Vec<&str> = formats
                        .properties()
                        .iter()
                        .filter(|p| entry_point.manifest.processed_version(p.name()).is_some())
                        .map(|p| p.name())
                        .collect();
                    logger.debug(&format!(
                        "Skipping {} : {} (already compiled).",
                        entry_point.name,
                        done.join(", ")
                    ));
                    summary.skipped += 1;
                }
                EntryPointPlan::Unprocessable => unprocessable.push(entry_point.path),
            }
        }

        if !unprocessable.is_empty() {
            let position = |path: &PathBuf| graph.nodes().iter().position(|node| node == path);
            unprocessable.sort_by_key(position);
            return Err(BuildError::UnprocessableEntryPoints {
                properties: formats
                    .properties()
                    .iter()
                    .map(|p| p.name().to_string())
                    .collect(),
                paths: unprocessable,
            });
        }

        let scheduler = TaskScheduler::new(options.execution_mode, options.max_workers);
        logger.debug(&format!(
            "Processing {} entry-points with {} worker(s)",
            tasks.len(),
            scheduler.workers()
        ));

        let runner = TaskRunner {
            transformer: Arc::clone(&self.transformer),
            writer: OutputWriter::new(
                options.write_policy(),
                MarkingStore::new(options.tool_version.clone()),
            ),
            module_resolver: resolver.module_resolver().clone(),
            logger: Arc::clone(&options.logger),
        };
        let reports = scheduler.run(TaskQueue::new(tasks, &graph), Arc::new(runner))?;

        summary.processed = reports.len();
        summary.compiled = reports
            .iter()
            .flat_map(|report| {
                report
                    .compiled
                    .iter()
                    .map(move |property| (report.entry_point.clone(), *property))
            })
            .collect();
        summary.elapsed = start.elapsed();

        logger.info(&format!(
            "Processed {} entry-points ({} skipped, {} invalid) in {:.2?}",
            summary.processed, summary.skipped, summary.invalid, summary.elapsed
        ));
        Ok(summary)
    }

    /// Process the package tree on a background thread.
    ///
    /// The returned handle resolves to the same result [`run`](Self::run)
    /// would have returned.
    pub fn run_async(self) -> RunHandle {
        let (tx, rx) = oneshot::channel();
        let spawned = std::thread::Builder::new()
            .name("prism-orchestrator".to_string())
            .spawn(move || {
                let _ = tx.send(self.run());
            });

        match spawned {
            Ok(_) => RunHandle { rx },
            Err(e) => {
                let (tx, rx) = oneshot::channel();
                let _ = tx.send(Err(BuildError::WorkerPool(e.to_string())));
                RunHandle { rx }
            }
        }
    }

    fn path_mappings(&self) -> BuildResult<Option<PathMappings>> {
        if let Some(mappings) = &self.options.path_mappings {
            return Ok(Some(mappings.clone()));
        }
        match &self.options.tsconfig_path {
            Some(path) => Ok(PathMappings::from_tsconfig(path)?),
            None => Ok(None),
        }
    }

    /// Project configuration: the explicit file, or the one in the
    /// directory above `base_path`
    fn config(&self) -> BuildResult<ConfigLoader> {
        let loader = match &self.options.config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(default_project_path(&self.options.base_path))?,
        };
        Ok(loader)
    }

    fn log_resolution(&self, sorted: &SortedEntryPoints) {
        let logger = self.options.logger.as_ref();
        for invalid in &sorted.invalid {
            logger.warn(&format!(
                "Invalid entry-point {}. It is missing required dependencies:\n{}",
                invalid.entry_point.path.display(),
                invalid
                    .missing
                    .iter()
                    .map(|m| format!(" - {}", m))
                    .collect::<Vec<_>>()
                    .join("\n")
            ));
        }
        for (importer, import) in &sorted.deep_imports {
            logger.warn(&format!(
                "Entry point {} contains deep import '{}' into {}. \
                 This may cause entry-points to be compiled out of order.",
                importer.display(),
                import.specifier,
                import.path.display()
            ));
        }
    }
}

/// Future for a background run
#[derive(Debug)]
pub struct RunHandle {
    rx: oneshot::Receiver<BuildResult<RunSummary>>,
}

impl RunHandle {
    /// Block the current thread until the run finishes.
    ///
    /// Must not be called from inside an async runtime; await the handle
    /// there instead.
    pub fn wait(self) -> BuildResult<RunSummary> {
        self.rx.blocking_recv().unwrap_or(Err(BuildError::Aborted))
    }
}

impl Future for RunHandle {
    type Output = BuildResult<RunSummary>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(BuildError::Aborted)))
    }
}

/// Compiles and commits one entry-point per task
struct TaskRunner {
    transformer: Arc<dyn Transformer>,
    writer: OutputWriter,
    module_resolver: ModuleResolver,
    logger: Arc<dyn Logger>,
}

impl TaskExecutor for TaskRunner {
    fn execute(&self, task: Task) -> BuildResult<TaskReport> {
        let Task {
            mut entry_point,
            plan,
            process_typings,
        } = task;
        let collector = DependencyCollector::new(&self.module_resolver);
        let mut compiled = Vec::with_capacity(plan.compile.len());
        let mut formats = Vec::with_capacity(plan.compile.len());

        for (i, step) in plan.compile.iter().enumerate() {
            let bundle_files = collector.collect(host_for(step.format).as_ref(), &step.path)?.files;
            let bundle = EntryPointBundle {
                entry_point: &entry_point,
                property: step.property,
                format: step.format,
                entry_file: step.path.clone(),
                files: bundle_files.clone(),
                typings: if i == 0 && process_typings {
                    entry_point.typings.clone()
                } else {
                    None
                },
                generate_deep_reexports: entry_point.policy.generate_deep_reexports,
            };

            self.logger.info(&format!(
                "Compiling {} : {} as {}",
                entry_point.name, step.property, step.format
            ));
            let files = match self.transformer.transform(&bundle)? {
                TransformOutcome::Success(files) => files,
                TransformOutcome::Diagnostics(diagnostics) => {
                    return Err(BuildError::compilation(
                        &entry_point.name,
                        format_diagnostics(&diagnostics),
                    ))
                }
            };

            let output = self
                .writer
                .write_bundle(&entry_point, &step.path, &bundle_files, &files)?;
            formats.push(CompiledFormat {
                properties: step.aliases.clone(),
                output_entry_file: output,
            });
            compiled.push(step.property);
        }

        self.writer
            .commit(&mut entry_point, &formats, &plan.mark_only)?;

        Ok(TaskReport {
            entry_point: entry_point.name.clone(),
            path: entry_point.path.clone(),
            compiled,
            marked: plan.marked_properties(),
        })
    }
}

/// Project directory used when no configuration path is given
pub fn default_project_path(base_path: &Path) -> &Path {
    base_path.parent().unwrap_or(base_path)
}

/// Resolver that also knows the entry-points declared only in configuration
fn dependency_resolver(
    locator: &mut EntryPointLocator,
    path_mappings: Option<PathMappings>,
) -> BuildResult<DependencyResolver> {
    let configured = locator.configured_entry_points()?;
    Ok(DependencyResolver::new(
        ModuleResolver::new(path_mappings).with_configured_entry_points(configured),
    ))
}
