//! Task units and the dependency-ordered ready queue
use crate::error::BuildResult;
use crate::formats::FormatPlan;
use prism_package::{DependencyGraph, EntryPoint, FormatProperty};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// All the work for one entry-point in one run
#[derive(Debug, Clone)]
pub struct Task {
    pub entry_point: EntryPoint,
    pub plan: FormatPlan,
    /// Whether declarations are handed to the transformer with the first step
    pub process_typings: bool,
}

impl Task {
    pub fn path(&self) -> &Path {
        &self.entry_point.path
    }
}

/// What a finished task did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    /// Entry-point name
    pub entry_point: String,
    pub path: PathBuf,
    /// Properties handed to the transformer
    pub compiled: Vec<FormatProperty>,
    /// Properties marked, aliases included
    pub marked: Vec<FormatProperty>,
}

/// Runs one task to completion
///
/// Shared between worker threads, so a single executor sees tasks for
/// different entry-points at the same time.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: Task) -> BuildResult<TaskReport>;
}

/// Hands out tasks whose dependencies are done
#[derive(Debug)]
pub struct TaskQueue {
    /// Tasks by topological index; `None` once handed out
    tasks: Vec<Option<Task>>,
    index: HashMap<PathBuf, usize>,
    /// Dependencies of each task not yet done
    remaining: Vec<usize>,
    /// Tasks waiting on each task
    dependents: Vec<Vec<usize>>,
    /// Eligible tasks, lowest topological index first
    ready: BTreeSet<usize>,
    in_flight: usize,
    done: usize,
}

impl TaskQueue {
    /// `tasks` must be in topological order. Dependencies that are not tasks
    /// needed no work this run and count as done.
    pub fn new(tasks: Vec<Task>, graph: &DependencyGraph) -> Self {
        let index: HashMap<PathBuf, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, task)| (task.entry_point.path.clone(), i))
            .collect();

        let mut remaining = vec![0; tasks.len()];
        let mut dependents = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            for dep in graph.dependencies_of(task.path()) {
                if let Some(&dep_index) = index.get(dep) {
                    remaining[i] += 1;
                    dependents[dep_index].push(i);
                }
            }
        }

        let ready = remaining
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(i, _)| i)
            .collect();

        Self {
            tasks: tasks.into_iter().map(Some).collect(),
            index,
            remaining,
            dependents,
            ready,
            in_flight: 0,
            done: 0,
        }
    }

    /// Take the next eligible task, if any
    pub fn next_ready(&mut self) -> Option<Task> {
        let next = self.ready.pop_first()?;
        self.in_flight += 1;
        self.tasks[next].take()
    }

    /// Record that the task for `path` finished, releasing its dependents
    pub fn mark_done(&mut self, path: &Path) {
        let Some(&finished) = self.index.get(path) else {
            return;
        };
        self.in_flight = self.in_flight.saturating_sub(1);
        self.done += 1;
        for &dependent in &self.dependents[finished] {
            self.remaining[dependent] -= 1;
            if self.remaining[dependent] == 0 {
                self.ready.insert(dependent);
            }
        }
    }

    /// Tasks handed out and not yet done
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Whether every task finished
    pub fn is_finished(&self) -> bool {
        self.done == self.tasks.len()
    }

    /// Total task count
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
