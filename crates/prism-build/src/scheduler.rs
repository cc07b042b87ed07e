//! Task Scheduler
//!
//! Dispatches ready tasks to a bounded worker pool. The dispatcher runs on the
//! calling thread; workers report back over a channel, and every report frees
//! the dependents of the finished entry-point.

use crate::error::{BuildError, BuildResult};
use crate::task::{Task, TaskExecutor, TaskQueue, TaskReport};
use rayon::ThreadPoolBuilder;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

/// How tasks are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One task at a time on the calling thread
    Synchronous,
    /// A worker pool sized to the machine
    #[default]
    Parallel,
}

/// Runs a task queue to completion or first failure
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    mode: ExecutionMode,
    workers: usize,
}

impl TaskScheduler {
    /// Pool size is the available parallelism, capped by `max_workers`
    pub fn new(mode: ExecutionMode, max_workers: Option<usize>) -> Self {
        let available = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        let workers = match max_workers {
            Some(max) => available.min(max).max(1),
            None => available,
        };
        Self { mode, workers }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Worker count in use; 1 means in-thread execution
    pub fn workers(&self) -> usize {
        match self.mode {
            ExecutionMode::Synchronous => 1,
            ExecutionMode::Parallel => self.workers,
        }
    }

    /// Run every task in `queue`.
    ///
    /// The first failure stops dispatch. Tasks already running are awaited
    /// and their results dropped; the first error is returned.
    pub fn run(
        &self,
        queue: TaskQueue,
        executor: Arc<dyn TaskExecutor>,
    ) -> BuildResult<Vec<TaskReport>> {
        if self.workers() <= 1 {
            self.run_in_thread(queue, executor.as_ref())
        } else {
            self.run_pool(queue, executor)
        }
    }

    fn run_in_thread(
        &self,
        mut queue: TaskQueue,
        executor: &dyn TaskExecutor,
    ) -> BuildResult<Vec<TaskReport>> {
        let mut reports = Vec::with_capacity(queue.len());
        while let Some(task) = queue.next_ready() {
            let path = task.path().to_path_buf();
            let report = run_task(executor, task)?;
            queue.mark_done(&path);
            reports.push(report);
        }
        Ok(reports)
    }

    fn run_pool(
        &self,
        mut queue: TaskQueue,
        executor: Arc<dyn TaskExecutor>,
    ) -> BuildResult<Vec<TaskReport>> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("prism-worker-{}", i))
            .build()
            .map_err(|e| BuildError::WorkerPool(e.to_string()))?;

        let (tx, rx) = mpsc::channel::<(PathBuf, BuildResult<TaskReport>)>();
        let mut reports = Vec::with_capacity(queue.len());
        let mut failure = None;

        loop {
            if failure.is_none() {
                while queue.in_flight() < self.workers {
                    let Some(task) = queue.next_ready() else {
                        break;
                    };
                    let tx = tx.clone();
                    let executor = Arc::clone(&executor);
                    pool.spawn(move || {
                        let path = task.path().to_path_buf();
                        let result = run_task(executor.as_ref(), task);
                        // The dispatcher only hangs up after every task reported
                        let _ = tx.send((path, result));
                    });
                }
            }

            if queue.in_flight() == 0 {
                break;
            }

            let (path, result) = rx
                .recv()
                .map_err(|_| BuildError::WorkerPool("worker channel closed".to_string()))?;
            queue.mark_done(&path);
            match result {
                Ok(report) => reports.push(report),
                Err(error) => {
                    if failure.is_none() {
                        failure = Some(error);
                    }
                }
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(reports),
        }
    }
}

/// Execute `task`, turning a panic into an error
fn run_task(executor: &dyn TaskExecutor, task: Task) -> BuildResult<TaskReport> {
    let name = task.entry_point.name.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(task))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(BuildError::TaskPanicked {
                entry_point: name,
                message,
            })
        }
    }
}
