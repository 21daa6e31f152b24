// src/schedule/scheduler.rs

//! One discovery-and-process pass over a set of tasks.
//!
//! For every task, concurrently and independently:
//! 1. `find()` once; an empty result ends the task's pass.
//! 2. Wait for the candidates to stabilize.
//! 3. `move_files()` the fresh listing, then `run()` the returned directory.
//!
//! A failing task never affects the others; its failure is recorded in the
//! [`PassReport`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::schedule::task::Task;
use crate::stability::StabilityDetector;
use crate::types::{TaskMap, TaskName};

/// Where in a task's pass a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStage {
    Find,
    Stabilize,
    Move,
    Run,
}

impl fmt::Display for PassStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PassStage::Find => "find",
            PassStage::Stabilize => "stabilize",
            PassStage::Move => "move",
            PassStage::Run => "run",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct TaskFailure {
    pub task: TaskName,
    pub stage: PassStage,
    pub error: anyhow::Error,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task '{}' failed during {}: {:#}", self.task, self.stage, self.error)
    }
}

/// Result of a single task's pass.
#[derive(Debug)]
enum TaskPass {
    /// Nothing to do.
    Idle,
    /// Files were moved into `working_dir` and the task ran successfully.
    Ran { working_dir: PathBuf },
    Failed(TaskFailure),
}

/// What happened during one or more passes.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Number of passes folded into this report.
    pub passes: usize,
    /// Tasks that moved files and ran successfully, with their working
    /// directories, in completion order per pass.
    pub ran: Vec<(TaskName, PathBuf)>,
    pub failures: Vec<TaskFailure>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether any task took files out of its watch location, whether or not
    /// its run then succeeded.
    pub fn moved_files(&self) -> bool {
        !self.ran.is_empty() || self.failures.iter().any(|f| f.stage == PassStage::Run)
    }

    fn absorb(&mut self, other: PassReport) {
        self.passes += other.passes;
        self.ran.extend(other.ran);
        self.failures.extend(other.failures);
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    detector: StabilityDetector,
}

impl Scheduler {
    pub fn new(detector: StabilityDetector) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &StabilityDetector {
        &self.detector
    }

    /// Run one pass over every task in `tasks`.
    pub async fn run_pass(&self, tasks: &TaskMap) -> PassReport {
        let passes = tasks.iter().map(|(name, task)| {
            let span = info_span!("task", name = %name);
            self.process_task(name, Arc::clone(task)).instrument(span)
        });
        let outcomes = join_all(passes).await;

        let mut report = PassReport {
            passes: 1,
            ..PassReport::default()
        };
        for (name, outcome) in tasks.keys().zip(outcomes) {
            match outcome {
                TaskPass::Idle => {}
                TaskPass::Ran { working_dir } => report.ran.push((name.clone(), working_dir)),
                TaskPass::Failed(failure) => {
                    warn!("{failure}");
                    report.failures.push(failure);
                }
            }
        }
        report
    }

    /// Repeat passes until one of them moves no files.
    ///
    /// Files that show up while another task is stabilizing are picked up by
    /// the following pass.
    pub async fn run_until_idle(&self, tasks: &TaskMap) -> PassReport {
        let mut total = PassReport::default();
        loop {
            let report = self.run_pass(tasks).await;
            let moved = report.moved_files();
            total.absorb(report);
            if !moved {
                debug!(passes = total.passes, "no task moved files; idle");
                return total;
            }
        }
    }

    async fn process_task(&self, name: &str, task: Arc<dyn Task>) -> TaskPass {
        let fail = |stage, error| {
            TaskPass::Failed(TaskFailure {
                task: name.to_string(),
                stage,
                error,
            })
        };

        let candidates = match task.find().await {
            Ok(paths) => paths,
            Err(e) => return fail(PassStage::Find, e),
        };

        if candidates.is_empty() {
            debug!("no candidates");
            return TaskPass::Idle;
        }

        debug!(candidates = candidates.len(), "waiting for candidates to stabilize");
        let stable = match self.detector.stabilize(|| task.find()).await {
            Ok(paths) => paths,
            Err(e) => return fail(PassStage::Stabilize, e),
        };

        if stable.is_empty() {
            debug!("candidates disappeared while stabilizing");
            return TaskPass::Idle;
        }

        info!(files = stable.len(), "moving stable files");
        let working_dir = match task.move_files(stable).await {
            Ok(dir) => dir,
            Err(e) => return fail(PassStage::Move, e),
        };

        info!(working_dir = ?working_dir, "running task");
        if let Err(e) = task.run(working_dir.clone()).await {
            return fail(PassStage::Run, e);
        }

        info!(working_dir = ?working_dir, "task finished");
        TaskPass::Ran { working_dir }
    }
}
