// src/schedule/mod.rs

//! Tasks and the pass scheduler.
//!
//! - [`task`] defines the [`Task`] capability the scheduler drives.
//! - [`scheduler`] runs discovery, stabilization, move and run per task.
//! - [`directory_task`] and [`runner`] are the production task and runner.

pub mod directory_task;
pub mod runner;
pub mod scheduler;
pub mod task;

pub use directory_task::{run_id, DirectoryTask, Runner};
pub use runner::{CommandRunner, PROCESS_LOG};
pub use scheduler::{PassReport, PassStage, Scheduler, TaskFailure};
pub use task::Task;
