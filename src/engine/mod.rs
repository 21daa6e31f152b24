// src/engine/mod.rs

//! Daemon loop for dropwatch.
//!
//! The engine repeatedly drains every task with
//! [`Scheduler::run_until_idle`](crate::schedule::Scheduler::run_until_idle)
//! and then sleeps until one of:
//! - `poll_ticks` ticks have passed
//! - the file watcher reports a change
//! - shutdown is requested (e.g. Ctrl-C)

/// Events flowing into the engine from the watcher and signal handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Something changed under a watch directory.
    FilesChanged,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Engine options.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// If true, run a single `run_until_idle` and exit (used for `--once`).
    pub exit_when_idle: bool,
    /// Ticks to wait between idle rounds.
    pub poll_ticks: u64,
}

pub mod runtime;

pub use runtime::{Engine, EngineStats};
