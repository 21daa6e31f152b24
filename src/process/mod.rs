// src/process/mod.rs

//! Hierarchical task executor.
//!
//! A process tree is built synchronously from nested callbacks
//! ([`builder`]), then run once ([`tree`]). Every node logs `begin`/`done`
//! events against its [`Address`] through a [`ProcessLogger`], and failures
//! come back as an [`ErrorNode`] tree pruned to the failing branches instead
//! of stopping at the first one.

pub mod address;
pub mod builder;
pub mod failure;
pub mod logger;
pub mod node;
pub mod tree;

pub use address::Address;
pub use builder::NodeBuilder;
pub use failure::{ErrorNode, StepFailure};
pub use logger::{
    FanoutLogger, JsonLinesLogger, LogEntry, LogEvent, MessageLevel, ProcessLogger,
    TracingLogger,
};
pub use node::{NodeContext, ProcessNode};
pub use tree::{execute, ProcessTree, TreeOutline};
