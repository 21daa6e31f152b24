// src/watch/mod.rs

//! Watch-directory plumbing.
//!
//! - [`patterns`] compiles per-task include/exclude file-name globs.
//! - [`watcher`] wires up a cross-platform filesystem watcher (`notify`)
//!   that wakes the engine early.
//!
//! Deciding when files are stable is not done here; see
//! [`crate::stability`].

pub mod patterns;
pub mod watcher;

pub use patterns::EntryFilter;
pub use watcher::{spawn_watcher, WatcherHandle};
