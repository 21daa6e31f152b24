use std::collections::BTreeMap;
use std::sync::Arc;

use crate::schedule::Task;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// The scheduler's view of all configured tasks.
///
/// A plain flat mapping: every entry is processed, nothing else is.
pub type TaskMap = BTreeMap<TaskName, Arc<dyn Task>>;
