// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::stability::StabilityConfig;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// tick_ms = 1000
/// dwell_ticks = 30
///
/// [task.ingest]
/// watch = "inbox"
/// run = "runs"
/// cmd = "./process.sh"
/// include = ["*.csv"]
/// ```
///
/// This is the unvalidated form; see [`ConfigFile`] for the validated one.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global timing config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A configuration that passed validation.
///
/// Only constructible through `TryFrom<RawConfigFile>` (or
/// [`ConfigFile::new_unchecked`] from inside the crate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self { config, task }
    }
}

/// `[config]` section.
///
/// All durations are measured in logical ticks; `tick_ms` says how long one
/// tick lasts in wall-clock time.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Milliseconds per tick.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Ticks to wait between checksum confirmation rounds.
    #[serde(default = "default_dwell_ticks")]
    pub dwell_ticks: u64,

    /// How many extra checksum rounds must agree before a file set counts as
    /// stable.
    #[serde(default = "default_confirmations")]
    pub confirmations: u32,

    /// Ticks to sleep between idle passes in daemon mode.
    #[serde(default = "default_poll_ticks")]
    pub poll_ticks: u64,
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_dwell_ticks() -> u64 {
    30
}

fn default_confirmations() -> u32 {
    1
}

fn default_poll_ticks() -> u64 {
    5
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            dwell_ticks: default_dwell_ticks(),
            confirmations: default_confirmations(),
            poll_ticks: default_poll_ticks(),
        }
    }
}

impl ConfigSection {
    pub fn stability(&self) -> StabilityConfig {
        StabilityConfig {
            dwell_ticks: self.dwell_ticks,
            confirmations: self.confirmations,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Directory to watch for arriving files.
    pub watch: PathBuf,

    /// Directory under which each run gets its own working directory.
    pub run: PathBuf,

    /// Shell command executed inside the working directory.
    pub cmd: String,

    /// File-name globs an entry must match to be picked up.
    ///
    /// Empty means every (non-hidden) entry.
    #[serde(default)]
    pub include: Vec<String>,

    /// File-name globs that exclude an entry even if it matches `include`.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl TaskConfig {
    /// Effective watch directory, resolved against `root` when relative.
    pub fn watch_dir(&self, root: &Path) -> PathBuf {
        resolve(root, &self.watch)
    }

    /// Effective run directory, resolved against `root` when relative.
    pub fn run_dir(&self, root: &Path) -> PathBuf {
        resolve(root, &self.run)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
