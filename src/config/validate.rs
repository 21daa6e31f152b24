// src/config/validate.rs

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
use crate::errors::{DropwatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DropwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_commands(cfg)?;
    validate_layout(&cfg.task, Path::new(""))?;
    validate_patterns(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(DropwatchError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    let section = &cfg.config;

    if section.tick_ms == 0 {
        return Err(DropwatchError::ConfigError(
            "[config].tick_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if section.dwell_ticks == 0 {
        return Err(DropwatchError::ConfigError(
            "[config].dwell_ticks must be >= 1 (got 0)".to_string(),
        ));
    }

    if section.poll_ticks == 0 {
        return Err(DropwatchError::ConfigError(
            "[config].poll_ticks must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(DropwatchError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
    }
    Ok(())
}

/// Check that watch and run directories, resolved against `root`, do not
/// overlap.
///
/// - a task's `watch` and `run` are distinct and neither contains the other
/// - no two tasks watch the same or nested directories
/// - no task's `run` lies in or around another task's `watch`
///
/// Loading checks this with an empty root, which leaves relative paths
/// relative; call it again with the real root to compare relative against
/// absolute directories.
pub fn validate_layout(tasks: &BTreeMap<String, TaskConfig>, root: &Path) -> Result<()> {
    let dirs: Vec<(&str, PathBuf, PathBuf)> = tasks
        .iter()
        .map(|(name, task)| {
            (
                name.as_str(),
                normalize(&task.watch_dir(root)),
                normalize(&task.run_dir(root)),
            )
        })
        .collect();

    for (name, watch, run) in &dirs {
        if watch == run {
            return Err(DropwatchError::ConfigError(format!(
                "task '{}' uses {:?} as both `watch` and `run` directory",
                name, watch
            )));
        }
        if run.starts_with(watch) {
            return Err(DropwatchError::ConfigError(format!(
                "task '{}' has its `run` directory inside its `watch` directory",
                name
            )));
        }
        if watch.starts_with(run) {
            return Err(DropwatchError::ConfigError(format!(
                "task '{}' has its `watch` directory inside its `run` directory",
                name
            )));
        }
    }

    for (i, (name, watch, _)) in dirs.iter().enumerate() {
        for (other, other_watch, _) in dirs.iter().skip(i + 1) {
            if overlaps(watch, other_watch) {
                return Err(DropwatchError::ConfigError(format!(
                    "tasks '{}' and '{}' watch overlapping directories",
                    name, other
                )));
            }
        }
        for (j, (other, _, other_run)) in dirs.iter().enumerate() {
            if i != j && overlaps(watch, other_run) {
                return Err(DropwatchError::ConfigError(format!(
                    "task '{}' runs in {:?}, which overlaps the `watch` directory of task '{}'",
                    other, other_run, name
                )));
            }
        }
    }

    Ok(())
}

fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Lexically drop `.` and fold `..` so spellings of one directory compare
/// equal.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for pattern in task.include.iter().chain(task.exclude.iter()) {
            Glob::new(pattern).map_err(|e| {
                DropwatchError::ConfigError(format!(
                    "task '{}' has invalid glob '{}': {}",
                    name, pattern, e
                ))
            })?;
        }
    }
    Ok(())
}
