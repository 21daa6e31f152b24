// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled include/exclude file-name globs for a single task.
///
/// Patterns are matched against the entry's file name only (e.g.
/// `"report.csv"`), since tasks only look at the direct children of their
/// watch directory.
#[derive(Clone)]
pub struct EntryFilter {
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for EntryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryFilter")
            .field("include", &self.include_set.as_ref().map(GlobSet::len))
            .field("exclude", &self.exclude_set.as_ref().map(GlobSet::len))
            .finish()
    }
}

impl Default for EntryFilter {
    /// Accepts every non-hidden entry.
    fn default() -> Self {
        Self {
            include_set: None,
            exclude_set: None,
        }
    }
}

impl EntryFilter {
    /// Compile a filter. An empty `include` list means "everything".
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = if include.is_empty() {
            None
        } else {
            Some(build_globset(include).context("building include globset")?)
        };

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };

        Ok(Self {
            include_set,
            exclude_set,
        })
    }

    /// Returns true if an entry with this file name should be picked up.
    ///
    /// Hidden entries (leading `.`) never match.
    pub fn matches(&self, file_name: &str) -> bool {
        if file_name.starts_with('.') {
            return false;
        }
        if let Some(include) = &self.include_set {
            if !include.is_match(file_name) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(file_name) {
                return false;
            }
        }
        true
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
