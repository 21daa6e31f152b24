#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use dropwatch::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
use dropwatch::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn tick_ms(mut self, ms: u64) -> Self {
        self.config.config.tick_ms = ms;
        self
    }

    pub fn dwell_ticks(mut self, ticks: u64) -> Self {
        self.config.config.dwell_ticks = ticks;
        self
    }

    pub fn confirmations(mut self, count: u32) -> Self {
        self.config.config.confirmations = count;
        self
    }

    pub fn poll_ticks(mut self, ticks: u64) -> Self {
        self.config.config.poll_ticks = ticks;
        self
    }

    /// The unvalidated config, for exercising validation errors.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(watch: impl Into<PathBuf>, run: impl Into<PathBuf>, cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                watch: watch.into(),
                run: run.into(),
                cmd: cmd.to_string(),
                include: vec![],
                exclude: vec![],
            },
        }
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.task.include.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task.exclude.push(pattern.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
