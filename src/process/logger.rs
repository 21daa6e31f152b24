// src/process/logger.rs

//! Structured process log events and the sinks that consume them.
//!
//! Every event is attached to a node [`Address`]. On the wire an event is a
//! single JSON array, one per line: address, marker, then payload.
//!
//! ```text
//! ["","begin"]
//! [[0],"info","copied 3 files"]
//! [[1,0],"failed","bad input"]
//! [[0],"done"]
//! ```

use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use tracing::{debug, error, info, warn};

use crate::process::address::Address;
use crate::process::failure::StepFailure;

/// Severity of a free-form message logged by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl MessageLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageLevel::Debug => "debug",
            MessageLevel::Info => "info",
            MessageLevel::Warn => "warn",
            MessageLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// The node started.
    Begin,
    /// The node finished its own work and everything beneath it.
    Done,
    /// One of the node's own steps failed.
    Failed(String),
    /// Application message logged by one of the node's steps.
    Message { level: MessageLevel, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub address: Address,
    pub entry: LogEntry,
}

impl LogEvent {
    pub fn begin(address: Address) -> Self {
        Self {
            address,
            entry: LogEntry::Begin,
        }
    }

    pub fn done(address: Address) -> Self {
        Self {
            address,
            entry: LogEntry::Done,
        }
    }

    pub fn failed(address: Address, failure: &StepFailure) -> Self {
        Self {
            address,
            entry: LogEntry::Failed(failure.message().to_string()),
        }
    }

    pub fn message(address: Address, level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            address,
            entry: LogEntry::Message {
                level,
                text: text.into(),
            },
        }
    }

    /// Second element of the wire tuple.
    pub fn marker(&self) -> &'static str {
        match &self.entry {
            LogEntry::Begin => "begin",
            LogEntry::Done => "done",
            LogEntry::Failed(_) => "failed",
            LogEntry::Message { level, .. } => level.as_str(),
        }
    }

    pub fn is_begin(&self) -> bool {
        matches!(self.entry, LogEntry::Begin)
    }

    pub fn is_done(&self) -> bool {
        matches!(self.entry, LogEntry::Done)
    }

    /// The root's `done`: the run completed and nothing else will follow.
    pub fn is_terminal(&self) -> bool {
        self.is_done() && self.address.is_root()
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for LogEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload = match &self.entry {
            LogEntry::Begin | LogEntry::Done => None,
            LogEntry::Failed(text) | LogEntry::Message { text, .. } => Some(text),
        };

        let len = if payload.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.address)?;
        seq.serialize_element(self.marker())?;
        if let Some(text) = payload {
            seq.serialize_element(text)?;
        }
        seq.end()
    }
}

/// Sink for process log events.
///
/// Logging never fails from the caller's point of view; sinks deal with
/// their own I/O errors.
pub trait ProcessLogger: Send + Sync {
    fn log(&self, event: LogEvent);
}

/// Forwards events to `tracing`, tagged with a scope (usually a task name).
#[derive(Debug, Clone)]
pub struct TracingLogger {
    scope: String,
}

impl TracingLogger {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }
}

impl ProcessLogger for TracingLogger {
    fn log(&self, event: LogEvent) {
        let scope = &self.scope;
        let address = &event.address;
        match &event.entry {
            LogEntry::Begin => debug!(scope = %scope, %address, "begin"),
            LogEntry::Done => debug!(scope = %scope, %address, "done"),
            LogEntry::Failed(text) => warn!(scope = %scope, %address, "step failed: {}", text),
            LogEntry::Message { level, text } => match level {
                MessageLevel::Debug => debug!(scope = %scope, %address, "{}", text),
                MessageLevel::Info => info!(scope = %scope, %address, "{}", text),
                MessageLevel::Warn => warn!(scope = %scope, %address, "{}", text),
                MessageLevel::Error => error!(scope = %scope, %address, "{}", text),
            },
        }
    }
}

/// Appends one JSON event per line to a writer.
#[derive(Debug)]
pub struct JsonLinesLogger<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JsonLinesLogger<LineWriter<File>> {
    /// Open (or create) `path` for appending; every line is flushed as soon
    /// as it is complete so a tailer sees events promptly.
    pub fn append_to(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening process log {:?}", path))?;
        Ok(Self::new(LineWriter::new(file)))
    }
}

impl<W: Write + Send> ProcessLogger for JsonLinesLogger<W> {
    fn log(&self, event: LogEvent) {
        let line = match event.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to encode process log event");
                return;
            }
        };

        let mut writer = match self.writer.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(writer, "{line}") {
            warn!(error = %e, "failed to write process log event");
        }
    }
}

/// Sends every event to each of its sinks, in order.
#[derive(Clone, Default)]
pub struct FanoutLogger {
    sinks: Vec<Arc<dyn ProcessLogger>>,
}

impl FanoutLogger {
    pub fn new(sinks: Vec<Arc<dyn ProcessLogger>>) -> Self {
        Self { sinks }
    }
}

impl ProcessLogger for FanoutLogger {
    fn log(&self, event: LogEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.log(event.clone());
            }
            last.log(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tuples_put_address_then_marker_then_payload() {
        let root = Address::root();
        let child = Address::from(vec![1, 0]);

        assert_eq!(LogEvent::begin(root.clone()).to_json_line().unwrap(), r#"["","begin"]"#);
        assert_eq!(LogEvent::done(child.clone()).to_json_line().unwrap(), r#"[[1,0],"done"]"#);
        assert_eq!(
            LogEvent::message(child.clone(), MessageLevel::Info, "run before")
                .to_json_line()
                .unwrap(),
            r#"[[1,0],"info","run before"]"#
        );
        assert_eq!(
            LogEvent::failed(root, &StepFailure::new("boom"))
                .to_json_line()
                .unwrap(),
            r#"["","failed","boom"]"#
        );
    }

    #[test]
    fn json_lines_logger_writes_one_event_per_line() {
        let logger = JsonLinesLogger::new(Vec::new());
        logger.log(LogEvent::begin(Address::root()));
        logger.log(LogEvent::done(Address::root()));

        let text = String::from_utf8(logger.into_inner()).unwrap();
        assert_eq!(text, "[\"\",\"begin\"]\n[\"\",\"done\"]\n");
    }

    #[test]
    fn only_root_done_is_terminal() {
        assert!(LogEvent::done(Address::root()).is_terminal());
        assert!(!LogEvent::done(Address::root().child(0)).is_terminal());
        assert!(!LogEvent::begin(Address::root()).is_terminal());
    }

    #[test]
    fn append_to_file_keeps_previous_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("process.log");

        JsonLinesLogger::append_to(&path)
            .unwrap()
            .log(LogEvent::begin(Address::root()));
        JsonLinesLogger::append_to(&path)
            .unwrap()
            .log(LogEvent::done(Address::root()));

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
