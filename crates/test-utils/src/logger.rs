use std::sync::Mutex;

use dropwatch::process::{LogEvent, ProcessLogger};

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `(address, marker)` pairs, addresses rendered like `"root"` or `"1.0"`.
    pub fn markers(&self) -> Vec<(String, &'static str)> {
        self.events()
            .iter()
            .map(|e| (e.address.to_string(), e.marker()))
            .collect()
    }

    /// The events in wire form.
    pub fn json_lines(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e.to_json_line().unwrap())
            .collect()
    }
}

impl ProcessLogger for RecordingLogger {
    fn log(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}
