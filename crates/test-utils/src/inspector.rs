use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use dropwatch::fs::mock::MockFileSystem;
use dropwatch::inspect::{FsInspector, Inspector};
use futures::future::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectorCall {
    Sizes(PathBuf),
    Checksum(PathBuf),
}

/// Inspector over a [`MockFileSystem`] that records every call.
#[derive(Debug)]
pub struct MockInspector {
    inner: FsInspector,
    calls: Mutex<Vec<InspectorCall>>,
}

impl MockInspector {
    pub fn new(fs: &MockFileSystem) -> Self {
        Self {
            inner: FsInspector::new(Arc::new(fs.clone())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<InspectorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn size_polls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, InspectorCall::Sizes(_)))
            .count()
    }

    pub fn checksum_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, InspectorCall::Checksum(_)))
            .count()
    }

    fn record(&self, call: InspectorCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Inspector for MockInspector {
    fn sizes_under<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<BTreeMap<PathBuf, u64>>> {
        self.record(InspectorCall::Sizes(path.to_path_buf()));
        self.inner.sizes_under(path)
    }

    fn checksum<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>> {
        self.record(InspectorCall::Checksum(path.to_path_buf()));
        self.inner.checksum(path)
    }
}
