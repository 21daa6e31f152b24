use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use dropwatch::fs::mock::MockFileSystem;
use dropwatch::fs::FileSystem;
use dropwatch::schedule::Task;
use futures::future::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpyCall {
    Find,
    Move(Vec<PathBuf>),
    Run(PathBuf),
}

type Finder = Box<dyn Fn(&MockFileSystem) -> Vec<PathBuf> + Send + Sync>;

/// A task over a [`MockFileSystem`] that records what the scheduler asks
/// of it.
///
/// - `find` lists the direct entries of the source directory (the mock root
///   by default, so `"a.txt"` comes back as `"a.txt"`), or asks a custom
///   finder. Once files were moved it finds nothing.
/// - `move_files` deletes the paths from the mock filesystem and resolves
///   with the spy's `pwd`.
/// - `run` only records, unless told to fail.
pub struct TaskSpy {
    fs: MockFileSystem,
    source: PathBuf,
    finder: Option<Finder>,
    moved: AtomicBool,
    pwd: PathBuf,
    fail_find: Option<String>,
    fail_run: Option<String>,
    calls: Mutex<Vec<SpyCall>>,
}

impl std::fmt::Debug for TaskSpy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSpy")
            .field("source", &self.source)
            .field("pwd", &self.pwd)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

impl TaskSpy {
    pub fn new(fs: &MockFileSystem) -> Self {
        Self {
            fs: fs.clone(),
            source: PathBuf::new(),
            finder: None,
            moved: AtomicBool::new(false),
            pwd: PathBuf::from("work"),
            fail_find: None,
            fail_run: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn watching(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    /// Replace directory listing with `finder`.
    pub fn finding(
        mut self,
        finder: impl Fn(&MockFileSystem) -> Vec<PathBuf> + Send + Sync + 'static,
    ) -> Self {
        self.finder = Some(Box::new(finder));
        self
    }

    pub fn with_pwd(mut self, pwd: impl Into<PathBuf>) -> Self {
        self.pwd = pwd.into();
        self
    }

    pub fn failing_find(mut self, message: &str) -> Self {
        self.fail_find = Some(message.to_string());
        self
    }

    pub fn failing_run(mut self, message: &str) -> Self {
        self.fail_run = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<SpyCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn find_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SpyCall::Find))
            .count()
    }

    /// Only the move and run calls, in order.
    pub fn actions(&self) -> Vec<SpyCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, SpyCall::Find))
            .collect()
    }

    fn record(&self, call: SpyCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Task for TaskSpy {
    fn pwd(&self) -> &Path {
        &self.pwd
    }

    fn find(&self) -> BoxFuture<'_, Result<Vec<PathBuf>>> {
        Box::pin(async move {
            self.record(SpyCall::Find);
            if let Some(message) = &self.fail_find {
                return Err(anyhow!("{message}"));
            }
            if self.moved.load(Ordering::SeqCst) {
                return Ok(Vec::new());
            }
            if let Some(finder) = &self.finder {
                return Ok(finder(&self.fs));
            }
            if !self.fs.is_dir(&self.source) {
                return Ok(Vec::new());
            }
            self.fs.read_dir(&self.source)
        })
    }

    fn move_files(&self, paths: Vec<PathBuf>) -> BoxFuture<'_, Result<PathBuf>> {
        Box::pin(async move {
            for path in &paths {
                self.fs.remove(path);
            }
            self.moved.store(true, Ordering::SeqCst);
            self.record(SpyCall::Move(paths));
            Ok(self.pwd.clone())
        })
    }

    fn run(&self, working_dir: PathBuf) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record(SpyCall::Run(working_dir));
            match &self.fail_run {
                Some(message) => Err(anyhow!("{message}")),
                None => Ok(()),
            }
        })
    }
}
