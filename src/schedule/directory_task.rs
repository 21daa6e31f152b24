// src/schedule/directory_task.rs

//! A task backed by a watch directory and a run directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::fs::FileSystem;
use crate::schedule::task::Task;
use crate::types::TaskName;
use crate::watch::EntryFilter;

/// Length of the per-run directory identifier.
pub const RUN_ID_LEN: usize = 6;

/// Processes a working directory once files have been moved into it.
pub trait Runner: Send + Sync {
    fn run<'a>(&'a self, task: &'a str, working_dir: &'a Path) -> BoxFuture<'a, Result<()>>;
}

/// Fresh identifier for a run directory: six lowercase hex characters.
pub fn run_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(RUN_ID_LEN);
    id
}

pub struct DirectoryTask {
    name: TaskName,
    watch_dir: PathBuf,
    run_dir: PathBuf,
    filter: EntryFilter,
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn Runner>,
}

impl fmt::Debug for DirectoryTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryTask")
            .field("name", &self.name)
            .field("watch_dir", &self.watch_dir)
            .field("run_dir", &self.run_dir)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl DirectoryTask {
    pub fn new(
        name: impl Into<TaskName>,
        watch_dir: impl Into<PathBuf>,
        run_dir: impl Into<PathBuf>,
        filter: EntryFilter,
        fs: Arc<dyn FileSystem>,
        runner: Arc<dyn Runner>,
    ) -> Self {
        Self {
            name: name.into(),
            watch_dir: watch_dir.into(),
            run_dir: run_dir.into(),
            filter,
            fs,
            runner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    fn list_candidates(&self) -> Result<Vec<PathBuf>> {
        if !self.fs.is_dir(&self.watch_dir) {
            debug!(task = %self.name, dir = ?self.watch_dir, "watch directory missing");
            return Ok(Vec::new());
        }

        let entries = self
            .fs
            .read_dir(&self.watch_dir)
            .with_context(|| format!("listing watch directory of task '{}'", self.name))?;

        Ok(entries
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| self.filter.matches(n))
            })
            .collect())
    }

    fn fresh_working_dir(&self) -> PathBuf {
        loop {
            let candidate = self.run_dir.join(run_id());
            if !self.fs.exists(&candidate) {
                return candidate;
            }
        }
    }

    fn relocate(&self, paths: &[PathBuf]) -> Result<PathBuf> {
        let working_dir = self.fresh_working_dir();
        self.fs.create_dir_all(&working_dir)?;

        let mut moved: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(paths.len());
        for path in paths {
            match self.move_one(path, &working_dir) {
                Ok(target) => moved.push((path.clone(), target)),
                Err(err) => {
                    self.roll_back(&moved, &working_dir);
                    return Err(err.context(format!(
                        "moving into {:?} (already moved files were put back)",
                        working_dir
                    )));
                }
            }
        }

        info!(
            task = %self.name,
            files = paths.len(),
            working_dir = ?working_dir,
            "moved files into working directory"
        );
        Ok(working_dir)
    }

    fn move_one(&self, path: &Path, working_dir: &Path) -> Result<PathBuf> {
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("cannot move path without a file name: {:?}", path))?;
        let target = working_dir.join(file_name);
        self.fs.rename(path, &target)?;
        Ok(target)
    }

    /// Undo a partial move so the files are found again on the next pass.
    fn roll_back(&self, moved: &[(PathBuf, PathBuf)], working_dir: &Path) {
        for (origin, target) in moved.iter().rev() {
            if let Err(e) = self.fs.rename(target, origin) {
                warn!(task = %self.name, file = ?target, error = %e, "could not restore file");
            }
        }
        if let Err(e) = self.fs.remove_dir(working_dir) {
            warn!(task = %self.name, working_dir = ?working_dir, error = %e, "could not remove working directory");
        }
    }
}

impl Task for DirectoryTask {
    /// Parent of every per-run working directory.
    fn pwd(&self) -> &Path {
        &self.run_dir
    }

    fn find(&self) -> BoxFuture<'_, Result<Vec<PathBuf>>> {
        Box::pin(async move { self.list_candidates() })
    }

    fn move_files(&self, paths: Vec<PathBuf>) -> BoxFuture<'_, Result<PathBuf>> {
        Box::pin(async move {
            self.relocate(&paths)
                .with_context(|| format!("moving files for task '{}'", self.name))
        })
    }

    fn run(&self, working_dir: PathBuf) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.runner.run(&self.name, &working_dir).await })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<(String, PathBuf)>>,
    }

    impl Runner for RecordingRunner {
        fn run<'a>(&'a self, task: &'a str, working_dir: &'a Path) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((task.to_string(), working_dir.to_path_buf()));
                Ok(())
            })
        }
    }

    fn task(fs: &MockFileSystem, filter: EntryFilter) -> (DirectoryTask, Arc<RecordingRunner>) {
        let runner = Arc::new(RecordingRunner::default());
        let task = DirectoryTask::new(
            "ingest",
            "inbox",
            "runs",
            filter,
            Arc::new(fs.clone()),
            runner.clone(),
        );
        (task, runner)
    }

    #[test]
    fn run_id_is_six_hex_chars() {
        let id = run_id();
        assert_eq!(id.len(), RUN_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn missing_watch_dir_yields_nothing() {
        let fs = MockFileSystem::new();
        let (task, _) = task(&fs, EntryFilter::default());

        assert!(task.find().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_lists_matching_direct_entries() {
        let fs = MockFileSystem::new();
        fs.add_file("inbox/a.csv", "1");
        fs.add_file("inbox/b.txt", "2");
        fs.add_file("inbox/.hidden.csv", "3");
        fs.add_file("inbox/batch/c.csv", "4");

        let filter = EntryFilter::new(&["*.csv".to_string(), "batch".to_string()], &[]).unwrap();
        let (task, _) = task(&fs, filter);

        let found = task.find().await.unwrap();
        assert_eq!(
            found,
            vec![PathBuf::from("inbox/a.csv"), PathBuf::from("inbox/batch")]
        );
    }

    #[tokio::test]
    async fn move_then_run_uses_fresh_working_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("inbox/a.txt", "hello");
        fs.add_file("inbox/batch/b.txt", "world");
        let (task, runner) = task(&fs, EntryFilter::default());

        let found = task.find().await.unwrap();
        let wd = task.move_files(found).await.unwrap();

        assert_eq!(wd.parent(), Some(Path::new("runs")));
        assert!(fs.is_file(&wd.join("a.txt")));
        assert!(fs.is_file(&wd.join("batch/b.txt")));
        assert!(task.find().await.unwrap().is_empty());

        task.run(wd.clone()).await.unwrap();
        let calls = runner.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("ingest".to_string(), wd)]);
    }

    #[tokio::test]
    async fn partial_move_is_rolled_back() {
        let fs = MockFileSystem::new();
        fs.add_file("inbox/a.txt", "hello");
        let (task, _) = task(&fs, EntryFilter::default());

        let err = task
            .move_files(vec![PathBuf::from("inbox/a.txt"), PathBuf::from("inbox/gone.txt")])
            .await
            .unwrap_err();

        let rendered = format!("{err:#}");
        assert!(rendered.contains("moving into"), "{rendered}");
        assert!(rendered.contains("gone.txt"), "{rendered}");
        assert_eq!(fs.files(), vec![PathBuf::from("inbox/a.txt")]);
        assert!(!fs.exists(Path::new("runs")));
        assert_eq!(task.find().await.unwrap(), vec![PathBuf::from("inbox/a.txt")]);
    }
}
