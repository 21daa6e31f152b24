use std::path::{Path, PathBuf};

use anyhow::Result;
use futures::future::BoxFuture;

/// What the scheduler needs from a task.
///
/// - `find` lists the top-level candidate paths that currently exist.
/// - `move_files` relocates stable candidates and returns the directory the
///   task should run in.
/// - `run` processes that directory.
pub trait Task: Send + Sync {
    /// The task's working directory.
    fn pwd(&self) -> &Path;

    fn find(&self) -> BoxFuture<'_, Result<Vec<PathBuf>>>;

    fn move_files(&self, paths: Vec<PathBuf>) -> BoxFuture<'_, Result<PathBuf>>;

    fn run(&self, working_dir: PathBuf) -> BoxFuture<'_, Result<()>>;
}
