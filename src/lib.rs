// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod inspect;
pub mod logging;
pub mod process;
pub mod schedule;
pub mod stability;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::clock::{Tick, TokioTicker};
use crate::config::loader::load_and_validate;
use crate::config::validate_layout;
use crate::config::model::ConfigFile;
use crate::engine::{Engine, EngineEvent, EngineOptions};
use crate::errors::DropwatchError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::inspect::FsInspector;
use crate::schedule::{CommandRunner, DirectoryTask, Scheduler, Task};
use crate::stability::StabilityDetector;
use crate::types::TaskMap;
use crate::watch::EntryFilter;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one directory task per `[task.<name>]`
/// - stability detector / scheduler / engine
/// - (optional) file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)?;
    let root_dir = config_root_dir(&config_path);
    validate_layout(&cfg.task, &root_dir)?;

    let selected = select_tasks(&cfg, &args.tasks)?;

    if args.dry_run {
        print_dry_run(&cfg, &root_dir, &selected);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let tasks = build_tasks(&cfg, &root_dir, &selected, Arc::clone(&fs))?;

    // Watch directories must exist before notify can watch them.
    let watch_dirs: Vec<PathBuf> = selected
        .iter()
        .map(|name| cfg.task[name].watch_dir(&root_dir))
        .collect();
    for dir in &watch_dirs {
        fs.create_dir_all(dir)?;
    }

    let ticker: Arc<dyn Tick> = Arc::new(TokioTicker::from_millis(cfg.config.tick_ms));
    let detector = StabilityDetector::new(
        Arc::new(FsInspector::new(Arc::clone(&fs))),
        Arc::clone(&ticker),
        cfg.config.stability(),
    );
    let scheduler = Scheduler::new(detector);

    // Engine event channel.
    let (engine_tx, engine_rx) = mpsc::channel::<EngineEvent>(16);

    // Optional file watcher (disabled in --once mode).
    let _watcher_handle = if !args.once {
        Some(crate::watch::spawn_watcher(&watch_dirs, engine_tx.clone())?)
    } else {
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = engine_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(EngineEvent::ShutdownRequested).await;
        });
    }

    let options = EngineOptions {
        exit_when_idle: args.once,
        poll_ticks: cfg.config.poll_ticks,
    };

    info!(tasks = ?selected, once = args.once, "starting dropwatch");
    let engine = Engine::new(scheduler, ticker, engine_rx, options);
    engine.run(&tasks).await?;
    Ok(())
}

/// Build the production task map for `names`.
pub fn build_tasks(
    cfg: &ConfigFile,
    root_dir: &Path,
    names: &[String],
    fs: Arc<dyn FileSystem>,
) -> Result<TaskMap> {
    let mut tasks = TaskMap::new();

    for name in names {
        let task_cfg = cfg
            .task
            .get(name)
            .ok_or_else(|| DropwatchError::TaskNotFound(name.clone()))?;
        let filter = EntryFilter::new(&task_cfg.include, &task_cfg.exclude)
            .with_context(|| format!("compiling patterns for task '{name}'"))?;

        let task: Arc<dyn Task> = Arc::new(DirectoryTask::new(
            name.clone(),
            task_cfg.watch_dir(root_dir),
            task_cfg.run_dir(root_dir),
            filter,
            Arc::clone(&fs),
            Arc::new(CommandRunner::new(task_cfg.cmd.clone())),
        ));
        tasks.insert(name.clone(), task);
    }

    Ok(tasks)
}

/// Resolve `--task` selections; no selection means every configured task.
fn select_tasks(cfg: &ConfigFile, requested: &[String]) -> crate::errors::Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(cfg.task.keys().cloned().collect());
    }

    let mut selected = Vec::with_capacity(requested.len());
    for name in requested {
        if !cfg.task.contains_key(name) {
            return Err(DropwatchError::TaskNotFound(name.clone()));
        }
        if !selected.contains(name) {
            selected.push(name.clone());
        }
    }
    Ok(selected)
}

/// Figure out the directory relative task paths resolve against.
///
/// - If the config path has a non-empty parent (e.g. "configs/Dropwatch.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Dropwatch.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print timing and the selected tasks.
fn print_dry_run(cfg: &ConfigFile, root_dir: &Path, selected: &[String]) {
    println!("dropwatch dry-run");
    println!("  config.tick_ms = {}", cfg.config.tick_ms);
    println!("  config.dwell_ticks = {}", cfg.config.dwell_ticks);
    println!("  config.confirmations = {}", cfg.config.confirmations);
    println!("  config.poll_ticks = {}", cfg.config.poll_ticks);
    println!();

    println!("tasks ({}):", selected.len());
    for name in selected {
        let task = &cfg.task[name];
        println!("  - {name}");
        println!("      watch: {}", task.watch_dir(root_dir).display());
        println!("      run: {}", task.run_dir(root_dir).display());
        println!("      cmd: {}", task.cmd);
        if !task.include.is_empty() {
            println!("      include: {:?}", task.include);
        }
        if !task.exclude.is_empty() {
            println!("      exclude: {:?}", task.exclude);
        }
    }

    debug!("dry-run complete (no files touched)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_and_validate;

    const TWO_TASKS: &str = r#"
[task.a]
watch = "in-a"
run = "runs-a"
cmd = "true"

[task.b]
watch = "in-b"
run = "runs-b"
cmd = "true"
include = ["*.csv"]
"#;

    #[test]
    fn no_selection_means_every_task() {
        let cfg = parse_and_validate(TWO_TASKS).unwrap();
        assert_eq!(select_tasks(&cfg, &[]).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn unknown_task_is_rejected() {
        let cfg = parse_and_validate(TWO_TASKS).unwrap();
        let err = select_tasks(&cfg, &["c".to_string()]).unwrap_err();
        assert!(matches!(err, DropwatchError::TaskNotFound(ref n) if n == "c"));
    }

    #[test]
    fn task_map_only_holds_selected_tasks() {
        let cfg = parse_and_validate(TWO_TASKS).unwrap();
        let fs: Arc<dyn FileSystem> = Arc::new(crate::fs::mock::MockFileSystem::new());

        let tasks = build_tasks(&cfg, Path::new("/srv"), &["b".to_string()], fs).unwrap();

        assert_eq!(tasks.keys().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(tasks["b"].pwd(), Path::new("/srv/runs-b"));
    }

    #[test]
    fn bare_config_name_resolves_against_cwd() {
        assert_eq!(
            config_root_dir(Path::new("configs/Dropwatch.toml")),
            PathBuf::from("configs")
        );
        assert_eq!(
            config_root_dir(Path::new("Dropwatch.toml")),
            std::env::current_dir().unwrap()
        );
    }
}
