// src/watch/watcher.rs

use std::path::PathBuf;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::info;

use crate::engine::EngineEvent;
use crate::errors::Result;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Whether a notify event can mean new or changed entries.
fn is_relevant(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}

/// Watch every directory in `dirs` recursively and send
/// `EngineEvent::FilesChanged` whenever something in them changes.
///
/// Events are coalesced: if a wake-up is already queued, further ones are
/// dropped. The watcher only shortens idle waits; passes still re-list the
/// directories themselves, so a missed event costs at most one poll interval.
pub fn spawn_watcher(dirs: &[PathBuf], engine_tx: mpsc::Sender<EngineEvent>) -> Result<WatcherHandle> {
    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_relevant(&event.kind) {
                    let _ = engine_tx.try_send(EngineEvent::FilesChanged);
                }
            }
            Err(err) => {
                // We can't log via tracing here easily, so fallback to stderr.
                eprintln!("dropwatch: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    for dir in dirs {
        watcher.watch(dir, RecursiveMode::Recursive)?;
        info!("file watcher started on {:?}", dir);
    }

    Ok(WatcherHandle { _inner: watcher })
}
