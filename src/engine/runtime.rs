// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clock::Tick;
use crate::errors::Result;
use crate::schedule::{PassReport, Scheduler};
use crate::types::TaskMap;

use super::{EngineEvent, EngineOptions};

/// Totals over the engine's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// `run_until_idle` rounds.
    pub rounds: usize,
    pub passes: usize,
    pub runs: usize,
    pub failures: usize,
}

impl EngineStats {
    fn record(&mut self, report: &PassReport) {
        self.rounds += 1;
        self.passes += report.passes;
        self.runs += report.ran.len();
        self.failures += report.failures.len();
    }
}

/// Why the engine woke up after an idle round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Poll,
    FilesChanged,
    Shutdown,
}

/// Drives the scheduler until shutdown.
///
/// Events are read from `event_rx` only between rounds; a shutdown request
/// that arrives mid-round lets the round finish first.
pub struct Engine {
    scheduler: Scheduler,
    ticker: Arc<dyn Tick>,
    event_rx: Option<mpsc::Receiver<EngineEvent>>,
    options: EngineOptions,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("scheduler", &self.scheduler)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(
        scheduler: Scheduler,
        ticker: Arc<dyn Tick>,
        event_rx: mpsc::Receiver<EngineEvent>,
        options: EngineOptions,
    ) -> Self {
        Self {
            scheduler,
            ticker,
            event_rx: Some(event_rx),
            options,
        }
    }

    /// Main loop.
    ///
    /// With `exit_when_idle`, a round with any task failure is an error.
    pub async fn run(mut self, tasks: &TaskMap) -> Result<EngineStats> {
        info!(tasks = tasks.len(), "dropwatch engine started");
        let mut stats = EngineStats::default();

        loop {
            let report = self.scheduler.run_until_idle(tasks).await;
            stats.record(&report);
            debug!(
                passes = report.passes,
                runs = report.ran.len(),
                failures = report.failures.len(),
                "round finished"
            );

            if self.options.exit_when_idle {
                return finish_once(report, stats);
            }

            match self.wait_for_work().await {
                Wake::Poll => debug!("poll interval elapsed"),
                Wake::FilesChanged => debug!("woken by file watcher"),
                Wake::Shutdown => {
                    info!("shutdown requested; stopping engine");
                    break;
                }
            }
        }

        info!(?stats, "engine exiting");
        Ok(stats)
    }

    async fn wait_for_work(&mut self) -> Wake {
        let poll = self.options.poll_ticks;

        let received = match self.event_rx.as_mut() {
            Some(rx) => tokio::select! {
                _ = self.ticker.tick(poll) => None,
                event = rx.recv() => Some(event),
            },
            None => {
                self.ticker.tick(poll).await;
                None
            }
        };

        match received {
            None => Wake::Poll,
            Some(None) => {
                debug!("engine event channel closed; polling only");
                self.event_rx = None;
                Wake::Poll
            }
            Some(Some(EngineEvent::ShutdownRequested)) => Wake::Shutdown,
            Some(Some(EngineEvent::FilesChanged)) => self.drain_pending(),
        }
    }

    /// Collapse queued wake-ups into one, keeping any shutdown request.
    fn drain_pending(&mut self) -> Wake {
        let Some(rx) = self.event_rx.as_mut() else {
            return Wake::FilesChanged;
        };
        while let Ok(event) = rx.try_recv() {
            if event == EngineEvent::ShutdownRequested {
                return Wake::Shutdown;
            }
        }
        Wake::FilesChanged
    }
}

fn finish_once(report: PassReport, stats: EngineStats) -> Result<EngineStats> {
    if report.is_clean() {
        info!(?stats, "all tasks idle; exiting");
        return Ok(stats);
    }

    warn!(failures = report.failures.len(), "round finished with failures");
    let summary: Vec<String> = report.failures.iter().map(ToString::to_string).collect();
    Err(anyhow!(
        "{} task failure(s):\n{}",
        report.failures.len(),
        summary.join("\n")
    )
    .into())
}
