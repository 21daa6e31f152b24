// src/stability/detector.rs

//! Decides when a discovered file set has stopped changing.
//!
//! Polling runs in two phases, strictly one after the other:
//!
//! 1. **Sizes.** Re-discover the candidates and collect the size of every
//!    file beneath them. Wait one tick and retry until two consecutive polls
//!    agree.
//! 2. **Checksums.** Hash exactly the files of the stable size snapshot.
//!    A mismatch with the previous checksums sends the detector back to
//!    phase 1 with an empty size baseline. A match is confirmed again after
//!    a dwell of `dwell_ticks`, `confirmations` times.
//!
//! Once confirmed, the candidates are discovered one final time and that
//! fresh listing is returned.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use futures::future::try_join_all;
use tracing::{debug, info, trace};

use crate::clock::Tick;
use crate::inspect::Inspector;
use crate::stability::snapshot::{ChecksumSnapshot, SizeSnapshot};

/// Tunables for the checksum phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityConfig {
    /// Ticks to wait between checksum confirmation rounds.
    pub dwell_ticks: u64,
    /// Confirmation counter the checksum phase starts with.
    pub confirmations: u32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            dwell_ticks: 30,
            confirmations: 1,
        }
    }
}

/// Per-call polling state. Lives only as long as one `stabilize` call.
#[derive(Debug, Default)]
struct StabilizationState {
    sizes: SizeSnapshot,
    checksums: ChecksumSnapshot,
    remaining: u32,
}

#[derive(Clone)]
pub struct StabilityDetector {
    inspector: Arc<dyn Inspector>,
    ticker: Arc<dyn Tick>,
    config: StabilityConfig,
}

impl std::fmt::Debug for StabilityDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StabilityDetector {
    pub fn new(inspector: Arc<dyn Inspector>, ticker: Arc<dyn Tick>, config: StabilityConfig) -> Self {
        Self {
            inspector,
            ticker,
            config,
        }
    }

    pub fn config(&self) -> StabilityConfig {
        self.config
    }

    pub fn ticker(&self) -> &Arc<dyn Tick> {
        &self.ticker
    }

    /// Poll `find_candidates` until the files beneath its results stop
    /// changing, then return a fresh listing.
    ///
    /// Any discovery or inspection failure aborts the whole call.
    pub async fn stabilize<F, Fut>(&self, find_candidates: F) -> Result<Vec<PathBuf>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<PathBuf>>>,
    {
        let mut state = StabilizationState::default();
        let mut polls: u64 = 0;

        'sizes: loop {
            polls += 1;
            let sizes = self.gather_sizes(&find_candidates).await?;

            if sizes != state.sizes {
                trace!(poll = polls, files = sizes.len(), "sizes changed; waiting one tick");
                state.sizes = sizes;
                self.ticker.tick(1).await;
                continue 'sizes;
            }

            debug!(poll = polls, files = sizes.len(), "sizes stable; comparing checksums");
            state.remaining = self.config.confirmations;

            loop {
                let checksums = self.gather_checksums(&state.sizes).await?;

                if checksums != state.checksums {
                    debug!(poll = polls, "checksums changed; restarting size phase");
                    state.checksums = checksums;
                    // Not the stable sizes: a rewrite must sit through at
                    // least one more tick and size poll before it can be
                    // confirmed.
                    state.sizes = SizeSnapshot::default();
                    continue 'sizes;
                }

                if state.remaining < 1 {
                    break 'sizes;
                }

                trace!(remaining = state.remaining, "checksums match; dwelling");
                self.ticker.tick(self.config.dwell_ticks).await;
                state.remaining -= 1;
            }
        }

        let paths = find_candidates().await?;
        info!(
            files = state.checksums.len(),
            candidates = paths.len(),
            polls,
            "file set is stable"
        );
        Ok(paths)
    }

    async fn gather_sizes<F, Fut>(&self, find_candidates: &F) -> Result<SizeSnapshot>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<PathBuf>>>,
    {
        let paths = find_candidates().await?;
        let maps = try_join_all(paths.iter().map(|p| self.inspector.sizes_under(p))).await?;

        let mut combined = SizeSnapshot::new();
        for map in maps {
            combined.merge(map);
        }
        Ok(combined)
    }

    async fn gather_checksums(&self, sizes: &SizeSnapshot) -> Result<ChecksumSnapshot> {
        let sums = try_join_all(sizes.paths().map(|path| async move {
            let sum = self.inspector.checksum(path).await?;
            Ok::<_, anyhow::Error>((path.to_path_buf(), sum))
        }))
        .await?;

        Ok(sums.into_iter().collect())
    }
}
