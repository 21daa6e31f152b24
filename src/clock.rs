// src/clock.rs

//! Logical clock used for every delay in the crate.
//!
//! Nothing waits on wall-clock time directly; it asks a [`Tick`] for `n`
//! logical units instead. Production uses [`TokioTicker`], tests inject a
//! virtual ticker so polling is deterministic.

use std::time::Duration;

use futures::future::BoxFuture;

/// Capability to wait for `n` logical ticks.
pub trait Tick: Send + Sync {
    fn tick(&self, n: u64) -> BoxFuture<'_, ()>;
}

/// Real ticker backed by `tokio::time::sleep`.
///
/// Works with tokio's paused clock, so tests can use
/// `#[tokio::test(start_paused = true)]` against it as well.
#[derive(Debug, Clone, Copy)]
pub struct TokioTicker {
    unit: Duration,
}

impl TokioTicker {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn unit(&self) -> Duration {
        self.unit
    }
}

impl Tick for TokioTicker {
    fn tick(&self, n: u64) -> BoxFuture<'_, ()> {
        let total = self.unit.saturating_mul(n.min(u32::MAX as u64) as u32);
        Box::pin(async move {
            tokio::time::sleep(total).await;
        })
    }
}
