use std::sync::Mutex;

use dropwatch::clock::Tick;
use futures::future::BoxFuture;

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct TickerState {
    now: u64,
    /// Every `tick(n)` request, in order.
    requests: Vec<u64>,
    scheduled: Vec<(u64, Callback)>,
}

/// Virtual clock for deterministic polling tests.
///
/// `tick(n)` advances a shared counter by `n` instantly, fires every
/// callback scheduled at or before the new time (in scheduling order) and
/// then yields once to the runtime.
///
/// The counter is shared: two loops ticking concurrently both advance it.
#[derive(Default)]
pub struct VirtualTicker {
    state: Mutex<TickerState>,
}

impl std::fmt::Debug for VirtualTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualTicker")
            .field("now", &self.now())
            .finish_non_exhaustive()
    }
}

impl VirtualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks elapsed so far.
    pub fn now(&self) -> u64 {
        self.state.lock().unwrap().now
    }

    /// Every `tick(n)` argument seen so far.
    pub fn requests(&self) -> Vec<u64> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Run `callback` once the clock reaches `tick`.
    pub fn at(&self, tick: u64, callback: impl FnOnce() + Send + 'static) {
        self.state
            .lock()
            .unwrap()
            .scheduled
            .push((tick, Box::new(callback)));
    }

    fn advance(&self, n: u64) -> Vec<Callback> {
        let mut state = self.state.lock().unwrap();
        state.now += n;
        state.requests.push(n);

        let now = state.now;
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut state.scheduled)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        state.scheduled = pending;

        due.into_iter().map(|(_, cb)| cb).collect()
    }
}

impl Tick for VirtualTicker {
    fn tick(&self, n: u64) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            for callback in self.advance(n) {
                callback();
            }
            tokio::task::yield_now().await;
        })
    }
}
