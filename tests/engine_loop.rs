// tests/engine_loop.rs

use std::path::PathBuf;
use std::sync::Arc;

use dropwatch::clock::Tick;
use dropwatch::engine::{Engine, EngineEvent, EngineOptions};
use dropwatch::fs::mock::MockFileSystem;
use dropwatch::inspect::Inspector;
use dropwatch::schedule::Scheduler;
use dropwatch::stability::{StabilityConfig, StabilityDetector};
use dropwatch::types::TaskMap;
use dropwatch_test_utils::{init_tracing, with_timeout, MockInspector, SpyCall, TaskSpy, VirtualTicker};
use tokio::sync::mpsc;

fn engine(
    fs: &MockFileSystem,
    exit_when_idle: bool,
) -> (Engine, Arc<VirtualTicker>, mpsc::Sender<EngineEvent>) {
    init_tracing();
    let ticker = Arc::new(VirtualTicker::new());
    let inspector: Arc<dyn Inspector> = Arc::new(MockInspector::new(fs));
    let dyn_ticker: Arc<dyn Tick> = ticker.clone();
    let scheduler = Scheduler::new(StabilityDetector::new(
        inspector,
        dyn_ticker.clone(),
        StabilityConfig::default(),
    ));

    let (tx, rx) = mpsc::channel(8);
    let engine = Engine::new(
        scheduler,
        dyn_ticker,
        rx,
        EngineOptions {
            exit_when_idle,
            poll_ticks: 5,
        },
    );
    (engine, ticker, tx)
}

#[tokio::test]
async fn once_mode_drains_and_exits() {
    let fs = MockFileSystem::new();
    fs.add_file("a.txt", "hello");
    let (engine, _ticker, _tx) = engine(&fs, true);
    let spy = Arc::new(TaskSpy::new(&fs));

    let mut tasks = TaskMap::new();
    tasks.insert("spy".to_string(), spy.clone());

    let stats = with_timeout(engine.run(&tasks)).await.unwrap();

    assert_eq!(stats.rounds, 1);
    assert_eq!(stats.passes, 2);
    assert_eq!(stats.runs, 1);
    assert_eq!(
        spy.actions(),
        vec![
            SpyCall::Move(vec![PathBuf::from("a.txt")]),
            SpyCall::Run(PathBuf::from("work")),
        ]
    );
}

#[tokio::test]
async fn once_mode_with_failures_is_an_error() {
    let fs = MockFileSystem::new();
    fs.add_file("a.txt", "hello");
    let (engine, _ticker, _tx) = engine(&fs, true);
    let spy = Arc::new(TaskSpy::new(&fs).failing_run("bad exit"));

    let mut tasks = TaskMap::new();
    tasks.insert("spy".to_string(), spy.clone());

    let err = with_timeout(engine.run(&tasks)).await.unwrap_err();

    let rendered = err.to_string();
    assert!(rendered.contains("1 task failure(s)"), "{rendered}");
    assert!(rendered.contains("task 'spy' failed during run: bad exit"), "{rendered}");
}

#[tokio::test]
async fn daemon_picks_up_files_on_later_rounds() {
    let fs = MockFileSystem::new();
    let (engine, ticker, tx) = engine(&fs, false);
    let spy = Arc::new(TaskSpy::new(&fs));

    let late = fs.clone();
    ticker.at(3, move || late.add_file("a.txt", "hello"));
    let stop = tx.clone();
    ticker.at(40, move || {
        let _ = stop.try_send(EngineEvent::ShutdownRequested);
    });

    let mut tasks = TaskMap::new();
    tasks.insert("spy".to_string(), spy.clone());

    let stats = with_timeout(engine.run(&tasks)).await.unwrap();

    assert!(stats.rounds >= 2);
    assert_eq!(stats.runs, 1);
    assert_eq!(stats.failures, 0);
    assert_eq!(
        spy.actions(),
        vec![
            SpyCall::Move(vec![PathBuf::from("a.txt")]),
            SpyCall::Run(PathBuf::from("work")),
        ]
    );
}

#[tokio::test]
async fn queued_wakeups_collapse_and_keep_shutdown() {
    let fs = MockFileSystem::new();
    let (engine, _ticker, tx) = engine(&fs, false);
    let spy = Arc::new(TaskSpy::new(&fs));

    tx.send(EngineEvent::FilesChanged).await.unwrap();
    tx.send(EngineEvent::FilesChanged).await.unwrap();
    tx.send(EngineEvent::ShutdownRequested).await.unwrap();

    let mut tasks = TaskMap::new();
    tasks.insert("spy".to_string(), spy.clone());

    let stats = with_timeout(engine.run(&tasks)).await.unwrap();

    assert_eq!(stats.rounds, 1);
    assert_eq!(spy.calls(), vec![SpyCall::Find]);
}
