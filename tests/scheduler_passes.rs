// tests/scheduler_passes.rs

use std::path::PathBuf;
use std::sync::Arc;

use dropwatch::clock::Tick;
use dropwatch::fs::mock::MockFileSystem;
use dropwatch::inspect::Inspector;
use dropwatch::schedule::{PassStage, Scheduler};
use dropwatch::stability::{StabilityConfig, StabilityDetector};
use dropwatch::types::TaskMap;
use dropwatch_test_utils::{init_tracing, with_timeout, MockInspector, SpyCall, TaskSpy, VirtualTicker};

fn scheduler(fs: &MockFileSystem) -> (Scheduler, Arc<VirtualTicker>) {
    init_tracing();
    let ticker = Arc::new(VirtualTicker::new());
    let inspector: Arc<dyn Inspector> = Arc::new(MockInspector::new(fs));
    let dyn_ticker: Arc<dyn Tick> = ticker.clone();

    let detector = StabilityDetector::new(inspector, dyn_ticker, StabilityConfig::default());
    (Scheduler::new(detector), ticker)
}

fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

#[tokio::test]
async fn empty_task_map_completes() {
    let fs = MockFileSystem::new();
    let (scheduler, ticker) = scheduler(&fs);

    let report = with_timeout(scheduler.run_until_idle(&TaskMap::new())).await;

    assert_eq!(report.passes, 1);
    assert!(report.ran.is_empty());
    assert!(report.is_clean());
    assert_eq!(ticker.now(), 0);
}

#[tokio::test]
async fn task_finding_nothing_is_only_asked_once() {
    let fs = MockFileSystem::new();
    let (scheduler, ticker) = scheduler(&fs);
    let empty = Arc::new(TaskSpy::new(&fs).finding(|_| Vec::new()));

    let mut tasks = TaskMap::new();
    tasks.insert("always_empty".to_string(), empty.clone());

    let report = with_timeout(scheduler.run_until_idle(&tasks)).await;

    assert_eq!(empty.calls(), vec![SpyCall::Find]);
    assert!(report.ran.is_empty());
    assert_eq!(ticker.now(), 0);
}

#[tokio::test]
async fn present_file_is_moved_then_run() {
    let fs = MockFileSystem::new();
    fs.add_file("a.txt", "hello");
    let (scheduler, ticker) = scheduler(&fs);
    let atxt = Arc::new(
        TaskSpy::new(&fs)
            .finding(|_| paths(&["a.txt"]))
            .with_pwd("atxt_autodir"),
    );

    let mut tasks = TaskMap::new();
    tasks.insert("atxt".to_string(), atxt.clone());

    let report = with_timeout(scheduler.run_until_idle(&tasks)).await;

    assert_eq!(
        atxt.actions(),
        vec![
            SpyCall::Move(paths(&["a.txt"])),
            SpyCall::Run(PathBuf::from("atxt_autodir")),
        ]
    );
    assert_eq!(
        report.ran,
        vec![("atxt".to_string(), PathBuf::from("atxt_autodir"))]
    );
    assert_eq!(report.passes, 2);
    assert_eq!(ticker.now(), 32);
    assert!(fs.files().is_empty());
}

#[tokio::test]
async fn file_arriving_mid_pass_is_handled_by_a_later_pass() {
    let fs = MockFileSystem::new();
    fs.add_file("a.txt", "hello");
    let (scheduler, ticker) = scheduler(&fs);

    let late = fs.clone();
    ticker.at(10, move || late.add_file("b.txt", "ayyy"));

    let atxt = Arc::new(
        TaskSpy::new(&fs)
            .finding(|_| paths(&["a.txt"]))
            .with_pwd("atxt_autodir"),
    );
    let btxt = Arc::new(
        TaskSpy::new(&fs)
            .finding(|fs| {
                if fs.files().contains(&PathBuf::from("b.txt")) {
                    paths(&["b.txt"])
                } else {
                    Vec::new()
                }
            })
            .with_pwd("btxt_autodir"),
    );

    let mut tasks = TaskMap::new();
    tasks.insert("atxt".to_string(), atxt.clone());
    tasks.insert("btxt".to_string(), btxt.clone());

    let report = with_timeout(scheduler.run_until_idle(&tasks)).await;

    assert!(atxt.actions().contains(&SpyCall::Run(PathBuf::from("atxt_autodir"))));
    assert_eq!(
        btxt.actions(),
        vec![
            SpyCall::Move(paths(&["b.txt"])),
            SpyCall::Run(PathBuf::from("btxt_autodir")),
        ]
    );
    assert_eq!(report.passes, 3);
    assert_eq!(report.ran.len(), 2);
}

#[tokio::test]
async fn tasks_outside_the_map_are_never_touched() {
    let fs = MockFileSystem::new();
    fs.add_file("a.txt", "hello");
    let (scheduler, _ticker) = scheduler(&fs);

    let outsider = Arc::new(TaskSpy::new(&fs).finding(|_| paths(&["a.txt"])));
    let member = Arc::new(TaskSpy::new(&fs).finding(|_| Vec::new()));

    let mut tasks = TaskMap::new();
    tasks.insert("member".to_string(), member.clone());

    with_timeout(scheduler.run_until_idle(&tasks)).await;

    assert!(outsider.calls().is_empty());
    assert_eq!(member.calls(), vec![SpyCall::Find]);
    assert_eq!(fs.files(), paths(&["a.txt"]));
}

#[tokio::test]
async fn exits_before_a_late_file_exists() {
    let fs = MockFileSystem::new();
    let (scheduler, ticker) = scheduler(&fs);

    let late = fs.clone();
    ticker.at(10, move || late.add_file("a.txt", "ayyy"));
    let atxt = Arc::new(TaskSpy::new(&fs).finding(|fs| fs.files()));

    let mut tasks = TaskMap::new();
    tasks.insert("atxt".to_string(), atxt.clone());

    let report = with_timeout(scheduler.run_until_idle(&tasks)).await;

    assert_eq!(atxt.calls(), vec![SpyCall::Find]);
    assert_eq!(report.passes, 1);
}

#[tokio::test]
async fn one_failing_task_does_not_stop_another() {
    let fs = MockFileSystem::new();
    fs.add_file("bad.txt", "x");
    fs.add_file("good.txt", "y");
    let (scheduler, _ticker) = scheduler(&fs);

    let bad = Arc::new(
        TaskSpy::new(&fs)
            .finding(|_| paths(&["bad.txt"]))
            .failing_run("exploded"),
    );
    let good = Arc::new(TaskSpy::new(&fs).finding(|_| paths(&["good.txt"])));

    let mut tasks = TaskMap::new();
    tasks.insert("bad".to_string(), bad.clone());
    tasks.insert("good".to_string(), good.clone());

    let report = with_timeout(scheduler.run_until_idle(&tasks)).await;

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.task, "bad");
    assert_eq!(failure.stage, PassStage::Run);
    assert_eq!(failure.to_string(), "task 'bad' failed during run: exploded");

    assert_eq!(report.ran, vec![("good".to_string(), PathBuf::from("work"))]);
    assert!(good.actions().contains(&SpyCall::Run(PathBuf::from("work"))));
    assert_eq!(report.passes, 2);
}

#[tokio::test]
async fn discovery_failure_is_reported_without_retrying() {
    let fs = MockFileSystem::new();
    let (scheduler, _ticker) = scheduler(&fs);
    let broken = Arc::new(TaskSpy::new(&fs).failing_find("permission denied"));

    let mut tasks = TaskMap::new();
    tasks.insert("broken".to_string(), broken.clone());

    let report = with_timeout(scheduler.run_until_idle(&tasks)).await;

    assert_eq!(report.passes, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, PassStage::Find);
    assert_eq!(broken.calls(), vec![SpyCall::Find]);
}

#[tokio::test]
async fn vanishing_candidate_fails_the_stabilize_stage() {
    let fs = MockFileSystem::new();
    let (scheduler, _ticker) = scheduler(&fs);
    let ghost = Arc::new(TaskSpy::new(&fs).finding(|_| paths(&["ghost.txt"])));

    let mut tasks = TaskMap::new();
    tasks.insert("ghost".to_string(), ghost.clone());

    let report = with_timeout(scheduler.run_pass(&tasks)).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, PassStage::Stabilize);
    assert!(ghost.actions().is_empty());
}
