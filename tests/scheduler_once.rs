mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{blocked, engine, settings, task, FakeController, ScriptedProbe};
use proxy_rotator::config::MonitoringConfig;
use proxy_rotator::probe::ProbeOutcome;
use proxy_rotator::scheduler::{SystemClock, TaskBoard, TaskScheduler};
use proxy_rotator::stats::StatStore;
use proxy_rotator::Shutdown;

fn monitoring(interval_sec: f64, once: bool) -> MonitoringConfig {
    MonitoringConfig {
        interval_sec,
        once,
        ..Default::default()
    }
}

fn controller() -> Arc<FakeController> {
    Arc::new(
        FakeController::new()
            .with_group("Streaming", &["S1", "S2"], "S1")
            .with_group("AI", &["A1", "A2"], "A1"),
    )
}

#[tokio::test(start_paused = true)]
async fn test_once_waits_for_slowest_task() {
    let controller = controller();
    let probe = Arc::new(
        ScriptedProbe::always(ProbeOutcome::Reachable).script("gemini", vec![blocked(), blocked()]),
    );
    let store = Arc::new(StatStore::new(None));
    let settings = settings(0, 1);
    let engines = vec![
        engine(&task("task1", "Streaming", "netflix"), settings.clone(), store.clone(), controller.clone(), probe.clone()),
        engine(&task("task2", "AI", "gemini"), settings, store, controller, probe.clone()),
    ];

    let board = TaskBoard::new();
    let scheduler = TaskScheduler::new(
        engines,
        &monitoring(30.0, true),
        Arc::new(SystemClock::new()),
        board.clone(),
    );

    let shutdown = Shutdown::new();
    let started = tokio::time::Instant::now();
    let summary = scheduler.run(shutdown.subscribe()).await;

    assert!(summary.all_healthy);
    assert!(!summary.interrupted);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));

    // Task 2 turned healthy on its third tick; task 1 kept its own cadence.
    assert_eq!(board.get("task2").unwrap().ticks, 3);
    let task1_ticks = board.get("task1").unwrap().ticks;
    assert!((2..=3).contains(&task1_ticks), "task1 ticked {} times", task1_ticks);
    assert_eq!(probe.calls("netflix") as u64, task1_ticks);
}

#[tokio::test(start_paused = true)]
async fn test_once_stops_immediately_when_all_healthy() {
    let probe = Arc::new(ScriptedProbe::always(ProbeOutcome::Reachable));
    let controller = controller();
    let store = Arc::new(StatStore::new(None));
    let engines = vec![
        engine(&task("a", "Streaming", "netflix"), settings(0, 1), store.clone(), controller.clone(), probe.clone()),
        engine(&task("b", "AI", "chatgpt"), settings(0, 1), store, controller, probe),
    ];
    let scheduler = TaskScheduler::new(
        engines,
        &monitoring(30.0, true),
        Arc::new(SystemClock::new()),
        TaskBoard::new(),
    );

    let started = tokio::time::Instant::now();
    let summary = scheduler.run(Shutdown::new().subscribe()).await;
    assert!(summary.all_healthy);
    assert_eq!(summary.ticks, 2);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_slow_task_does_not_delay_others() {
    let probe = Arc::new(ScriptedProbe::always(blocked()).delay("netflix", Duration::from_secs(20)));
    let controller = controller();
    let store = Arc::new(StatStore::new(None));
    let engines = vec![
        engine(&task("slow", "Streaming", "netflix"), settings(0, 1), store.clone(), controller.clone(), probe.clone()),
        engine(&task("fast", "AI", "gemini"), settings(0, 1), store, controller, probe),
    ];
    let board = TaskBoard::new();
    let scheduler = TaskScheduler::new(
        engines,
        &monitoring(30.0, false),
        Arc::new(SystemClock::new()),
        board.clone(),
    );

    let shutdown = Shutdown::new();
    let run = tokio::spawn(scheduler.run(shutdown.subscribe()));
    tokio::time::sleep(Duration::from_secs(95)).await;
    shutdown.trigger();
    let summary = run.await.unwrap();

    assert!(summary.interrupted);
    assert!(!summary.all_healthy);
    // fast: t=0,30,60,90. slow: t=0..20, 50..70.
    assert_eq!(board.get("fast").unwrap().ticks, 4);
    assert_eq!(board.get("slow").unwrap().ticks, 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_stuck_tick_after_grace() {
    let probe = Arc::new(ScriptedProbe::always(blocked()).delay("netflix", Duration::from_secs(45)));
    let controller = controller();
    let engines = vec![engine(
        &task("stuck", "Streaming", "netflix"),
        settings(0, 1),
        Arc::new(StatStore::new(None)),
        controller,
        probe,
    )];
    let mut config = monitoring(30.0, false);
    config.shutdown_grace_secs = 5;
    let board = TaskBoard::new();
    let scheduler = TaskScheduler::new(engines, &config, Arc::new(SystemClock::new()), board.clone());

    let shutdown = Shutdown::new();
    let run = tokio::spawn(scheduler.run(shutdown.subscribe()));
    tokio::time::sleep(Duration::from_secs(10)).await;
    let stopping = tokio::time::Instant::now();
    shutdown.trigger();
    let summary = run.await.unwrap();

    assert!(summary.interrupted);
    let waited = stopping.elapsed();
    assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(6));
    assert_eq!(board.get("stuck").unwrap().ticks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_crashed_task_ends_once_run_as_failure() {
    let checks = Arc::new(ScriptedProbe::always(ProbeOutcome::Reachable).panic_on("gemini"));
    let controller = controller();
    let store = Arc::new(StatStore::new(None));
    let engines = vec![
        engine(&task("task1", "Streaming", "netflix"), settings(0, 1), store.clone(), controller.clone(), checks.clone()),
        engine(&task("task2", "AI", "gemini"), settings(0, 1), store, controller, checks),
    ];
    let board = TaskBoard::new();
    let scheduler = TaskScheduler::new(
        engines,
        &monitoring(30.0, true),
        Arc::new(SystemClock::new()),
        board.clone(),
    );

    let started = tokio::time::Instant::now();
    let summary = tokio::time::timeout(
        Duration::from_secs(600),
        scheduler.run(Shutdown::new().subscribe()),
    )
    .await
    .expect("run finishes once the crash is seen");

    assert_eq!(summary.failed_tasks, vec!["task2".to_string()]);
    assert!(!summary.all_healthy);
    assert!(!summary.interrupted);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(board.get("task2").unwrap().ticks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_crashed_task_is_reported_in_continuous_run() {
    let checks = Arc::new(ScriptedProbe::always(ProbeOutcome::Reachable).panic_on("gemini"));
    let controller = controller();
    let store = Arc::new(StatStore::new(None));
    let engines = vec![
        engine(&task("steady", "Streaming", "netflix"), settings(0, 1), store.clone(), controller.clone(), checks.clone()),
        engine(&task("broken", "AI", "gemini"), settings(0, 1), store, controller, checks),
    ];
    let board = TaskBoard::new();
    let scheduler = TaskScheduler::new(
        engines,
        &monitoring(30.0, false),
        Arc::new(SystemClock::new()),
        board.clone(),
    );

    let shutdown = Shutdown::new();
    let run = tokio::spawn(scheduler.run(shutdown.subscribe()));
    tokio::time::sleep(Duration::from_secs(65)).await;
    shutdown.trigger();
    let summary = run.await.unwrap();

    assert!(summary.interrupted);
    assert!(!summary.all_healthy);
    assert_eq!(summary.failed_tasks, vec!["broken".to_string()]);
    // The healthy task kept its cadence: t=0, 30, 60.
    assert_eq!(board.get("steady").unwrap().ticks, 3);
}
