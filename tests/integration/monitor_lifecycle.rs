//! Start/stop semantics of a single monitor

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::time::Instant;
use vigil::error::MonitorError;
use vigil::monitor::{Lifecycle, Monitor, Schedule, Status, Thresholds};
use vigil::plugins::{Probe, ProbeContext};

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_start_rejects_second_run_loop_without_changes() {
    let recorder = Recorder::default();
    let monitor = create_test_monitor(
        ScriptedProbe::new(&[20.0]),
        vec![Box::new(RecordingAction::new(&recorder))],
    );

    monitor.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let times = monitor.times();
    let failed_at = monitor.failed_at();
    assert_eq!(monitor.status(), Status::Failed);
    assert!(failed_at.is_some());

    assert_matches!(monitor.start().await, Err(MonitorError::AlreadyStarted));
    assert_eq!(monitor.times(), times);
    assert_eq!(monitor.status(), Status::Failed);
    assert_eq!(monitor.failed_at(), failed_at);

    // no second init either
    let inits = recorder
        .events()
        .into_iter()
        .filter(|event| matches!(event, Event::Init(_)))
        .count();
    assert_eq!(inits, 1);

    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_start_after_ready_keeps_a_single_stoppable_loop() {
    let recorder = Recorder::default();
    let probe = ScriptedProbe::new(&[1.0]);
    let calls = probe.calls();
    let monitor = create_test_monitor(probe, vec![Box::new(RecordingAction::new(&recorder))]);

    {
        let mut start = Box::pin(monitor.start());
        assert!(futures::poll!(start.as_mut()).is_pending());
        // the loop inits and reports ready, nobody reads it
        tokio::task::yield_now().await;
    }

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(monitor.running());
    let probed = calls.lock().unwrap().len();
    assert!(probed > 0);

    monitor.stop().await;
    assert!(!monitor.running());
    assert_eq!(monitor.status(), Status::Stopped);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(calls.lock().unwrap().len(), probed);

    // a fresh start runs exactly one loop
    monitor.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(calls.lock().unwrap().len(), probed + 3);
    assert_matches!(monitor.start().await, Err(MonitorError::AlreadyStarted));

    monitor.stop().await;
    assert!(!monitor.running());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_start_before_ready_leaves_monitor_stopped() {
    let recorder = Recorder::default();
    let probe = ScriptedProbe::new(&[1.0]);
    let calls = probe.calls();
    let monitor = create_test_monitor(probe, vec![Box::new(RecordingAction::new(&recorder))]);

    {
        let mut start = Box::pin(monitor.start());
        assert!(futures::poll!(start.as_mut()).is_pending());
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!monitor.running());
    assert_eq!(monitor.lifecycle(), Lifecycle::Stopped);
    assert!(calls.lock().unwrap().is_empty());

    monitor.start().await.unwrap();
    assert!(monitor.running());
    monitor.stop().await;
    assert!(!monitor.running());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_panic_leaves_monitor_stopped() {
    let recorder = Recorder::default();
    let monitor = create_test_monitor(
        PanickingProbe,
        vec![Box::new(RecordingAction::new(&recorder))],
    );

    monitor.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!monitor.running());
    assert_eq!(monitor.lifecycle(), Lifecycle::Stopped);
    assert_eq!(monitor.status(), Status::Stopped);
    assert!(!monitor.failing());

    // the dead loop is reaped, a new start inits again
    monitor.stop().await;
    monitor.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!monitor.running());
    assert_eq!(recorder.events().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_huge_interval_does_not_kill_run_loop() {
    let monitor = Arc::new(Monitor::new(
        "rarely",
        Box::new(ScriptedProbe::new(&[1.0])),
        None,
        vec![],
        Schedule {
            interval: Duration::from_secs(u64::MAX),
            timeout: Duration::from_secs(u64::MAX),
        },
        Thresholds::new(0.0, 10.0),
    ));

    monitor.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(monitor.running());
    assert_eq!(monitor.times(), 1);
    assert_eq!(monitor.status(), Status::Running);

    monitor.stop().await;
    assert!(!monitor.running());
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let monitor = create_test_monitor(ScriptedProbe::new(&[1.0]), vec![]);

    // stopping a monitor that never ran
    monitor.stop().await;
    assert!(!monitor.running());

    monitor.start().await.unwrap();
    monitor.stop().await;
    assert!(!monitor.running());
    assert_eq!(monitor.lifecycle(), Lifecycle::Stopped);

    monitor.stop().await;
    assert!(!monitor.running());
    assert_eq!(monitor.status(), Status::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_clears_failure_without_recover() {
    let recorder = Recorder::default();
    let monitor = create_test_monitor(
        ScriptedProbe::new(&[50.0]),
        vec![Box::new(RecordingAction::new(&recorder))],
    );

    monitor.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(monitor.failing());

    monitor.stop().await;
    assert!(!monitor.failing());
    assert_eq!(monitor.failed_at(), None);
    assert_eq!(monitor.status(), Status::Stopped);
    assert!(recorder.recovers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_probe_honoring_context() {
    let monitor = create_test_monitor(
        SlowProbe {
            delay: Duration::from_secs(60),
            honor_context: true,
            value: 1.0,
        },
        vec![],
    );

    monitor.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let before = Instant::now();
    monitor.stop().await;
    assert_eq!(before.elapsed(), Duration::ZERO);

    // the cancelled probe still counts
    assert_eq!(monitor.times(), 1);
    assert_eq!(monitor.status(), Status::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_probe_ignoring_context() {
    let monitor = create_test_monitor(
        SlowProbe {
            delay: Duration::from_secs(10),
            honor_context: false,
            value: 1.0,
        },
        vec![],
    );

    let start = Instant::now();
    monitor.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    monitor.stop().await;
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert!(!monitor.running());
}

#[tokio::test(start_paused = true)]
async fn test_probe_timeout_yields_out_of_range_value() {
    let recorder = Recorder::default();
    let monitor = create_test_monitor(
        SlowProbe {
            delay: Duration::from_secs(30),
            honor_context: true,
            value: 1.0,
        },
        vec![Box::new(RecordingAction::new(&recorder))],
    );

    monitor.start().await.unwrap();
    // timeout is 5s
    tokio::time::sleep(Duration::from_millis(5500)).await;

    assert_eq!(monitor.times(), 1);
    assert_eq!(monitor.status(), Status::Failed);
    let fails = recorder.fails();
    assert_eq!(fails.len(), 1);
    assert!(fails[0].is_nan());

    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_action_init_failure_keeps_monitor_stopped() {
    let recorder = Recorder::default();
    let monitor = create_test_monitor(
        ScriptedProbe::new(&[1.0]),
        vec![
            Box::new(RecordingAction::new(&recorder)),
            Box::new(FailingInitAction),
        ],
    );

    let err = monitor.start().await.unwrap_err();
    assert_matches!(&err, MonitorError::ActionInit { action, .. } if action == "action:failing-init");
    assert!(err.to_string().contains("alarm endpoint unreachable"));

    assert!(!monitor.running());
    assert_eq!(monitor.status(), Status::Stopped);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(monitor.times(), 0);

    // a later start runs init again
    assert_matches!(monitor.start().await, Err(MonitorError::ActionInit { .. }));
    assert_eq!(recorder.events().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_interval_is_measured_between_probe_starts() {
    let probe = SlowProbe {
        delay: Duration::from_millis(400),
        honor_context: true,
        value: 1.0,
    };
    let recorder = Recorder::default();
    let scripted = ScriptedProbe::new(&[1.0]);
    let calls = scripted.calls();

    // a probe that is slow and records its call times
    struct Timed {
        slow: SlowProbe,
        scripted: ScriptedProbe,
    }

    impl std::fmt::Display for Timed {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("probe:timed")
        }
    }

    #[async_trait::async_trait]
    impl Probe for Timed {
        async fn probe(&self, ctx: &ProbeContext) -> f64 {
            self.scripted.probe(ctx).await;
            self.slow.probe(ctx).await
        }
    }

    let monitor = create_test_monitor(
        Timed {
            slow: probe,
            scripted,
        },
        vec![Box::new(RecordingAction::new(&recorder))],
    );

    monitor.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    monitor.stop().await;

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 4);
    for pair in calls.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_secs(1));
    }
    assert_eq!(monitor.times(), 4);
}
