//! Scripted plugins and constructors for integration tests

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use vigil::monitor::{Monitor, Schedule, Thresholds};
use vigil::plugins::{Action, Probe, ProbeContext};

/// Returns the scripted values in order, then repeats the last one
pub struct ScriptedProbe {
    values: Mutex<VecDeque<f64>>,
    last: Mutex<f64>,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedProbe {
    pub fn new(values: &[f64]) -> Self {
        Self {
            values: Mutex::new(values.iter().copied().collect()),
            last: Mutex::new(f64::NAN),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Instants at which the probe was called
    pub fn calls(&self) -> Arc<Mutex<Vec<Instant>>> {
        Arc::clone(&self.calls)
    }
}

impl fmt::Display for ScriptedProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("probe:scripted")
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, _ctx: &ProbeContext) -> f64 {
        self.calls.lock().unwrap().push(Instant::now());

        let mut last = self.last.lock().unwrap();
        if let Some(value) = self.values.lock().unwrap().pop_front() {
            *last = value;
        }
        *last
    }
}

/// Takes `delay` per call; with `honor_context` the delay is cut by the context
pub struct SlowProbe {
    pub delay: Duration,
    pub honor_context: bool,
    pub value: f64,
}

impl fmt::Display for SlowProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe:slow:{:?}", self.delay)
    }
}

#[async_trait]
impl Probe for SlowProbe {
    async fn probe(&self, ctx: &ProbeContext) -> f64 {
        let work = async {
            tokio::time::sleep(self.delay).await;
            self.value
        };

        if self.honor_context {
            ctx.run(work, f64::NAN).await
        } else {
            work.await
        }
    }
}

/// Panics on every call, takes the run loop down with it
pub struct PanickingProbe;

impl fmt::Display for PanickingProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("probe:panicking")
    }
}

#[async_trait]
impl Probe for PanickingProbe {
    async fn probe(&self, _ctx: &ProbeContext) -> f64 {
        panic!("probe blew up");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Init(String),
    Fail(String, f64),
    Recover(String, Duration),
}

/// Shared log of action callbacks
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn fails(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Fail(_, value) => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn recovers(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Recover(_, duration) => Some(duration),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct RecordingAction {
    recorder: Recorder,
    fail_callbacks: bool,
}

impl RecordingAction {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            fail_callbacks: false,
        }
    }

    /// Records like [`RecordingAction::new`] but returns an error from `fail` and `recover`
    pub fn failing(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            fail_callbacks: true,
        }
    }

    fn result(&self) -> anyhow::Result<()> {
        if self.fail_callbacks {
            anyhow::bail!("notification channel down");
        }
        Ok(())
    }
}

impl fmt::Display for RecordingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("action:recording")
    }
}

#[async_trait]
impl Action for RecordingAction {
    async fn init(&self, monitor: &str) -> anyhow::Result<()> {
        self.recorder.push(Event::Init(monitor.to_string()));
        Ok(())
    }

    async fn fail(&self, monitor: &str, value: f64) -> anyhow::Result<()> {
        self.recorder.push(Event::Fail(monitor.to_string(), value));
        self.result()
    }

    async fn recover(&self, monitor: &str, duration: Duration) -> anyhow::Result<()> {
        self.recorder
            .push(Event::Recover(monitor.to_string(), duration));
        self.result()
    }
}

pub struct FailingInitAction;

impl fmt::Display for FailingInitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("action:failing-init")
    }
}

#[async_trait]
impl Action for FailingInitAction {
    async fn init(&self, _monitor: &str) -> anyhow::Result<()> {
        anyhow::bail!("alarm endpoint unreachable")
    }

    async fn fail(&self, _monitor: &str, _value: f64) -> anyhow::Result<()> {
        Ok(())
    }

    async fn recover(&self, _monitor: &str, _duration: Duration) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn schedule(interval_secs: u64, timeout_secs: u64) -> Schedule {
    Schedule {
        interval: Duration::from_secs(interval_secs),
        timeout: Duration::from_secs(timeout_secs),
    }
}

/// A monitor checking `0..=10` every second with a 5s timeout
pub fn create_test_monitor(probe: impl Probe + 'static, actions: Vec<Box<dyn Action>>) -> Arc<Monitor> {
    Arc::new(Monitor::new(
        "scenario",
        Box::new(probe),
        None,
        actions,
        schedule(1, 5),
        Thresholds::new(0.0, 10.0),
    ))
}

pub const DEFINITIONS_YAML: &str = r#"
- monitor:
    name: always-ok
    probe:
      type: constant
      params:
        value: 1
    actions:
      - type: log
    interval: 60
    timeout: 5
    min: 0
    max: 10
- monitor:
    name: always-failing
    probe:
      type: constant
      params:
        value: 50
    filter:
      type: average
      params:
        window: 3
    actions:
      - type: log
    interval: 60
    timeout: 5
    min: 0
    max: 10
"#;
