//! Monitors: one probe, an optional filter and a set of actions, driven by
//! an independent run loop
//!
//! ```text
//!            start()                      stop()
//! Stopped ──────────► Starting ──► Running ──────► Stopping ──► Stopped
//!                        │
//!                        └── action init failed ──────────────► Stopped
//! ```
//!
//! Per cycle the run loop arms the interval timer, probes, counts the probe,
//! filters the value and compares it against the [`Thresholds`]. Actions are
//! notified only on the edges between healthy and failing.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::error::MonitorError;
use crate::plugins::{Action, Filter, Probe};

pub mod directory;
mod run;

pub use directory::Directory;

/// Identifier assigned by the [`Directory`]
pub type MonitorId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Running,
    Failed,
    Stopped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Running => "running",
            Status::Failed => "failed",
            Status::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the run loop of a monitor currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Time between the starts of two probes
    pub interval: Duration,
    /// Deadline of a single probe
    pub timeout: Duration,
}

/// Healthy value range, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min: f64,
    pub max: f64,
}

impl Thresholds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// NaN is never contained
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[derive(Debug, Clone, Copy)]
struct FailedAt {
    at: DateTime<Utc>,
    since: Instant,
}

#[derive(Debug)]
struct State {
    lifecycle: Lifecycle,
    status: Status,
    times: u64,
    failed_at: Option<FailedAt>,
}

struct RunHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// A scheduled health check
///
/// Shared as `Arc<Monitor>`; all accessors can be called while the run loop
/// is active.
pub struct Monitor {
    id: OnceLock<MonitorId>,
    name: String,

    probe: Box<dyn Probe>,
    filter: Mutex<Option<Box<dyn Filter>>>,
    actions: Vec<Box<dyn Action>>,

    schedule: Schedule,
    thresholds: Thresholds,

    state: Mutex<State>,

    /// Serializes start and stop, holds the active run loop
    control: tokio::sync::Mutex<Option<RunHandle>>,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("id", &self.id())
            .field("name", &self.name)
            .field("probe", &self.probe.to_string())
            .field("schedule", &self.schedule)
            .field("thresholds", &self.thresholds)
            .field("state", &*self.lock_state())
            .finish()
    }
}

impl Monitor {
    pub fn new(
        name: impl Into<String>,
        probe: Box<dyn Probe>,
        filter: Option<Box<dyn Filter>>,
        actions: Vec<Box<dyn Action>>,
        schedule: Schedule,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            id: OnceLock::new(),
            name: name.into(),
            probe,
            filter: Mutex::new(filter),
            actions,
            schedule,
            thresholds,
            state: Mutex::new(State {
                lifecycle: Lifecycle::Stopped,
                status: Status::Stopped,
                times: 0,
                failed_at: None,
            }),
            control: tokio::sync::Mutex::new(None),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_filter(&self) -> MutexGuard<'_, Option<Box<dyn Filter>>> {
        self.filter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the id once; returns the id already set otherwise
    pub(crate) fn assign_id(&self, id: MonitorId) -> Result<(), MonitorId> {
        self.id.set(id).map_err(|_| self.id().unwrap_or(id))
    }

    pub fn id(&self) -> Option<MonitorId> {
        self.id.get().copied()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lock_state().lifecycle
    }

    /// `true` while a run loop exists
    pub fn running(&self) -> bool {
        self.lifecycle() != Lifecycle::Stopped
    }

    pub fn failing(&self) -> bool {
        self.lock_state().failed_at.is_some()
    }

    pub fn status(&self) -> Status {
        self.lock_state().status
    }

    /// Number of completed probe calls
    pub fn times(&self) -> u64 {
        self.lock_state().times
    }

    /// Start of the current failure streak
    pub fn failed_at(&self) -> Option<DateTime<Utc>> {
        self.lock_state().failed_at.map(|failed_at| failed_at.at)
    }

    pub fn probe_description(&self) -> String {
        self.probe.to_string()
    }

    pub fn filter_description(&self) -> Option<String> {
        self.lock_filter().as_ref().map(|filter| filter.to_string())
    }

    pub fn action_descriptions(&self) -> Vec<String> {
        self.actions.iter().map(|action| action.to_string()).collect()
    }

    /// Spawns the run loop
    ///
    /// Returns once the filter and actions are initialized, without waiting
    /// for a probe. An action that fails to init leaves the monitor stopped
    /// and its error is returned. If the returned future is dropped early
    /// the loop still belongs to the monitor and [`Monitor::stop`] ends it.
    #[instrument(skip(self), fields(monitor = %self.name))]
    pub async fn start(self: &Arc<Self>) -> Result<(), MonitorError> {
        let mut control = self.control.lock().await;

        if let Some(handle) = control.as_ref()
            && !handle.task.is_finished()
        {
            return Err(MonitorError::AlreadyStarted);
        }

        if let Some(stale) = control.take() {
            warn!("run loop exited on its own");
            if let Err(e) = stale.task.await {
                error!("run loop failed: {e}");
            }
        }

        self.lock_state().lifecycle = Lifecycle::Starting;

        let (cancel, cancel_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(run::run(Arc::clone(self), cancel_rx, ready_tx));

        // stop() must reach the loop even if this future is dropped
        *control = Some(RunHandle { cancel, task });

        let ready = ready_rx.await.unwrap_or(Err(MonitorError::Exited));
        if let Err(e) = ready {
            if let Some(RunHandle { task, .. }) = control.take()
                && let Err(join_error) = task.await
            {
                error!("run loop failed: {join_error}");
            }
            self.mark_stopped();
            return Err(e);
        }

        info!("monitor started");
        Ok(())
    }

    /// Stops the run loop and waits until it has exited
    ///
    /// A no-op for a stopped monitor. Clears the failure state without
    /// notifying the actions.
    #[instrument(skip(self), fields(monitor = %self.name))]
    pub async fn stop(&self) {
        let mut control = self.control.lock().await;

        let Some(RunHandle { cancel, task }) = control.take() else {
            return;
        };

        info!("stopping monitor");
        self.lock_state().lifecycle = Lifecycle::Stopping;

        // the loop may have ended already, nothing to signal then
        let _ = cancel.send(true);
        if let Err(e) = task.await {
            error!("run loop failed: {e}");
        }

        self.mark_stopped();
        info!("monitor stopped");
    }

    /// A stopped monitor is never failing
    fn mark_stopped(&self) {
        let mut state = self.lock_state();
        state.failed_at = None;
        state.lifecycle = Lifecycle::Stopped;
        state.status = Status::Stopped;
    }

    fn mark_running(&self) {
        let mut state = self.lock_state();
        state.lifecycle = Lifecycle::Running;
        state.status = Status::Running;
    }
}
