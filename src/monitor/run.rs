use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::MonitorError;
use crate::plugins::ProbeContext;
use crate::plugins::context::{deadline_after, wait_cancelled};

use super::{FailedAt, Monitor, Status};

/// Body of the task spawned by [`Monitor::start`]
///
/// Reports the init result through `ready`, then probes until `cancel` flips.
#[instrument(skip_all, fields(monitor = %monitor.name))]
pub(super) async fn run(
    monitor: Arc<Monitor>,
    mut cancel: watch::Receiver<bool>,
    ready: oneshot::Sender<Result<(), MonitorError>>,
) {
    // however the loop ends (return, cancellation or panic), it is stopped
    let _stopped = StopOnExit(&monitor);

    if let Err(e) = monitor.init().await {
        error!("{e:#}");
        let _ = ready.send(Err(e));
        return;
    }

    monitor.mark_running();
    if ready.send(Ok(())).is_err() {
        debug!("start was abandoned before the monitor was ready");
        return;
    }

    loop {
        // armed before the probe so probe latency does not stretch the period
        let next = deadline_after(monitor.schedule.interval);

        let ctx = ProbeContext::new(monitor.schedule.timeout, cancel.clone());
        let value = monitor.probe.probe(&ctx).await;
        let times = monitor.count_probe();
        trace!(times, "probe returned {value}");

        if *cancel.borrow() {
            debug!("cancelled during probe");
            break;
        }

        let value = monitor.apply_filter(value);
        monitor.evaluate(value).await;

        tokio::select! {
            _ = wait_cancelled(&mut cancel) => break,
            _ = sleep_until(next) => {}
        }
    }

    debug!("run loop exited");
}

struct StopOnExit<'a>(&'a Monitor);

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        self.0.mark_stopped();
    }
}

impl Monitor {
    async fn init(&self) -> Result<(), MonitorError> {
        self.reset_filter();

        for action in &self.actions {
            action
                .init(&self.name)
                .await
                .map_err(|source| MonitorError::ActionInit {
                    action: action.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    fn reset_filter(&self) {
        if let Some(filter) = self.lock_filter().as_mut() {
            filter.init();
        }
    }

    fn apply_filter(&self, value: f64) -> f64 {
        match self.lock_filter().as_mut() {
            Some(filter) => {
                let filtered = filter.put(value);
                trace!("filtered {value} to {filtered}");
                filtered
            }
            None => value,
        }
    }

    fn count_probe(&self) -> u64 {
        let mut state = self.lock_state();
        state.times += 1;
        state.times
    }

    /// Updates the failure state and notifies the actions on a transition
    async fn evaluate(&self, value: f64) {
        if self.thresholds.contains(value) {
            let recovered = {
                let mut state = self.lock_state();
                state.status = Status::Running;
                state.failed_at.take()
            };

            if let Some(failed_at) = recovered {
                let duration = failed_at.since.elapsed();
                info!(duration_secs = duration.as_secs_f64(), "monitor recovered");

                for action in &self.actions {
                    if let Err(e) = action.recover(&self.name, duration).await {
                        error!("{action}: recovery notification failed: {e:#}");
                    }
                }
            }
            return;
        }

        let onset = {
            let mut state = self.lock_state();
            state.status = Status::Failed;
            if state.failed_at.is_none() {
                state.failed_at = Some(FailedAt {
                    at: chrono::Utc::now(),
                    since: Instant::now(),
                });
                true
            } else {
                false
            }
        };

        if onset {
            warn!(value, "monitor failing");

            for action in &self.actions {
                if let Err(e) = action.fail(&self.name, value).await {
                    error!("{action}: failure notification failed: {e:#}");
                }
            }
        }
    }
}
