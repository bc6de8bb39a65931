use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Deadline and cancellation signal handed to a probe
///
/// The context is cooperative: it tells the probe when to give up, it does
/// not interrupt anything by itself. Probes either pass [`remaining`] on to
/// their I/O or wrap their work in [`run`].
///
/// [`remaining`]: ProbeContext::remaining
/// [`run`]: ProbeContext::run
#[derive(Debug, Clone)]
pub struct ProbeContext {
    deadline: Instant,
    cancel: watch::Receiver<bool>,
}

impl ProbeContext {
    pub fn new(timeout: Duration, cancel: watch::Receiver<bool>) -> Self {
        Self {
            deadline: deadline_after(timeout),
            cancel,
        }
    }

    /// A context that only expires, for running a probe outside a monitor
    pub fn with_timeout(timeout: Duration) -> Self {
        // a dropped sender never reports cancellation, see `cancelled`
        let (_tx, cancel) = watch::channel(false);
        Self::new(timeout, cancel)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left until the deadline (zero once expired)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn is_done(&self) -> bool {
        self.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Resolves once the monitor asks the probe to stop
    pub async fn cancelled(&self) {
        let mut cancel = self.cancel.clone();
        wait_cancelled(&mut cancel).await;
    }

    /// Resolves at the deadline or on cancellation, whichever comes first
    pub async fn done(&self) {
        tokio::select! {
            _ = sleep_until(self.deadline) => {}
            _ = self.cancelled() => {}
        }
    }

    /// Runs `work` until it finishes or the context is done
    ///
    /// Returns `fallback` if the context ends first; `work` is dropped then.
    pub async fn run<F>(&self, work: F, fallback: f64) -> f64
    where
        F: Future<Output = f64>,
    {
        tokio::select! {
            value = work => value,
            _ = self.done() => fallback,
        }
    }
}

/// Roughly 30 years, used when a deadline does not fit into an [`Instant`]
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + duration`, saturating at a far-future instant
pub(crate) fn deadline_after(duration: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(duration).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Waits until the flag flips to `true`
///
/// A closed channel can never be cancelled, so this stays pending then.
pub(crate) async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    let closed = cancel.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
