use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::MonitorError;

use super::{Monitor, MonitorId};

#[derive(Debug)]
struct Entries {
    next_id: MonitorId,
    monitors: BTreeMap<MonitorId, Arc<Monitor>>,
}

/// Table of registered monitors
///
/// IDs start at 1 and are never reused, even after a monitor is
/// unregistered. The directory only looks monitors up; it does not start or
/// stop them.
#[derive(Debug)]
pub struct Directory {
    entries: Mutex<Entries>,
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl Directory {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries {
                next_id: 1,
                monitors: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Assigns the next ID to `monitor` and adds it
    pub fn register(&self, monitor: Arc<Monitor>) -> Result<MonitorId, MonitorError> {
        let mut entries = self.lock();

        let id = entries.next_id;
        monitor
            .assign_id(id)
            .map_err(MonitorError::AlreadyRegistered)?;
        entries.next_id += 1;

        debug!("registered monitor {} as {id}", monitor.name());
        entries.monitors.insert(id, monitor);
        Ok(id)
    }

    /// Removes `monitor`, returns `false` if it was not registered
    pub fn unregister(&self, monitor: &Monitor) -> bool {
        let Some(id) = monitor.id() else {
            return false;
        };

        let removed = self.lock().monitors.remove(&id).is_some();
        if removed {
            debug!("unregistered monitor {id}");
        }
        removed
    }

    pub fn find(&self, id: MonitorId) -> Option<Arc<Monitor>> {
        self.lock().monitors.get(&id).cloned()
    }

    /// Snapshot of all registered monitors, ordered by ID
    pub fn list(&self) -> Vec<Arc<Monitor>> {
        self.lock().monitors.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
