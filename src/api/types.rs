//! Shared API response types
//!
//! Used by the HTTP handlers for serialization and by the CLI client for
//! deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monitor::{Monitor, MonitorId, Status};

/// Snapshot of a monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub id: MonitorId,
    pub name: String,
    pub running: bool,
    pub failing: bool,
    pub status: Status,
    pub times: u64,
    pub failed_at: Option<DateTime<Utc>>,
    pub probe: String,
    pub filter: Option<String>,
    pub actions: Vec<String>,
}

impl From<&Monitor> for MonitorInfo {
    fn from(monitor: &Monitor) -> Self {
        Self {
            id: monitor.id().unwrap_or_default(),
            name: monitor.name().to_string(),
            running: monitor.running(),
            failing: monitor.failing(),
            status: monitor.status(),
            times: monitor.times(),
            failed_at: monitor.failed_at(),
            probe: monitor.probe_description(),
            filter: monitor.filter_description(),
            actions: monitor.action_descriptions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorsResponse {
    pub monitors: Vec<MonitorInfo>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: MonitorId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub monitors: usize,
}

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
