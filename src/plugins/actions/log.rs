use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::plugins::{Action, parse_options};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {}

/// Writes failure and recovery records to the log
#[derive(Debug, Clone, Default)]
pub struct LogAction;

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("action:log")
    }
}

#[async_trait]
impl Action for LogAction {
    async fn init(&self, monitor: &str) -> anyhow::Result<()> {
        info!(monitor, "watching");
        Ok(())
    }

    async fn fail(&self, monitor: &str, value: f64) -> anyhow::Result<()> {
        warn!(monitor, value, "failure detected");
        Ok(())
    }

    async fn recover(&self, monitor: &str, duration: Duration) -> anyhow::Result<()> {
        info!(monitor, duration_secs = duration.as_secs_f64(), "recovered");
        Ok(())
    }
}

pub fn construct(params: &Value) -> anyhow::Result<Box<dyn Action>> {
    let Options {} = parse_options("action:log", params)?;
    Ok(Box::new(LogAction))
}
