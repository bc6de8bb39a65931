//! Command probe
//!
//! Runs a command per cycle. The value is the exit code, or with
//! `parse: true` the trimmed stdout read as a floating point number.
//! Spawn errors, signals, unparsable output and expired contexts yield
//! `failure_value`. The child is killed when the context ends first.

use std::fmt;
use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, instrument, trace};

use crate::plugins::{Probe, ProbeContext, parse_options};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    parse: bool,
    #[serde(default = "default_failure_value")]
    failure_value: f64,
}

fn default_failure_value() -> f64 {
    1.0
}

#[derive(Debug, Clone)]
pub struct ExecProbe {
    command: String,
    args: Vec<String>,
    parse: bool,
    failure_value: f64,
}

impl fmt::Display for ExecProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe:exec:{}", self.command)
    }
}

impl ExecProbe {
    async fn execute(&self) -> anyhow::Result<f64> {
        let output = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.command))?;

        if self.parse {
            let stdout = String::from_utf8_lossy(&output.stdout);
            return stdout
                .trim()
                .parse::<f64>()
                .with_context(|| format!("output of {} is not a number", self.command));
        }

        output
            .status
            .code()
            .map(f64::from)
            .with_context(|| format!("{} was terminated by a signal", self.command))
    }
}

#[async_trait]
impl Probe for ExecProbe {
    #[instrument(skip_all, fields(command = %self.command))]
    async fn probe(&self, ctx: &ProbeContext) -> f64 {
        let run = async {
            self.execute().await.unwrap_or_else(|e| {
                debug!("{e:#}");
                self.failure_value
            })
        };

        let value = ctx.run(run, self.failure_value).await;
        trace!("value {value}");
        value
    }
}

pub fn construct(params: &Value) -> anyhow::Result<Box<dyn Probe>> {
    let options: Options = parse_options("probe:exec", params)?;

    if options.command.trim().is_empty() {
        anyhow::bail!("probe:exec: command must not be empty");
    }

    Ok(Box::new(ExecProbe {
        command: options.command,
        args: options.args,
        parse: options.parse,
        failure_value: options.failure_value,
    }))
}
