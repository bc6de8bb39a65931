//! Plugin contracts and registries
//!
//! A monitor is assembled from three kinds of plugins:
//!
//! - **Probe**: produces one numeric health value per cycle
//! - **Filter**: smooths consecutive probe values (optional)
//! - **Action**: gets notified on failure onset and recovery
//!
//! Each kind has a [`Registry`] mapping a plugin name to a constructor. A
//! constructor receives the opaque `params` value of a definition and parses
//! it into the plugin's own options struct (see [`parse_options`]).
//!
//! ```text
//! MonitorDefinition ──► Registries::{probes, filters, actions}.construct(name, params)
//!                                   │
//!                                   ▼
//!                        Box<dyn Probe> / Box<dyn Filter> / Box<dyn Action>
//! ```

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod actions;
pub mod context;
pub mod filters;
pub mod probes;
pub mod registry;

pub use context::ProbeContext;
pub use registry::{Constructor, Registries, Registry};

/// Produces a health value for one inspection cycle
///
/// There is no error channel: a probe that cannot measure reports an
/// out-of-range value. Implementations must honor the [`ProbeContext`]
/// they are given, the monitor never aborts a running probe.
#[async_trait]
pub trait Probe: fmt::Display + Send + Sync {
    async fn probe(&self, ctx: &ProbeContext) -> f64;
}

/// Stateful transformation of consecutive probe values
pub trait Filter: fmt::Display + Send {
    /// Resets the internal state, called every time the monitor starts
    fn init(&mut self);

    /// Feeds the next raw value and returns the filtered one
    fn put(&mut self, value: f64) -> f64;
}

/// Notification target for failure and recovery transitions
#[async_trait]
pub trait Action: fmt::Display + Send + Sync {
    /// Called when the monitor starts. An error stops the monitor.
    async fn init(&self, monitor: &str) -> anyhow::Result<()>;

    /// Called once when the value leaves the healthy range.
    ///
    /// Errors are logged, the monitor keeps running.
    async fn fail(&self, monitor: &str, value: f64) -> anyhow::Result<()>;

    /// Called once when the value is back in range, with the failure duration.
    ///
    /// Not called when the monitor is stopped while failing; `init` is the
    /// place to reconcile such a state.
    async fn recover(&self, monitor: &str, duration: Duration) -> anyhow::Result<()>;
}

/// Parses plugin parameters into a typed options struct
///
/// Missing parameters (`null`) are treated as an empty mapping so that
/// options with defaults need no `params` block at all.
pub fn parse_options<T: DeserializeOwned>(plugin: &str, params: &Value) -> anyhow::Result<T> {
    let params = match params {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };

    serde_json::from_value(params).with_context(|| format!("invalid parameters for {plugin}"))
}
