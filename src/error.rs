//! Error types for the supervision engine
//!
//! Errors are split by the point where they surface:
//!
//! - [`RegistryError`]: plugin lookup and construction
//! - [`DefinitionError`]: turning a definition into a monitor (configuration errors)
//! - [`MonitorError`]: lifecycle operations on a monitor
//! - [`SupervisorError`]: operations addressing monitors by ID

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::monitor::MonitorId;

/// Plugin family a registry serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Probe,
    Filter,
    Action,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKind::Probe => write!(f, "probe"),
            PluginKind::Filter => write!(f, "filter"),
            PluginKind::Action => write!(f, "action"),
        }
    }
}

/// Errors raised by a plugin registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No constructor registered under this name
    #[error("{kind} not found: {name}")]
    NotFound { kind: PluginKind, name: String },

    /// A constructor was already registered under this name
    #[error("duplicate {kind} entry: {name}")]
    Duplicate { kind: PluginKind, name: String },

    /// The constructor itself rejected its parameters
    #[error(transparent)]
    Construct(#[from] anyhow::Error),
}

/// Errors raised while building a monitor from its definition
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("invalid monitor definition '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error(transparent)]
    Plugin(#[from] RegistryError),

    #[error("failed to parse monitor definitions: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read monitor definitions: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<DefinitionError>,
    },
}

/// Errors raised by monitor lifecycle operations
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor is already started")]
    AlreadyStarted,

    #[error("monitor is already registered with id {0}")]
    AlreadyRegistered(MonitorId),

    #[error("failed to init action {action}: {source}")]
    ActionInit {
        action: String,
        #[source]
        source: anyhow::Error,
    },

    /// The run loop went away before reporting its init result (it panicked)
    #[error("monitor run loop exited during startup")]
    Exited,
}

/// Errors raised by the supervisor
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("monitor not found: {0}")]
    NotFound(MonitorId),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}
