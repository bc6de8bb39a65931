pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod monitor;
pub mod plugins;
pub mod supervisor;
pub mod util;

pub use config::{MonitorDefinition, PluginSpec};
pub use error::{DefinitionError, MonitorError, RegistryError, SupervisorError};
pub use monitor::{Directory, Monitor, MonitorId, Status};
pub use plugins::Registries;
pub use supervisor::Supervisor;
