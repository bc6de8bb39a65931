//! Built-in probes
//!
//! | Name       | Value                                                       |
//! |------------|-------------------------------------------------------------|
//! | `constant` | the configured value, for tests and placeholders            |
//! | `http`     | 0 for an expected HTTP response, `failure_value` otherwise  |
//! | `exec`     | exit code (or parsed stdout) of a command                   |
//! | `system`   | host metric from `sysinfo` (cpu, memory, load, ...)         |

use crate::error::RegistryError;

use super::{Probe, Registry};

pub mod constant;
pub mod exec;
pub mod http;
pub mod system;

pub fn register_builtins(registry: &Registry<Box<dyn Probe>>) -> Result<(), RegistryError> {
    registry.register("constant", constant::construct)?;
    registry.register("exec", exec::construct)?;
    registry.register("http", http::construct)?;
    registry.register("system", system::construct)?;
    Ok(())
}
