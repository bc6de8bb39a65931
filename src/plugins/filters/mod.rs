//! Built-in filters
//!
//! Both filters pass non-finite values (a probe reporting NaN) through
//! unchanged without recording them, so a single broken reading fails the
//! current cycle but does not poison the smoothing state.

use crate::error::RegistryError;

use super::{Filter, Registry};

pub mod average;
pub mod ewma;

pub fn register_builtins(registry: &Registry<Box<dyn Filter>>) -> Result<(), RegistryError> {
    registry.register("average", average::construct)?;
    registry.register("ewma", ewma::construct)?;
    Ok(())
}
