//! Built-in actions
//!
//! | Name      | Notifies                                              |
//! |-----------|-------------------------------------------------------|
//! | `log`     | the process log                                       |
//! | `webhook` | JSON `POST` to per-event URLs                         |
//! | `discord` | a Discord webhook, as an embed message                |

use crate::error::RegistryError;

use super::{Action, Registry};

pub mod discord;
pub mod log;
pub mod webhook;

pub fn register_builtins(registry: &Registry<Box<dyn Action>>) -> Result<(), RegistryError> {
    registry.register("discord", discord::construct)?;
    registry.register("log", log::construct)?;
    registry.register("webhook", webhook::construct)?;
    Ok(())
}
