use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::trace;

use crate::error::{PluginKind, RegistryError};

use super::{Action, Filter, Probe, actions, filters, probes};

/// Builds a plugin instance from its parameters
pub type Constructor<T> = Arc<dyn Fn(&Value) -> anyhow::Result<T> + Send + Sync>;

/// Name → constructor table for one plugin family
pub struct Registry<T> {
    kind: PluginKind,
    entries: Mutex<HashMap<String, Constructor<T>>>,
}

impl<T> Registry<T> {
    pub fn new(kind: PluginKind) -> Self {
        Self {
            kind,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Adds a constructor under `name`
    ///
    /// Registering a name twice is a startup bug; the existing entry is kept
    /// and [`RegistryError::Duplicate`] is returned.
    pub fn register<F>(&self, name: impl Into<String>, constructor: F) -> Result<(), RegistryError>
    where
        F: Fn(&Value) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if entries.contains_key(&name) {
            return Err(RegistryError::Duplicate {
                kind: self.kind,
                name,
            });
        }

        trace!("registered {} plugin {name}", self.kind);
        entries.insert(name, Arc::new(constructor));
        Ok(())
    }

    /// Builds the plugin registered under `name`
    ///
    /// The constructor runs outside the table lock and its error is passed
    /// through unchanged.
    pub fn construct(&self, name: &str, params: &Value) -> Result<T, RegistryError> {
        let constructor = {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.get(name).cloned()
        };

        let Some(constructor) = constructor else {
            return Err(RegistryError::NotFound {
                kind: self.kind,
                name: name.to_string(),
            });
        };

        Ok(constructor(params)?)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = entries.keys().cloned().collect();
        names.sort();
        names
    }
}

/// The three plugin registries of a process
pub struct Registries {
    pub probes: Registry<Box<dyn Probe>>,
    pub filters: Registry<Box<dyn Filter>>,
    pub actions: Registry<Box<dyn Action>>,
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

impl Registries {
    /// Empty registries
    pub fn new() -> Self {
        Self {
            probes: Registry::new(PluginKind::Probe),
            filters: Registry::new(PluginKind::Filter),
            actions: Registry::new(PluginKind::Action),
        }
    }

    /// Registries populated with every built-in plugin
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let registries = Self::new();
        probes::register_builtins(&registries.probes)?;
        filters::register_builtins(&registries.filters)?;
        actions::register_builtins(&registries.actions)?;
        Ok(registries)
    }
}
