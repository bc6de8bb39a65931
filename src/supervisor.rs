//! Supervisor: turns definitions into running monitors
//!
//! ```text
//! MonitorDefinition ──build──► Monitor ──register──► Directory (id) ──► start()
//! ```
//!
//! The HTTP layer and the shutdown sequence reach monitors only through the
//! supervisor.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, instrument};

use crate::config::{MonitorDefinition, definition_files, read_definitions_file};
use crate::error::{DefinitionError, SupervisorError};
use crate::monitor::{Directory, Monitor, MonitorId, Schedule, Thresholds};
use crate::plugins::Registries;

pub struct Supervisor {
    registries: Registries,
    directory: Directory,
}

impl Supervisor {
    pub fn new(registries: Registries) -> Self {
        Self {
            registries,
            directory: Directory::new(),
        }
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Validates `def` and constructs all of its plugins
    ///
    /// Nothing is registered or started; on error no partial state remains.
    pub fn build(&self, def: &MonitorDefinition) -> Result<Monitor, DefinitionError> {
        def.validate()?;

        let probe = self
            .registries
            .probes
            .construct(&def.probe.kind, &def.probe.params)?;

        let filter = def
            .filter
            .as_ref()
            .map(|spec| self.registries.filters.construct(&spec.kind, &spec.params))
            .transpose()?;

        let actions = def
            .actions
            .iter()
            .map(|spec| self.registries.actions.construct(&spec.kind, &spec.params))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Monitor::new(
            def.name.clone(),
            probe,
            filter,
            actions,
            Schedule {
                interval: def.interval(),
                timeout: def.timeout(),
            },
            Thresholds::new(def.min, def.max),
        ))
    }

    /// Registers a built monitor and starts it
    ///
    /// A start failure is logged, the monitor stays registered and stopped.
    pub async fn add(&self, monitor: Monitor) -> Result<Arc<Monitor>, SupervisorError> {
        let monitor = Arc::new(monitor);
        let id = self.directory.register(Arc::clone(&monitor))?;

        if let Err(e) = monitor.start().await {
            error!("monitor {id} ({}) failed to start: {e}", monitor.name());
        }
        Ok(monitor)
    }

    /// Builds, registers and starts a monitor
    #[instrument(skip_all, fields(monitor = %def.name))]
    pub async fn register(&self, def: &MonitorDefinition) -> Result<Arc<Monitor>, SupervisorError> {
        let monitor = self.build(def)?;
        self.add(monitor).await
    }

    /// Loads one definitions file
    ///
    /// Every definition is built before the first one is registered, so a
    /// bad file registers nothing.
    #[instrument(skip(self))]
    pub async fn load_file(&self, path: &Path) -> Result<Vec<Arc<Monitor>>, SupervisorError> {
        let in_file = |source: DefinitionError| DefinitionError::File {
            path: path.to_path_buf(),
            source: Box::new(source),
        };

        let defs = read_definitions_file(path).map_err(in_file)?;
        let monitors = defs
            .iter()
            .map(|def| self.build(def))
            .collect::<Result<Vec<_>, _>>()
            .map_err(in_file)?;

        let mut added = Vec::with_capacity(monitors.len());
        for monitor in monitors {
            added.push(self.add(monitor).await?);
        }

        info!("loaded {} monitors from {}", added.len(), path.display());
        Ok(added)
    }

    /// Loads every `*.yaml`/`*.yml` file of `dir` in lexical order
    ///
    /// Stops at the first bad file; files loaded before it stay loaded.
    pub async fn load_dir(&self, dir: &Path) -> Result<usize, SupervisorError> {
        let files = definition_files(dir).map_err(|source| DefinitionError::File {
            path: dir.to_path_buf(),
            source: Box::new(source),
        })?;

        let mut count = 0;
        for file in files {
            count += self.load_file(&file).await?.len();
        }

        debug!("loaded {count} monitors from {}", dir.display());
        Ok(count)
    }

    pub fn find(&self, id: MonitorId) -> Result<Arc<Monitor>, SupervisorError> {
        self.directory
            .find(id)
            .ok_or(SupervisorError::NotFound(id))
    }

    pub fn list(&self) -> Vec<Arc<Monitor>> {
        self.directory.list()
    }

    pub async fn start(&self, id: MonitorId) -> Result<Arc<Monitor>, SupervisorError> {
        let monitor = self.find(id)?;
        monitor.start().await?;
        Ok(monitor)
    }

    pub async fn stop(&self, id: MonitorId) -> Result<Arc<Monitor>, SupervisorError> {
        let monitor = self.find(id)?;
        monitor.stop().await;
        Ok(monitor)
    }

    /// Removes the monitor from the directory and stops it
    ///
    /// Once removed the monitor cannot be started by id again, so the stop
    /// is final.
    pub async fn unregister(&self, id: MonitorId) -> Result<(), SupervisorError> {
        let monitor = self.find(id)?;
        self.directory.unregister(&monitor);
        monitor.stop().await;
        info!("unregistered monitor {id} ({})", monitor.name());
        Ok(())
    }

    /// Stops every registered monitor and waits for all of them
    pub async fn shutdown(&self) {
        let monitors = self.list();
        info!("stopping {} monitors", monitors.len());
        join_all(monitors.iter().map(|monitor| monitor.stop())).await;
    }
}
