pub mod assessment;
pub mod config;
pub mod init;
pub mod seed;
pub mod serve;
pub mod tickets;
pub mod workflow;

use anyhow::Context;
use impact_connectors::Collaborators;
use impact_core::config::Config;
use impact_core::store::Store;
use impact_server::Orchestrator;
use std::path::Path;
use std::sync::Arc;

/// An initialized project: its config and an open store.
pub(crate) struct Project {
    pub config: Config,
    pub store: Arc<Store>,
}

impl Project {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let config = Config::load(root).context("failed to load config")?;
        let store_path = config.store_path(root);
        let store = Store::open(&store_path)
            .with_context(|| format!("failed to open store at {}", store_path.display()))?;
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    pub fn orchestrator(&self) -> anyhow::Result<Orchestrator> {
        let collaborators = Collaborators::from_config(&self.config, self.store.clone())
            .context("failed to configure collaborators")?;
        Ok(Orchestrator::new(
            self.store.clone(),
            collaborators,
            &self.config,
        ))
    }
}

pub(crate) fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}
