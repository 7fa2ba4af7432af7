use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use impact_connectors::Collaborators;
use impact_core::config::Config;
use impact_core::store::Store;

use crate::orchestrator::Orchestrator;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Load `.impact/config.yaml` under `root` (defaults when absent), open
    /// the store and wire the configured collaborators.
    pub fn new(root: PathBuf) -> anyhow::Result<Self> {
        let config = Config::load_or_default(&root)?;
        let store = Arc::new(Store::open(&config.store_path(&root))?);
        let collaborators = Collaborators::from_config(&config, store.clone())?;
        let orchestrator = Orchestrator::new(store.clone(), collaborators, &config);
        Ok(Self::with_orchestrator(root, config, store, orchestrator))
    }

    /// Assemble the state from parts. Starts the ticket outbox worker when
    /// called inside a Tokio runtime and `tickets.drainIntervalSecs` is set.
    pub fn with_orchestrator(
        root: PathBuf,
        config: Config,
        store: Arc<Store>,
        orchestrator: Orchestrator,
    ) -> Self {
        let state = Self {
            root,
            config: Arc::new(config),
            store,
            orchestrator: Arc::new(orchestrator),
        };

        let interval = state.config.tickets.drain_interval_secs;
        // Guard: only spawn if inside a Tokio runtime (skipped in sync unit tests).
        if interval > 0 && tokio::runtime::Handle::try_current().is_ok() {
            state
                .orchestrator
                .dispatcher()
                .clone()
                .spawn_worker(Duration::from_secs(interval));
        }

        state
    }
}
