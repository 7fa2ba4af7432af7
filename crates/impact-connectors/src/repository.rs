//! Source-repository inspector backed by the ingested repository indexes.

use std::sync::Arc;

use async_trait::async_trait;
use impact_core::model::{DependencyEdge, RepositoryIndex};
use impact_core::store::Store;

use crate::error::ConnectorError;
use crate::{RepositoryInspector, REPOSITORIES};

pub struct StaticRepositoryInspector {
    store: Arc<Store>,
}

impl StaticRepositoryInspector {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    async fn index(&self, repo_url: &str) -> Result<RepositoryIndex, ConnectorError> {
        let store = self.store.clone();
        let url = repo_url.to_string();
        let found = tokio::task::spawn_blocking(move || store.repository(&url))
            .await
            .map_err(|e| ConnectorError::Transport {
                collaborator: REPOSITORIES,
                message: format!("task join error: {e}"),
            })?
            .map_err(|e| ConnectorError::Transport {
                collaborator: REPOSITORIES,
                message: e.to_string(),
            })?;
        found.ok_or_else(|| ConnectorError::NotConfigured {
            collaborator: REPOSITORIES,
            message: format!("no index for {repo_url}"),
        })
    }
}

#[async_trait]
impl RepositoryInspector for StaticRepositoryInspector {
    async fn find_classes_in_repository(
        &self,
        repo_url: &str,
        path: &str,
    ) -> Result<Vec<String>, ConnectorError> {
        let index = self.index(repo_url).await?;
        let prefix = path.trim_start_matches('/');
        Ok(index
            .classes
            .into_iter()
            .filter(|c| c.path.trim_start_matches('/').starts_with(prefix))
            .map(|c| c.id)
            .collect())
    }

    async fn find_dependencies(
        &self,
        repo_url: &str,
        class_ids: &[String],
    ) -> Result<Vec<DependencyEdge>, ConnectorError> {
        let index = self.index(repo_url).await?;
        Ok(index
            .dependencies
            .into_iter()
            .filter(|e| class_ids.contains(&e.from) || class_ids.contains(&e.to))
            .collect())
    }
}
