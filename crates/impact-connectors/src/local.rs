//! Offline collaborators used when no endpoint is configured.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::ConnectorError;
use crate::{DocumentationSource, TicketTracker};

/// Mints deterministic `LOCAL-` ticket ids and remembers them per system.
#[derive(Debug, Default)]
pub struct LocalTicketTracker {
    created: Mutex<BTreeMap<String, Vec<String>>>,
    by_reference: Mutex<BTreeMap<String, String>>,
}

impl LocalTicketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket_id(system_name: &str, description: &str, impact_summary: &str) -> String {
        let mut hasher = Sha256::new();
        for part in [system_name, description, impact_summary] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        let hex: String = digest[..5].iter().map(|b| format!("{b:02X}")).collect();
        format!("LOCAL-{hex}")
    }
}

#[async_trait]
impl TicketTracker for LocalTicketTracker {
    async fn create_ticket(
        &self,
        system_name: &str,
        description: &str,
        impact_summary: &str,
    ) -> Result<String, ConnectorError> {
        let id = Self::ticket_id(system_name, description, impact_summary);
        let mut created = self
            .created
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let ids = created.entry(system_name.to_string()).or_default();
        if !ids.contains(&id) {
            ids.push(id.clone());
        }
        Ok(id)
    }

    async fn fetch_tickets_for_system(&self, system_name: &str) -> Result<Vec<String>, ConnectorError> {
        let created = self
            .created
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(created.get(system_name).cloned().unwrap_or_default())
    }

    async fn create_tagged_ticket(
        &self,
        reference: &str,
        system_name: &str,
        description: &str,
        impact_summary: &str,
    ) -> Result<String, ConnectorError> {
        let id = self
            .create_ticket(system_name, description, impact_summary)
            .await?;
        self.by_reference
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(reference.to_string(), id.clone());
        Ok(id)
    }

    async fn find_ticket(&self, reference: &str) -> Result<Option<String>, ConnectorError> {
        Ok(self
            .by_reference
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(reference)
            .cloned())
    }
}

/// Fixed pages keyed by workflow type. Empty unless populated.
#[derive(Debug, Clone, Default)]
pub struct StaticDocumentationSource {
    pages: BTreeMap<String, Vec<String>>,
}

impl StaticDocumentationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, workflow_type: impl Into<String>, page: impl Into<String>) -> Self {
        self.pages
            .entry(workflow_type.into())
            .or_default()
            .push(page.into());
        self
    }
}

#[async_trait]
impl DocumentationSource for StaticDocumentationSource {
    async fn fetch_documentation_by_workflow(
        &self,
        workflow_type: &str,
    ) -> Result<Vec<String>, ConnectorError> {
        Ok(self.pages.get(workflow_type).cloned().unwrap_or_default())
    }
}
