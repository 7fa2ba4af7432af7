//! External collaborators of the impact assessment: the documentation source,
//! the ticket tracker and the source-repository inspector.
//!
//! Each collaborator is an async trait with an HTTP implementation (Confluence,
//! Jira) or a store-backed one, plus offline fallbacks. Every call made through
//! [`Collaborators`] is bounded by the configured [`RetryPolicy`].

pub mod confluence;
pub mod error;
pub mod jira;
pub mod local;
pub mod repository;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use impact_core::config::{token_from_env, Config};
use impact_core::model::DependencyEdge;
use impact_core::store::Store;

pub use confluence::ConfluenceClient;
pub use error::ConnectorError;
pub use jira::JiraClient;
pub use local::{LocalTicketTracker, StaticDocumentationSource};
pub use repository::StaticRepositoryInspector;
pub use retry::RetryPolicy;

pub const DOCUMENTATION: &str = "documentation source";
pub const TICKETS: &str = "ticket tracker";
pub const REPOSITORIES: &str = "repository inspector";

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DocumentationSource: Send + Sync {
    /// Documentation pages published for a workflow type.
    async fn fetch_documentation_by_workflow(
        &self,
        workflow_type: &str,
    ) -> Result<Vec<String>, ConnectorError>;
}

#[async_trait]
pub trait TicketTracker: Send + Sync {
    /// Create a ticket and return its id.
    async fn create_ticket(
        &self,
        system_name: &str,
        description: &str,
        impact_summary: &str,
    ) -> Result<String, ConnectorError>;

    async fn fetch_tickets_for_system(&self, system_name: &str) -> Result<Vec<String>, ConnectorError>;

    /// Create a ticket that [`find_ticket`](Self::find_ticket) can later
    /// locate by `reference`. Trackers without tagging create a plain ticket.
    async fn create_tagged_ticket(
        &self,
        reference: &str,
        system_name: &str,
        description: &str,
        impact_summary: &str,
    ) -> Result<String, ConnectorError> {
        let _ = reference;
        self.create_ticket(system_name, description, impact_summary)
            .await
    }

    /// The ticket previously created under `reference`, if the tracker can
    /// tell.
    async fn find_ticket(&self, reference: &str) -> Result<Option<String>, ConnectorError> {
        let _ = reference;
        Ok(None)
    }
}

#[async_trait]
pub trait RepositoryInspector: Send + Sync {
    /// Class ids under `path` (repository-relative, empty for all).
    async fn find_classes_in_repository(
        &self,
        repo_url: &str,
        path: &str,
    ) -> Result<Vec<String>, ConnectorError>;

    /// Dependency edges with either end in `class_ids`.
    async fn find_dependencies(
        &self,
        repo_url: &str,
        class_ids: &[String],
    ) -> Result<Vec<DependencyEdge>, ConnectorError>;
}

pub(crate) fn http_client(collaborator: &'static str) -> Result<reqwest::Client, ConnectorError> {
    reqwest::Client::builder()
        .user_agent(concat!("impact/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| ConnectorError::Transport {
            collaborator,
            message: e.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The wired set of collaborators plus the retry policy applied to them.
#[derive(Clone)]
pub struct Collaborators {
    pub documentation: Arc<dyn DocumentationSource>,
    pub tickets: Arc<dyn TicketTracker>,
    pub repositories: Arc<dyn RepositoryInspector>,
    pub retry: RetryPolicy,
}

impl Collaborators {
    /// HTTP clients for the configured endpoints, offline implementations for
    /// the rest.
    pub fn from_config(config: &Config, store: Arc<Store>) -> Result<Self, ConnectorError> {
        let documentation: Arc<dyn DocumentationSource> = match &config.confluence {
            Some(c) => Arc::new(ConfluenceClient::new(
                c.base_url.clone(),
                token_from_env(&c.token_env),
            )?),
            None => Arc::new(StaticDocumentationSource::new()),
        };
        let tickets: Arc<dyn TicketTracker> = match &config.jira {
            Some(j) => Arc::new(JiraClient::new(
                j.base_url.clone(),
                j.project_key.clone(),
                j.issue_type.clone(),
                token_from_env(&j.token_env),
            )?),
            None => Arc::new(LocalTicketTracker::new()),
        };
        tracing::debug!(
            confluence = config.confluence.is_some(),
            jira = config.jira.is_some(),
            "collaborators wired"
        );
        Ok(Self {
            documentation,
            tickets,
            repositories: Arc::new(StaticRepositoryInspector::new(store)),
            retry: RetryPolicy::from_config(&config.retry),
        })
    }

    pub async fn documentation_for(&self, workflow_type: &str) -> Result<Vec<String>, ConnectorError> {
        let docs = &self.documentation;
        self.retry
            .run(DOCUMENTATION, move || docs.fetch_documentation_by_workflow(workflow_type))
            .await
    }

    /// Create the ticket tagged with `reference` unless the tracker already
    /// has one.
    ///
    /// Creation is not idempotent on the tracker side, so a timed-out attempt
    /// is never repeated: the tracker may have accepted it. The lookup that
    /// precedes every attempt finds such a ticket on the next dispatch.
    pub async fn create_ticket(
        &self,
        reference: &str,
        system_name: &str,
        description: &str,
        impact_summary: &str,
    ) -> Result<String, ConnectorError> {
        let tickets = &self.tickets;
        self.retry
            .run_where(
                TICKETS,
                |e| e.is_transient() && !matches!(e, ConnectorError::Timeout { .. }),
                move || async move {
                    if let Some(existing) = tickets.find_ticket(reference).await? {
                        tracing::info!(reference, ticket = %existing, "ticket already exists");
                        return Ok(existing);
                    }
                    tickets
                        .create_tagged_ticket(reference, system_name, description, impact_summary)
                        .await
                },
            )
            .await
    }

    pub async fn dependencies_of(
        &self,
        repo_url: &str,
        class_ids: &[String],
    ) -> Result<Vec<DependencyEdge>, ConnectorError> {
        let repos = &self.repositories;
        self.retry
            .run(REPOSITORIES, move || repos.find_dependencies(repo_url, class_ids))
            .await
    }
}
