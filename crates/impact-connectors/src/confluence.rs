//! Confluence REST content search as a documentation source.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::ConnectorError;
use crate::{http_client, DocumentationSource, DOCUMENTATION};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    title: String,
    body: Option<PageBody>,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    storage: Option<Storage>,
}

#[derive(Debug, Deserialize)]
struct Storage {
    value: String,
}

/// Label a workflow type is published under: `Equities Cash` →
/// `equities-cash`.
pub fn workflow_label(workflow_type: &str) -> String {
    workflow_type
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub struct ConfluenceClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ConfluenceClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ConnectorError> {
        let base_url: String = base_url.into();
        if base_url.trim().is_empty() {
            return Err(ConnectorError::NotConfigured {
                collaborator: DOCUMENTATION,
                message: "confluence.baseUrl is empty".into(),
            });
        }
        Ok(Self {
            client: http_client(DOCUMENTATION)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl DocumentationSource for ConfluenceClient {
    async fn fetch_documentation_by_workflow(
        &self,
        workflow_type: &str,
    ) -> Result<Vec<String>, ConnectorError> {
        let cql = format!("type=page AND label=\"{}\"", workflow_label(workflow_type));
        let mut req = self
            .client
            .get(format!("{}/content/search", self.base_url))
            .query(&[("cql", cql.as_str()), ("expand", "body.storage")]);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ConnectorError::from_reqwest(DOCUMENTATION, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ConnectorError::Http {
                collaborator: DOCUMENTATION,
                status: status.as_u16(),
                body,
            });
        }

        let search: SearchResponse = resp.json().await.map_err(|e| ConnectorError::Decode {
            collaborator: DOCUMENTATION,
            message: e.to_string(),
        })?;
        let pages = search
            .results
            .into_iter()
            .map(|page| {
                page.body
                    .and_then(|b| b.storage)
                    .map(|s| s.value)
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or(page.title)
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>();
        tracing::debug!(workflow_type, pages = pages.len(), "fetched documentation");
        Ok(pages)
    }
}
