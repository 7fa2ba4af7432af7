//! Jira REST v2 ticket tracker.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::ConnectorError;
use crate::{http_client, TicketTracker, TICKETS};

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<IssueRef>,
}

#[derive(Debug, Deserialize)]
struct IssueRef {
    key: String,
}

pub struct JiraClient {
    client: Client,
    base_url: String,
    project_key: String,
    issue_type: String,
    token: Option<String>,
}

impl JiraClient {
    pub fn new(
        base_url: impl Into<String>,
        project_key: impl Into<String>,
        issue_type: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, ConnectorError> {
        let base_url: String = base_url.into();
        let project_key: String = project_key.into();
        if base_url.trim().is_empty() || project_key.trim().is_empty() {
            return Err(ConnectorError::NotConfigured {
                collaborator: TICKETS,
                message: "jira.baseUrl and jira.projectKey are required".into(),
            });
        }
        Ok(Self {
            client: http_client(TICKETS)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_key,
            issue_type: issue_type.into(),
            token,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ConnectorError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ConnectorError::Http {
            collaborator: TICKETS,
            status: status.as_u16(),
            body,
        })
    }
}

/// Issue summary for a system, e.g. `[OrderRouter] Regulatory Impact: ...`.
pub fn issue_summary(system_name: &str, description: &str) -> String {
    let first_line = description.lines().next().unwrap_or_default();
    format!("[{system_name}] {first_line}")
}

/// Jira labels cannot contain whitespace.
pub fn issue_label(reference: &str) -> String {
    reference
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Quote `value` as a JQL string literal.
fn jql_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

impl JiraClient {
    async fn create_issue(
        &self,
        labels: &[String],
        system_name: &str,
        description: &str,
        impact_summary: &str,
    ) -> Result<String, ConnectorError> {
        let body = json!({
            "fields": {
                "project": { "key": self.project_key },
                "summary": issue_summary(system_name, description),
                "description": format!("{description}\n\n{impact_summary}"),
                "issuetype": { "name": self.issue_type },
                "labels": labels,
            }
        });
        let resp = self
            .request(self.client.post(format!("{}/issue", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::from_reqwest(TICKETS, e))?;
        let created: CreatedIssue = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ConnectorError::Decode {
                collaborator: TICKETS,
                message: e.to_string(),
            })?;
        tracing::info!(system = system_name, ticket = %created.key, "jira ticket created");
        Ok(created.key)
    }

    async fn search(&self, jql: &str) -> Result<Vec<String>, ConnectorError> {
        let resp = self
            .request(self.client.get(format!("{}/search", self.base_url)))
            .query(&[("jql", jql), ("fields", "key")])
            .send()
            .await
            .map_err(|e| ConnectorError::from_reqwest(TICKETS, e))?;
        let found: SearchResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ConnectorError::Decode {
                collaborator: TICKETS,
                message: e.to_string(),
            })?;
        Ok(found.issues.into_iter().map(|i| i.key).collect())
    }
}

#[async_trait]
impl TicketTracker for JiraClient {
    async fn create_ticket(
        &self,
        system_name: &str,
        description: &str,
        impact_summary: &str,
    ) -> Result<String, ConnectorError> {
        self.create_issue(&[], system_name, description, impact_summary)
            .await
    }

    async fn fetch_tickets_for_system(&self, system_name: &str) -> Result<Vec<String>, ConnectorError> {
        // Summaries start with "[<system>]"; the phrase is matched as a quoted term.
        let phrase = jql_string(&format!("[{system_name}]"));
        let jql = format!(
            "project = {} AND summary ~ {}",
            jql_string(&self.project_key),
            jql_string(&phrase)
        );
        self.search(&jql).await
    }

    async fn create_tagged_ticket(
        &self,
        reference: &str,
        system_name: &str,
        description: &str,
        impact_summary: &str,
    ) -> Result<String, ConnectorError> {
        let labels = [issue_label(reference)];
        self.create_issue(&labels, system_name, description, impact_summary)
            .await
    }

    async fn find_ticket(&self, reference: &str) -> Result<Option<String>, ConnectorError> {
        let jql = format!(
            "project = {} AND labels = {}",
            jql_string(&self.project_key),
            jql_string(&issue_label(reference))
        );
        Ok(self.search(&jql).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_uses_first_description_line() {
        assert_eq!(
            issue_summary("OrderRouter", "Update OrderRouter\nsecond line"),
            "[OrderRouter] Update OrderRouter"
        );
    }

    #[test]
    fn jql_strings_escape_quotes_and_backslashes() {
        assert_eq!(jql_string("Order\"Router"), r#""Order\"Router""#);
        assert_eq!(jql_string(r"a\b"), r#""a\\b""#);
        assert_eq!(jql_string("plain"), "\"plain\"");
    }

    #[test]
    fn labels_replace_whitespace_and_slashes() {
        assert_eq!(issue_label("impact-a 1/sys.b"), "impact-a-1-sys-b");
    }

    #[test]
    fn missing_project_is_not_configured() {
        assert!(JiraClient::new("https://jira.example.com", "", "Task", None).is_err());
    }
}
