//! Idempotent ticket dispatch from the outbox.
//!
//! Every outbox entry is checked against the ledger before the tracker is
//! called, and an entry leaves the outbox only in the same transaction that
//! records its ticket id. Dispatch runs are serialized so the background
//! worker and a request handler never send the same entry concurrently.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use impact_connectors::Collaborators;
use impact_core::model::{AssessmentStatus, ImpactAssessment};
use impact_core::store::{Store, TicketRecord, TicketRequest};
use impact_core::Result;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::blocking;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchFailure {
    pub assessment_id: String,
    pub system_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub created: Vec<TicketRecord>,
    pub failures: Vec<DispatchFailure>,
    /// Assessments moved to COMPLETE by this run (drain only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completed: Vec<String>,
}

#[derive(Clone)]
pub struct TicketDispatcher {
    store: Arc<Store>,
    collaborators: Collaborators,
    lock: Arc<Mutex<()>>,
}

impl TicketDispatcher {
    pub fn new(store: Arc<Store>, collaborators: Collaborators) -> Self {
        Self {
            store,
            collaborators,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Send the pending outbox entries of one assessment.
    pub async fn dispatch(&self, assessment_id: &str) -> Result<DispatchReport> {
        let _guard = self.lock.lock().await;
        self.send_pending(Some(assessment_id.to_string())).await
    }

    /// Send every pending outbox entry, then complete the assessments whose
    /// tickets now all exist.
    pub async fn drain(&self) -> Result<DispatchReport> {
        let _guard = self.lock.lock().await;
        let mut report = self.send_pending(None).await?;

        let touched: BTreeSet<String> = report
            .created
            .iter()
            .map(|r| r.assessment_id.clone())
            .collect();
        for assessment_id in touched {
            let store = self.store.clone();
            let completed = blocking(move || complete_if_ticketed(&store, &assessment_id)).await?;
            if let Some(id) = completed {
                report.completed.push(id);
            }
        }
        Ok(report)
    }

    async fn send_pending(&self, assessment_id: Option<String>) -> Result<DispatchReport> {
        let store = self.store.clone();
        let pending = blocking(move || store.pending_tickets(assessment_id.as_deref())).await?;
        let mut report = DispatchReport::default();

        for request in pending {
            match self.send_one(&request).await {
                Ok(record) => report.created.push(record),
                Err(error) => {
                    tracing::warn!(
                        assessment = %request.assessment_id,
                        system = %request.system_id,
                        attempts = request.attempts + 1,
                        %error,
                        "ticket creation failed"
                    );
                    let store = self.store.clone();
                    let failed = request.clone();
                    let message = error.clone();
                    blocking(move || store.record_ticket_failure(&failed, &message)).await?;
                    report.failures.push(DispatchFailure {
                        assessment_id: request.assessment_id,
                        system_id: request.system_id,
                        error,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Ledger first; only call the tracker when no ticket is recorded.
    async fn send_one(&self, request: &TicketRequest) -> std::result::Result<TicketRecord, String> {
        let store = self.store.clone();
        let (a, s) = (request.assessment_id.clone(), request.system_id.clone());
        let existing = blocking(move || store.ticket_record(&a, &s))
            .await
            .map_err(|e| e.to_string())?;

        let ticket_id = match existing {
            Some(record) => record.ticket_id,
            None => self
                .collaborators
                .create_ticket(
                    &request.reference(),
                    &request.system_name,
                    &request.description,
                    &request.impact_summary,
                )
                .await
                .map_err(|e| e.to_string())?,
        };

        let store = self.store.clone();
        let req = request.clone();
        let record = blocking(move || store.record_ticket(&req, &ticket_id))
            .await
            .map_err(|e| e.to_string())?;
        tracing::debug!(key = %request.key(), ticket = %record.ticket_id, "ticket recorded");
        Ok(record)
    }

    /// Drain on a fixed interval until the runtime shuts down.
    pub fn spawn_worker(self, interval: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match self.drain().await {
                    Ok(report) if !report.created.is_empty() || !report.failures.is_empty() => {
                        tracing::info!(
                            created = report.created.len(),
                            failed = report.failures.len(),
                            completed = report.completed.len(),
                            "ticket outbox drained"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "ticket outbox drain failed"),
                }
            }
        });
    }
}

/// Copy ledger ticket ids onto the assessment's system impacts.
pub(crate) fn attach_tickets(store: &Store, assessment: &mut ImpactAssessment) -> Result<()> {
    for impact in &mut assessment.impacted_systems {
        if let Some(record) = store.ticket_record(&assessment.id, &impact.system_id)? {
            impact.jira_ticket_id = Some(record.ticket_id);
        }
    }
    Ok(())
}

fn complete_if_ticketed(store: &Store, assessment_id: &str) -> Result<Option<String>> {
    let mut assessment = store.assessment(assessment_id)?;
    if assessment.status == AssessmentStatus::Complete {
        return Ok(None);
    }
    if !store.pending_tickets(Some(assessment_id))?.is_empty() {
        return Ok(None);
    }
    attach_tickets(store, &mut assessment)?;
    if assessment
        .impacted_systems
        .iter()
        .any(|s| s.jira_ticket_id.is_none())
    {
        return Ok(None);
    }
    assessment.resume()?;
    assessment.complete()?;
    store.save_assessment(&assessment)?;
    tracing::info!(assessment = %assessment.id, "assessment completed by ticket drain");
    Ok(Some(assessment.id))
}
