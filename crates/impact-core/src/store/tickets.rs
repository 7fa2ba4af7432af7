//! Ticket outbox and ledger.
//!
//! The outbox holds ticket requests that still have to reach the ticket
//! tracker. The ledger records every ticket the tracker accepted, keyed by
//! `(assessment, system)`, so a request is never sent twice once its ticket
//! id is known.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use super::{db_err, Store, ASSESSMENTS, TICKET_LEDGER, TICKET_OUTBOX};
use crate::error::Result;
use crate::model::ImpactAssessment;

/// Key shared by the outbox and the ledger.
pub fn ticket_key(assessment_id: &str, system_id: &str) -> String {
    format!("{assessment_id}/{system_id}")
}

/// A ticket waiting to be created for one system of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    pub assessment_id: String,
    pub system_id: String,
    pub system_name: String,
    pub description: String,
    pub impact_summary: String,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl TicketRequest {
    pub fn new(
        assessment_id: impl Into<String>,
        system_id: impl Into<String>,
        system_name: impl Into<String>,
        description: impl Into<String>,
        impact_summary: impl Into<String>,
    ) -> Self {
        Self {
            assessment_id: assessment_id.into(),
            system_id: system_id.into(),
            system_name: system_name.into(),
            description: description.into(),
            impact_summary: impact_summary.into(),
            enqueued_at: Utc::now(),
            attempts: 0,
            last_error: None,
        }
    }

    pub fn key(&self) -> String {
        ticket_key(&self.assessment_id, &self.system_id)
    }

    /// Tag attached to the tracker ticket so it can be found again when the
    /// tracker's answer was lost.
    pub fn reference(&self) -> String {
        format!("impact-{}-{}", self.assessment_id, self.system_id)
    }
}

/// A ticket the tracker accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    pub assessment_id: String,
    pub system_id: String,
    pub ticket_id: String,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Persist `assessment` and enqueue `requests` in one transaction.
    ///
    /// Requests whose ticket is already in the ledger are skipped, as are
    /// requests already sitting in the outbox (their attempt count is kept).
    /// Outbox entries of this assessment for systems no longer in `requests`
    /// are dropped.
    pub fn commit_assessment(
        &self,
        assessment: &ImpactAssessment,
        requests: &[TicketRequest],
    ) -> Result<()> {
        let value = serde_json::to_vec(assessment)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut assessments = wt.open_table(ASSESSMENTS).map_err(db_err)?;
            assessments
                .insert(assessment.id.as_str(), value.as_slice())
                .map_err(db_err)?;

            let ledger = wt.open_table(TICKET_LEDGER).map_err(db_err)?;
            let mut outbox = wt.open_table(TICKET_OUTBOX).map_err(db_err)?;

            let wanted: BTreeSet<String> = requests.iter().map(TicketRequest::key).collect();
            let mut stale = Vec::new();
            for entry in outbox.iter().map_err(db_err)? {
                let (k, v) = entry.map_err(db_err)?;
                let queued: TicketRequest = serde_json::from_slice(v.value())?;
                if queued.assessment_id == assessment.id && !wanted.contains(k.value()) {
                    stale.push(k.value().to_string());
                }
            }
            for key in &stale {
                outbox.remove(key.as_str()).map_err(db_err)?;
            }

            for request in requests {
                let key = request.key();
                if ledger.get(key.as_str()).map_err(db_err)?.is_some() {
                    continue;
                }
                if outbox.get(key.as_str()).map_err(db_err)?.is_some() {
                    continue;
                }
                let entry = serde_json::to_vec(request)?;
                outbox
                    .insert(key.as_str(), entry.as_slice())
                    .map_err(db_err)?;
            }
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    /// Outbox entries, optionally restricted to one assessment, in key order.
    pub fn pending_tickets(&self, assessment_id: Option<&str>) -> Result<Vec<TicketRequest>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let outbox = rt.open_table(TICKET_OUTBOX).map_err(db_err)?;
        let mut out = Vec::new();
        for entry in outbox.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            let request: TicketRequest = serde_json::from_slice(v.value())?;
            if assessment_id.map_or(true, |id| request.assessment_id == id) {
                out.push(request);
            }
        }
        Ok(out)
    }

    pub fn ticket_record(
        &self,
        assessment_id: &str,
        system_id: &str,
    ) -> Result<Option<TicketRecord>> {
        let key = ticket_key(assessment_id, system_id);
        let rt = self.db.begin_read().map_err(db_err)?;
        let ledger = rt.open_table(TICKET_LEDGER).map_err(db_err)?;
        match ledger.get(key.as_str()).map_err(db_err)? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Record an accepted ticket and drop its outbox entry atomically.
    ///
    /// If the ledger already holds a ticket for the key, that record wins and
    /// is returned unchanged.
    pub fn record_ticket(&self, request: &TicketRequest, ticket_id: &str) -> Result<TicketRecord> {
        let key = request.key();
        let wt = self.db.begin_write().map_err(db_err)?;
        let record = {
            let mut ledger = wt.open_table(TICKET_LEDGER).map_err(db_err)?;
            let existing: Option<TicketRecord> = match ledger.get(key.as_str()).map_err(db_err)? {
                Some(v) => Some(serde_json::from_slice(v.value())?),
                None => None,
            };
            let record = match existing {
                Some(record) => record,
                None => {
                    let record = TicketRecord {
                        assessment_id: request.assessment_id.clone(),
                        system_id: request.system_id.clone(),
                        ticket_id: ticket_id.to_string(),
                        created_at: Utc::now(),
                    };
                    let value = serde_json::to_vec(&record)?;
                    ledger
                        .insert(key.as_str(), value.as_slice())
                        .map_err(db_err)?;
                    record
                }
            };
            let mut outbox = wt.open_table(TICKET_OUTBOX).map_err(db_err)?;
            outbox.remove(key.as_str()).map_err(db_err)?;
            record
        };
        wt.commit().map_err(db_err)?;
        Ok(record)
    }

    /// Bump the attempt counter of an outbox entry and remember the error.
    pub fn record_ticket_failure(&self, request: &TicketRequest, error: &str) -> Result<()> {
        let key = request.key();
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut outbox = wt.open_table(TICKET_OUTBOX).map_err(db_err)?;
            let current: Option<TicketRequest> = match outbox.get(key.as_str()).map_err(db_err)? {
                Some(v) => Some(serde_json::from_slice(v.value())?),
                None => None,
            };
            if let Some(mut current) = current {
                current.attempts += 1;
                current.last_error = Some(error.to_string());
                let value = serde_json::to_vec(&current)?;
                outbox
                    .insert(key.as_str(), value.as_slice())
                    .map_err(db_err)?;
            }
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }
}
