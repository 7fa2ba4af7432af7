//! Persisted documents: workflows, trading systems, components, regulations
//! and the impact assessments produced for them.
//!
//! Every document serializes with camelCase field names so the JSON bodies of
//! the REST surface and the stored values share one layout.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{ImpactError, Result};

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// A business process (e.g. an equities cash flow) and the systems it touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Business line tag, e.g. "Equities Cash".
    pub workflow_type: String,
    /// Names of the trading systems this workflow runs through.
    #[serde(default)]
    pub impacted_systems: Vec<String>,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSystem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_project_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub class_names: Vec<String>,
    /// Owning system. Components embedded in a system may leave it blank.
    #[serde(default)]
    pub system_id: String,
    #[serde(default)]
    pub application_stack: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Regulation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(default)]
    pub related_documents: Vec<String>,
}

/// Class layout of one source repository, ingested from the seed file and
/// served by the static repository inspector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryIndex {
    pub repo_url: String,
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    /// Fully qualified class id, e.g. `com.acme.oms.OrderValidator`.
    pub id: String,
    /// Repository-relative source path.
    pub path: String,
}

/// `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
}

// ---------------------------------------------------------------------------
// ImpactLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    /// Classify by impacted-class count. Counts strictly above
    /// `high_above` are HIGH, strictly above `medium_above` are MEDIUM.
    pub fn classify(class_count: usize, thresholds: &ImpactThresholds) -> Self {
        if class_count > thresholds.high_above {
            ImpactLevel::High
        } else if class_count > thresholds.medium_above {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImpactLevel::Low => "LOW",
            ImpactLevel::Medium => "MEDIUM",
            ImpactLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactThresholds {
    #[serde(default = "default_high_above")]
    pub high_above: usize,
    #[serde(default = "default_medium_above")]
    pub medium_above: usize,
}

fn default_high_above() -> usize {
    20
}

fn default_medium_above() -> usize {
    5
}

impl Default for ImpactThresholds {
    fn default() -> Self {
        Self {
            high_above: default_high_above(),
            medium_above: default_medium_above(),
        }
    }
}

// ---------------------------------------------------------------------------
// AssessmentStatus
// ---------------------------------------------------------------------------

/// Lifecycle of an assessment.
///
/// Transitions: `IN_PROGRESS → COMPLETE | FAILED`, and `FAILED → IN_PROGRESS`
/// when a failed assessment is resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStatus {
    InProgress,
    Complete,
    Failed,
}

impl AssessmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssessmentStatus::InProgress => "IN_PROGRESS",
            AssessmentStatus::Complete => "COMPLETE",
            AssessmentStatus::Failed => "FAILED",
        }
    }

    /// Whether a new submission of the same request should pick this
    /// assessment up again instead of starting a fresh one.
    pub fn is_resumable(self) -> bool {
        matches!(
            self,
            AssessmentStatus::InProgress | AssessmentStatus::Failed
        )
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SystemImpact
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemImpact {
    pub system_id: String,
    pub system_name: String,
    pub impact_level: ImpactLevel,
    #[serde(default)]
    pub impacted_classes: Vec<String>,
    #[serde(default)]
    pub test_cases: Vec<String>,
    /// Set once the ticket tracker has accepted the ticket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira_ticket_id: Option<String>,
}

// ---------------------------------------------------------------------------
// AssessmentRequest
// ---------------------------------------------------------------------------

/// The (workflow, regulation, change) triple an assessment is computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRequest {
    #[serde(default)]
    pub workflow_id: String,
    #[serde(default)]
    pub regulation_id: String,
    #[serde(default)]
    pub change_description: String,
}

impl AssessmentRequest {
    pub fn new(
        workflow_id: impl Into<String>,
        regulation_id: impl Into<String>,
        change_description: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            regulation_id: regulation_id.into(),
            change_description: change_description.into(),
        }
    }

    /// Reject blank fields. Surrounding whitespace is trimmed in place.
    pub fn validate(&mut self) -> Result<()> {
        self.workflow_id = self.workflow_id.trim().to_string();
        self.regulation_id = self.regulation_id.trim().to_string();
        self.change_description = self.change_description.trim().to_string();

        let mut missing = Vec::new();
        if self.workflow_id.is_empty() {
            missing.push("workflowId");
        }
        if self.regulation_id.is_empty() {
            missing.push("regulationId");
        }
        if self.change_description.is_empty() {
            missing.push("changeDescription");
        }
        if !missing.is_empty() {
            return Err(ImpactError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Stable identity of the request, used to find a previous attempt.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            &self.workflow_id,
            &self.regulation_id,
            &self.change_description,
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hex(&hasher.finalize())
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// ImpactAssessment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactAssessment {
    pub id: String,
    pub workflow_id: String,
    pub regulation_id: String,
    #[serde(default)]
    pub change_description: String,
    #[serde(default)]
    pub fingerprint: String,
    pub creation_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: AssessmentStatus,
    #[serde(default)]
    pub impacted_systems: Vec<SystemImpact>,
    #[serde(default)]
    pub generated_requirements: Vec<String>,
    #[serde(default)]
    pub automation_confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImpactAssessment {
    /// Create an empty `IN_PROGRESS` shell for a validated request.
    pub fn new(request: &AssessmentRequest) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: request.workflow_id.clone(),
            regulation_id: request.regulation_id.clone(),
            change_description: request.change_description.clone(),
            fingerprint: request.fingerprint(),
            creation_date: now,
            updated_at: now,
            status: AssessmentStatus::InProgress,
            impacted_systems: Vec::new(),
            generated_requirements: Vec::new(),
            automation_confidence: 0.0,
            warnings: Vec::new(),
            error: None,
        }
    }

    /// `IN_PROGRESS → COMPLETE`.
    pub fn complete(&mut self) -> Result<()> {
        self.transition(AssessmentStatus::Complete)?;
        self.error = None;
        Ok(())
    }

    /// `IN_PROGRESS → FAILED`, capturing the failure message.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(AssessmentStatus::Failed)?;
        self.error = Some(reason.into());
        Ok(())
    }

    /// `FAILED → IN_PROGRESS`. An assessment that is already in progress
    /// (e.g. interrupted by a restart) is resumed as-is.
    pub fn resume(&mut self) -> Result<()> {
        if self.status == AssessmentStatus::InProgress {
            self.updated_at = Utc::now();
            return Ok(());
        }
        self.transition(AssessmentStatus::InProgress)
    }

    fn transition(&mut self, to: AssessmentStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, to),
            (AssessmentStatus::InProgress, AssessmentStatus::Complete)
                | (AssessmentStatus::InProgress, AssessmentStatus::Failed)
                | (AssessmentStatus::Failed, AssessmentStatus::InProgress)
        );
        if !allowed {
            return Err(ImpactError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
