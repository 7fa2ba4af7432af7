//! Assessment orchestration: resolve the workflow, analyze each declared
//! system, then persist the result and dispatch its tickets.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use impact_connectors::{Collaborators, TICKETS};
use impact_core::analyzer::{identify_impacted_classes, ImpactAnalyzer, KeywordOverlapAnalyzer};
use impact_core::confidence::{
    AssessmentEvidence, ConfidenceScorer, EvidenceWeightedConfidence, SystemEvidence,
};
use impact_core::config::Config;
use impact_core::model::{
    AssessmentRequest, AssessmentStatus, ImpactAssessment, ImpactLevel, ImpactThresholds,
    Regulation, SystemImpact, TradingSystem, Workflow,
};
use impact_core::requirements::{impact_summary, requirements_for_system, ticket_description};
use impact_core::store::{AssessmentFilter, Store, TicketRequest};
use impact_core::testgen::{TemplateTestGenerator, TestGenerator};
use impact_core::{ImpactError, Result};
use serde::Serialize;
use thiserror::Error;

use crate::blocking;
use crate::tickets::{attach_tickets, TicketDispatcher};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Impact(#[from] ImpactError),

    /// The assessment was persisted as FAILED.
    #[error("impact assessment {} failed: {source}", assessment.id)]
    Failed {
        assessment: Box<ImpactAssessment>,
        source: ImpactError,
    },
}

// ---------------------------------------------------------------------------
// Workflow analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowAnalysis {
    pub workflow: Workflow,
    pub systems: Vec<TradingSystem>,
    pub unresolved_systems: Vec<String>,
    pub documentation: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Per-system result gathered before the assessment is assembled.
struct SystemOutcome {
    impact: SystemImpact,
    requirements: Vec<String>,
    evidence: SystemEvidence,
    warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    store: Arc<Store>,
    collaborators: Collaborators,
    dispatcher: TicketDispatcher,
    analyzer: Arc<dyn ImpactAnalyzer>,
    test_generator: Arc<dyn TestGenerator>,
    confidence: Arc<dyn ConfidenceScorer>,
    thresholds: ImpactThresholds,
    max_concurrency: usize,
}

impl Orchestrator {
    pub fn new(store: Arc<Store>, collaborators: Collaborators, config: &Config) -> Self {
        let dispatcher = TicketDispatcher::new(store.clone(), collaborators.clone());
        Self {
            store,
            collaborators,
            dispatcher,
            analyzer: Arc::new(KeywordOverlapAnalyzer::from_config(&config.analysis)),
            test_generator: Arc::new(TemplateTestGenerator::default()),
            confidence: Arc::new(EvidenceWeightedConfidence::default()),
            thresholds: config.analysis.thresholds,
            max_concurrency: config.analysis.max_concurrency.max(1),
        }
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn ImpactAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_test_generator(mut self, generator: Arc<dyn TestGenerator>) -> Self {
        self.test_generator = generator;
        self
    }

    pub fn with_confidence_scorer(mut self, scorer: Arc<dyn ConfidenceScorer>) -> Self {
        self.confidence = scorer;
        self
    }

    pub fn dispatcher(&self) -> &TicketDispatcher {
        &self.dispatcher
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn get_impact_assessment(&self, id: &str) -> Result<ImpactAssessment> {
        let store = self.store.clone();
        let id = id.to_string();
        blocking(move || store.assessment(&id)).await
    }

    pub async fn list_assessments(&self, filter: AssessmentFilter) -> Result<Vec<ImpactAssessment>> {
        let store = self.store.clone();
        blocking(move || store.assessments(&filter)).await
    }

    /// The workflow, its resolvable systems and its documentation.
    pub async fn analyze_workflow(&self, workflow_id: &str) -> Result<WorkflowAnalysis> {
        let store = self.store.clone();
        let id = workflow_id.to_string();
        let (workflow, systems, unresolved) = blocking(move || {
            let workflow = store.workflow(&id)?;
            let (systems, unresolved) = resolve_systems(&store, &workflow)?;
            Ok((workflow, systems, unresolved))
        })
        .await?;

        let mut warnings = unresolved_warnings(&unresolved);
        let documentation = match self
            .collaborators
            .documentation_for(&workflow.workflow_type)
            .await
        {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(workflow = %workflow.id, error = %e, "documentation unavailable");
                warnings.push(format!("documentation unavailable: {e}"));
                Vec::new()
            }
        };

        Ok(WorkflowAnalysis {
            workflow,
            systems,
            unresolved_systems: unresolved,
            documentation,
            warnings,
        })
    }

    // -----------------------------------------------------------------------
    // generateImpactAssessment
    // -----------------------------------------------------------------------

    /// Validate the request, then create or resume the assessment for it.
    ///
    /// A FAILED or IN_PROGRESS assessment with the same request fingerprint
    /// is resumed under its existing id; tickets already created for it are
    /// not created again.
    pub async fn generate_impact_assessment(
        &self,
        mut request: AssessmentRequest,
    ) -> std::result::Result<ImpactAssessment, OrchestratorError> {
        request.validate()?;

        let store = self.store.clone();
        let (workflow, regulation, assessment) = blocking(move || {
            let workflow = store.workflow(&request.workflow_id)?;
            let regulation = store.regulation(&request.regulation_id)?;
            let mut assessment = match store.latest_by_fingerprint(&request.fingerprint())? {
                Some(previous) if previous.status.is_resumable() => previous,
                _ => ImpactAssessment::new(&request),
            };
            assessment.resume()?;
            store.save_assessment(&assessment)?;
            Ok((workflow, regulation, assessment))
        })
        .await?;

        tracing::info!(
            assessment = %assessment.id,
            workflow = %workflow.id,
            regulation = %regulation.id,
            "impact assessment started"
        );
        self.run(workflow, regulation, assessment).await
    }

    /// Re-run a stored assessment. COMPLETE assessments are returned as-is.
    pub async fn retry_assessment(
        &self,
        id: &str,
    ) -> std::result::Result<ImpactAssessment, OrchestratorError> {
        let store = self.store.clone();
        let id = id.to_string();
        let prepared = blocking(move || {
            let mut assessment = store.assessment(&id)?;
            if assessment.status == AssessmentStatus::Complete {
                return Ok(Err(assessment));
            }
            let workflow = store.workflow(&assessment.workflow_id)?;
            let regulation = store.regulation(&assessment.regulation_id)?;
            assessment.resume()?;
            store.save_assessment(&assessment)?;
            Ok(Ok((workflow, regulation, assessment)))
        })
        .await?;

        match prepared {
            Err(complete) => Ok(complete),
            Ok((workflow, regulation, assessment)) => {
                tracing::info!(assessment = %assessment.id, "impact assessment retried");
                self.run(workflow, regulation, assessment).await
            }
        }
    }

    async fn run(
        &self,
        workflow: Workflow,
        regulation: Regulation,
        mut assessment: ImpactAssessment,
    ) -> std::result::Result<ImpactAssessment, OrchestratorError> {
        let requests = match self.compute(&workflow, &regulation, &mut assessment).await {
            Ok(requests) => requests,
            Err(e) => return Err(self.fail(assessment, e).await),
        };

        let store = self.store.clone();
        let snapshot = assessment.clone();
        if let Err(e) = blocking(move || store.commit_assessment(&snapshot, &requests)).await {
            return Err(self.fail(assessment, e).await);
        }

        let report = match self.dispatcher.dispatch(&assessment.id).await {
            Ok(report) => report,
            Err(e) => return Err(self.fail(assessment, e).await),
        };

        let store = self.store.clone();
        let finished = blocking(move || {
            attach_tickets(&store, &mut assessment)?;
            let missing = assessment
                .impacted_systems
                .iter()
                .any(|s| s.jira_ticket_id.is_none());
            if report.failures.is_empty() && !missing {
                assessment.complete()?;
                store.save_assessment(&assessment)?;
                Ok(Ok(assessment))
            } else {
                let reason = report
                    .failures
                    .first()
                    .map(|f| f.error.clone())
                    .unwrap_or_else(|| "ticket not recorded".to_string());
                Ok(Err((assessment, reason)))
            }
        })
        .await?;

        match finished {
            Ok(assessment) => {
                tracing::info!(
                    assessment = %assessment.id,
                    systems = assessment.impacted_systems.len(),
                    confidence = assessment.automation_confidence,
                    "impact assessment complete"
                );
                Ok(assessment)
            }
            Err((assessment, reason)) => {
                let err = ImpactError::CollaboratorUnavailable {
                    collaborator: TICKETS.to_string(),
                    reason,
                };
                Err(self.fail(assessment, err).await)
            }
        }
    }

    /// Documentation, system resolution, per-system analysis and confidence.
    /// Returns the ticket requests to enqueue.
    async fn compute(
        &self,
        workflow: &Workflow,
        regulation: &Regulation,
        assessment: &mut ImpactAssessment,
    ) -> Result<Vec<TicketRequest>> {
        assessment.warnings.clear();
        assessment.impacted_systems.clear();
        assessment.generated_requirements.clear();

        let documentation_found = match self
            .collaborators
            .documentation_for(&workflow.workflow_type)
            .await
        {
            Ok(pages) => !pages.is_empty(),
            Err(e) => {
                tracing::warn!(workflow = %workflow.id, error = %e, "documentation unavailable");
                assessment
                    .warnings
                    .push(format!("documentation unavailable: {e}"));
                false
            }
        };

        let store = self.store.clone();
        let wf = workflow.clone();
        let (systems, unresolved) = blocking(move || resolve_systems(&store, &wf)).await?;
        for warning in unresolved_warnings(&unresolved) {
            tracing::warn!(workflow = %workflow.id, "{warning}");
            assessment.warnings.push(warning);
        }

        let change: Arc<str> = Arc::from(assessment.change_description.as_str());
        let pending: Vec<_> = systems
            .into_iter()
            .map(|system| self.analyze_system(system, regulation, change.clone()))
            .collect();
        let outcomes: Vec<Result<SystemOutcome>> = stream::iter(pending)
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut evidence = AssessmentEvidence {
            documentation_found,
            systems: unresolved
                .iter()
                .map(|name| SystemEvidence {
                    system_name: name.clone(),
                    ..Default::default()
                })
                .collect(),
        };
        let mut requests = Vec::new();
        for outcome in outcomes {
            let outcome = outcome?;
            requests.push(TicketRequest::new(
                assessment.id.clone(),
                outcome.impact.system_id.clone(),
                outcome.impact.system_name.clone(),
                ticket_description(&assessment.change_description),
                impact_summary(&outcome.impact.impacted_classes),
            ));
            assessment.warnings.extend(outcome.warnings);
            assessment.generated_requirements.extend(outcome.requirements);
            assessment.impacted_systems.push(outcome.impact);
            evidence.systems.push(outcome.evidence);
        }

        assessment.automation_confidence = self.confidence.score(&evidence);
        Ok(requests)
    }

    async fn analyze_system(
        &self,
        system: TradingSystem,
        regulation: &Regulation,
        change: Arc<str>,
    ) -> Result<SystemOutcome> {
        let store = self.store.clone();
        let analyzer = self.analyzer.clone();
        let system_id = system.id.clone();
        let description = change.clone();
        let analysis = blocking(move || {
            identify_impacted_classes(&store, analyzer.as_ref(), &system_id, &description)
        })
        .await?;

        let mut classes = analysis.impacted_classes.clone();
        let mut warnings = Vec::new();
        let mut repository_inspected = false;
        if let Some(repo_url) = system.git_project_url.as_deref() {
            match self.collaborators.dependencies_of(repo_url, &classes).await {
                Ok(edges) => {
                    repository_inspected = true;
                    let declared: BTreeSet<&str> =
                        analysis.impacted_classes.iter().map(String::as_str).collect();
                    for edge in edges {
                        if declared.contains(edge.to.as_str()) && !classes.contains(&edge.from) {
                            classes.push(edge.from);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(system = %system.id, error = %e, "repository inspection skipped");
                    warnings.push(format!(
                        "repository inspection skipped for {}: {e}",
                        system.name
                    ));
                }
            }
        }

        let test_cases = self.test_generator.generate_test_cases(&classes, &system.id);
        let impact_level = ImpactLevel::classify(classes.len(), &self.thresholds);
        let requirements = requirements_for_system(&system, regulation, &classes, &change);

        tracing::debug!(
            system = %system.id,
            classes = classes.len(),
            level = %impact_level,
            "system analyzed"
        );

        Ok(SystemOutcome {
            evidence: SystemEvidence {
                system_name: system.name.clone(),
                resolved: true,
                best_match_score: analysis.best_match_score(),
                matched_components: analysis.matched_components(),
                repository_inspected,
            },
            impact: SystemImpact {
                system_id: system.id,
                system_name: system.name,
                impact_level,
                impacted_classes: classes,
                test_cases,
                jira_ticket_id: None,
            },
            requirements,
            warnings,
        })
    }

    /// Persist `assessment` as FAILED and wrap `source` with it.
    async fn fail(&self, mut assessment: ImpactAssessment, source: ImpactError) -> OrchestratorError {
        tracing::warn!(assessment = %assessment.id, error = %source, "impact assessment failed");
        if let Err(e) = assessment.fail(source.to_string()) {
            return OrchestratorError::Impact(e);
        }
        let store = self.store.clone();
        let snapshot = assessment.clone();
        if let Err(e) = blocking(move || store.save_assessment(&snapshot)).await {
            tracing::warn!(assessment = %assessment.id, error = %e, "could not persist failure");
        }
        OrchestratorError::Failed {
            assessment: Box::new(assessment),
            source,
        }
    }
}

/// Resolve the workflow's system names (by name, then id) in declared
/// order. A system named twice is analyzed once.
fn resolve_systems(store: &Store, workflow: &Workflow) -> Result<(Vec<TradingSystem>, Vec<String>)> {
    let mut systems: Vec<TradingSystem> = Vec::new();
    let mut unresolved = Vec::new();
    for name in &workflow.impacted_systems {
        match store.find_system(name)? {
            Some(system) => {
                if !systems.iter().any(|s| s.id == system.id) {
                    systems.push(system);
                }
            }
            None => unresolved.push(name.clone()),
        }
    }
    Ok((systems, unresolved))
}

fn unresolved_warnings(unresolved: &[String]) -> Vec<String> {
    unresolved
        .iter()
        .map(|name| format!("system '{name}' is not registered; skipped"))
        .collect()
}
