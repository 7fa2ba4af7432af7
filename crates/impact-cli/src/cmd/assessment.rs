use clap::Subcommand;
use impact_core::model::{AssessmentRequest, ImpactAssessment};
use impact_core::store::AssessmentFilter;
use impact_server::OrchestratorError;
use std::path::Path;

use super::Project;
use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum AssessmentSubcommand {
    /// Show one assessment
    Show {
        /// Assessment id
        id: String,
    },

    /// List stored assessments, newest first
    List {
        /// Only assessments of this workflow
        #[arg(long)]
        workflow: Option<String>,
        /// Only assessments against this regulation
        #[arg(long)]
        regulation: Option<String>,
    },

    /// Re-run a FAILED or IN_PROGRESS assessment
    Retry {
        /// Assessment id
        id: String,
    },
}

pub fn run(root: &Path, subcmd: AssessmentSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        AssessmentSubcommand::Show { id } => show(root, &id, json),
        AssessmentSubcommand::List {
            workflow,
            regulation,
        } => list(root, workflow, regulation, json),
        AssessmentSubcommand::Retry { id } => retry(root, &id, json),
    }
}

pub fn assess(
    root: &Path,
    workflow: String,
    regulation: String,
    change: String,
    json: bool,
) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let orchestrator = project.orchestrator()?;
    let request = AssessmentRequest::new(workflow, regulation, change);
    let result = super::runtime()?.block_on(orchestrator.generate_impact_assessment(request));
    report(result, json)
}

fn retry(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let orchestrator = project.orchestrator()?;
    let result = super::runtime()?.block_on(orchestrator.retry_assessment(id));
    report(result, json)
}

/// Print the assessment; a FAILED one is printed before the error is returned.
fn report(
    result: Result<ImpactAssessment, OrchestratorError>,
    json: bool,
) -> anyhow::Result<()> {
    match result {
        Ok(assessment) => render(&assessment, json),
        Err(e) => {
            if let OrchestratorError::Failed { assessment, .. } = &e {
                render(assessment, json)?;
            }
            Err(e.into())
        }
    }
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let assessment = project.store.assessment(id)?;
    render(&assessment, json)
}

fn list(
    root: &Path,
    workflow: Option<String>,
    regulation: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let assessments = project.store.assessments(&AssessmentFilter {
        workflow_id: workflow,
        regulation_id: regulation,
    })?;

    if json {
        return print_json(&assessments);
    }
    if assessments.is_empty() {
        println!("No assessments.");
        return Ok(());
    }

    let rows = assessments
        .iter()
        .map(|a| {
            vec![
                a.id.clone(),
                a.workflow_id.clone(),
                a.regulation_id.clone(),
                a.status.to_string(),
                a.impacted_systems.len().to_string(),
                format!("{:.2}", a.automation_confidence),
                a.creation_date.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print_table(
        &[
            "ID",
            "WORKFLOW",
            "REGULATION",
            "STATUS",
            "SYSTEMS",
            "CONFIDENCE",
            "CREATED",
        ],
        rows,
    );
    Ok(())
}

fn render(assessment: &ImpactAssessment, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(assessment);
    }

    println!("Assessment {}", assessment.id);
    println!("  workflow:   {}", assessment.workflow_id);
    println!("  regulation: {}", assessment.regulation_id);
    println!("  status:     {}", assessment.status);
    println!("  confidence: {:.2}", assessment.automation_confidence);
    if let Some(error) = &assessment.error {
        println!("  error:      {error}");
    }

    if !assessment.impacted_systems.is_empty() {
        println!();
        let rows = assessment
            .impacted_systems
            .iter()
            .map(|s| {
                vec![
                    s.system_name.clone(),
                    s.impact_level.as_str().to_string(),
                    s.impacted_classes.len().to_string(),
                    s.test_cases.len().to_string(),
                    s.jira_ticket_id.clone().unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();
        print_table(&["SYSTEM", "IMPACT", "CLASSES", "TESTS", "TICKET"], rows);
    }

    if !assessment.generated_requirements.is_empty() {
        println!("\nRequirements:");
        for req in &assessment.generated_requirements {
            println!("  - {req}");
        }
    }
    for warning in &assessment.warnings {
        println!("  [warning] {warning}");
    }
    Ok(())
}
