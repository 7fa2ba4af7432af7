use std::path::Path;

use super::Project;
use crate::output::{print_json, print_table};

pub fn list(root: &Path, workflow_type: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let workflows = match workflow_type {
        Some(t) => project.store.workflows_by_type(t)?,
        None => project.store.workflows()?,
    };

    if json {
        return print_json(&workflows);
    }
    if workflows.is_empty() {
        println!("No workflows.");
        return Ok(());
    }

    let rows = workflows
        .iter()
        .map(|w| {
            vec![
                w.id.clone(),
                w.name.clone(),
                w.workflow_type.clone(),
                w.impacted_systems.join(", "),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "TYPE", "SYSTEMS"], rows);
    Ok(())
}

pub fn analyze(root: &Path, workflow_id: &str, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let orchestrator = project.orchestrator()?;
    let analysis = super::runtime()?.block_on(orchestrator.analyze_workflow(workflow_id))?;

    if json {
        return print_json(&analysis);
    }

    let w = &analysis.workflow;
    println!("{} ({})", w.name, w.id);
    println!("Type: {}", w.workflow_type);
    if !w.description.is_empty() {
        println!("{}", w.description);
    }

    println!();
    if analysis.systems.is_empty() {
        println!("No registered systems.");
    } else {
        let rows = analysis
            .systems
            .iter()
            .map(|s| {
                vec![
                    s.id.clone(),
                    s.name.clone(),
                    s.components.len().to_string(),
                    s.git_project_url.clone().unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();
        print_table(&["ID", "SYSTEM", "COMPONENTS", "REPOSITORY"], rows);
    }

    if !analysis.documentation.is_empty() {
        println!("\nDocumentation: {} page(s)", analysis.documentation.len());
    }
    for warning in &analysis.warnings {
        println!("  [warning] {warning}");
    }
    Ok(())
}
