use clap::Subcommand;
use std::path::Path;

use super::Project;
use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum TicketsSubcommand {
    /// List ticket requests that have not reached the tracker yet
    Pending {
        /// Only requests for this assessment
        #[arg(long)]
        assessment: Option<String>,
    },

    /// Send every pending ticket request now
    Drain,
}

pub fn run(root: &Path, subcmd: TicketsSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TicketsSubcommand::Pending { assessment } => pending(root, assessment.as_deref(), json),
        TicketsSubcommand::Drain => drain(root, json),
    }
}

fn pending(root: &Path, assessment: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let requests = project.store.pending_tickets(assessment)?;

    if json {
        return print_json(&requests);
    }
    if requests.is_empty() {
        println!("No pending tickets.");
        return Ok(());
    }

    let rows = requests
        .iter()
        .map(|r| {
            vec![
                r.assessment_id.clone(),
                r.system_name.clone(),
                r.attempts.to_string(),
                r.last_error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["ASSESSMENT", "SYSTEM", "ATTEMPTS", "LAST ERROR"], rows);
    Ok(())
}

fn drain(root: &Path, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let orchestrator = project.orchestrator()?;
    let report = super::runtime()?.block_on(orchestrator.dispatcher().drain())?;

    if json {
        return print_json(&report);
    }

    println!(
        "Created {} ticket(s), {} failure(s), {} assessment(s) completed",
        report.created.len(),
        report.failures.len(),
        report.completed.len()
    );
    for record in &report.created {
        println!(
            "  {}  {}/{}",
            record.ticket_id, record.assessment_id, record.system_id
        );
    }
    for failure in &report.failures {
        println!(
            "  [error] {}/{}: {}",
            failure.assessment_id, failure.system_id, failure.error
        );
    }
    Ok(())
}
