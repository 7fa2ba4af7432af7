use anyhow::Context;
use impact_core::seed::SeedFile;
use std::path::Path;

use super::Project;
use crate::output::print_json;

pub fn run(root: &Path, file: &Path, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let seed = SeedFile::load(file)
        .with_context(|| format!("failed to read seed file {}", file.display()))?;
    let summary = seed.apply(&project.store)?;

    if json {
        return print_json(&summary);
    }

    println!(
        "Seeded {} workflow(s), {} system(s), {} component(s), {} regulation(s), {} repository index(es)",
        summary.workflows,
        summary.systems,
        summary.components,
        summary.regulations,
        summary.repositories
    );
    for warning in &summary.warnings {
        println!("  [warning] {warning}");
    }
    Ok(())
}
