//! Bulk ingestion of reference data from a YAML seed file.
//!
//! ```yaml
//! workflows:
//!   - id: w1
//!     name: Cash equities order flow
//!     workflowType: Equities Cash
//!     impactedSystems: [OrderRouter]
//! systems:
//!   - id: sys-a
//!     name: OrderRouter
//!     gitProjectUrl: https://git.example.com/oms.git
//! components: [...]
//! regulations: [...]
//! repositories: [...]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;
use crate::model::{Component, Regulation, RepositoryIndex, TradingSystem, Workflow};
use crate::store::Store;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedFile {
    #[serde(default)]
    pub workflows: Vec<Workflow>,
    #[serde(default)]
    pub systems: Vec<TradingSystem>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub regulations: Vec<Regulation>,
    #[serde(default)]
    pub repositories: Vec<RepositoryIndex>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub workflows: usize,
    pub systems: usize,
    pub components: usize,
    pub regulations: usize,
    pub repositories: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl SeedFile {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Upsert every document into `store`. Components embedded in a system
    /// are also written to the component collection.
    pub fn apply(&self, store: &Store) -> Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        for system in &self.systems {
            store.upsert_system(system)?;
            summary.systems += 1;
            for component in &system.components {
                let mut component = component.clone();
                component.system_id = system.id.clone();
                store.upsert_component(&component)?;
                summary.components += 1;
            }
        }

        let known_systems: BTreeSet<String> = store
            .systems()?
            .into_iter()
            .flat_map(|s| [s.id, s.name])
            .collect();

        for component in &self.components {
            if !known_systems.contains(&component.system_id) {
                summary.warnings.push(format!(
                    "component '{}' references unknown system '{}'",
                    component.id, component.system_id
                ));
            }
            store.upsert_component(component)?;
            summary.components += 1;
        }

        for workflow in &self.workflows {
            for name in &workflow.impacted_systems {
                if !known_systems.contains(name) {
                    summary.warnings.push(format!(
                        "workflow '{}' references unknown system '{}'",
                        workflow.id, name
                    ));
                }
            }
            store.upsert_workflow(workflow)?;
            summary.workflows += 1;
        }

        for regulation in &self.regulations {
            store.upsert_regulation(regulation)?;
            summary.regulations += 1;
        }

        for repository in &self.repositories {
            store.upsert_repository(repository)?;
            summary.repositories += 1;
        }

        for warning in &summary.warnings {
            tracing::warn!("{warning}");
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SEED: &str = r#"
workflows:
  - id: w1
    name: Cash equities order flow
    workflowType: Equities Cash
    impactedSystems: [OrderRouter, Ghost]
systems:
  - id: sys-a
    name: OrderRouter
    gitProjectUrl: https://git.example.com/oms.git
    components:
      - id: c-val
        name: Order Validation
        classNames: [com.acme.oms.OrderValidator]
        systemId: ignored
components:
  - id: c-px
    name: Pricing
    systemId: sys-missing
regulations:
  - id: mifid-ii
    name: MiFID II
    effectiveDate: 2018-01-03
repositories:
  - repoUrl: https://git.example.com/oms.git
    classes:
      - id: com.acme.oms.OrderValidator
        path: src/main/java/com/acme/oms/OrderValidator.java
    dependencies:
      - from: com.acme.oms.Router
        to: com.acme.oms.OrderValidator
"#;

    #[test]
    fn apply_upserts_everything_and_reports_gaps() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("impact.db")).unwrap();
        let seed = SeedFile::parse(SEED).unwrap();
        let summary = seed.apply(&store).unwrap();

        assert_eq!(summary.workflows, 1);
        assert_eq!(summary.systems, 1);
        assert_eq!(summary.components, 2);
        assert_eq!(summary.regulations, 1);
        assert_eq!(summary.repositories, 1);
        assert_eq!(summary.warnings.len(), 2);
        assert!(summary.warnings.iter().any(|w| w.contains("Ghost")));
        assert!(summary.warnings.iter().any(|w| w.contains("sys-missing")));

        let embedded = store.components_for_system("sys-a").unwrap();
        assert_eq!(embedded.len(), 1);
        assert_eq!(embedded[0].id, "c-val");
        assert_eq!(
            store.regulation("mifid-ii").unwrap().effective_date,
            chrono::NaiveDate::from_ymd_opt(2018, 1, 3)
        );
        assert_eq!(
            store
                .repository("https://git.example.com/oms.git")
                .unwrap()
                .unwrap()
                .dependencies
                .len(),
            1
        );
    }

    #[test]
    fn apply_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("impact.db")).unwrap();
        let seed = SeedFile::parse(SEED).unwrap();
        seed.apply(&store).unwrap();
        seed.apply(&store).unwrap();
        assert_eq!(store.workflows().unwrap().len(), 1);
        assert_eq!(store.components_for_system("sys-a").unwrap().len(), 1);
    }

    #[test]
    fn empty_seed_is_valid() {
        let seed = SeedFile::parse("{}").unwrap();
        assert!(seed.workflows.is_empty());
    }
}
