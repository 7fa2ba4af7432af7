//! Document store backed by a single redb file.
//!
//! # Table design
//!
//! Every collection is its own table keyed by the document's string id, with
//! the JSON-encoded document as the value:
//!
//! ```text
//! workflows            id → Workflow
//! systems              id → TradingSystem
//! components           id → Component
//! regulations          id → Regulation
//! impact_assessments   id → ImpactAssessment
//! repositories         repo url → RepositoryIndex
//! ticket_outbox        "{assessment_id}/{system_id}" → TicketRequest
//! ticket_ledger        "{assessment_id}/{system_id}" → TicketRecord
//! ```
//!
//! Each write is a single redb transaction, so a document is replaced
//! atomically. An assessment and its outbox entries are committed together.

mod tickets;

pub use tickets::{ticket_key, TicketRecord, TicketRequest};

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ImpactError, Result};
use crate::model::{
    Component, ImpactAssessment, Regulation, RepositoryIndex, TradingSystem, Workflow,
};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

type DocTable = TableDefinition<'static, &'static str, &'static [u8]>;

const WORKFLOWS: DocTable = TableDefinition::new("workflows");
const SYSTEMS: DocTable = TableDefinition::new("systems");
const COMPONENTS: DocTable = TableDefinition::new("components");
const REGULATIONS: DocTable = TableDefinition::new("regulations");
const ASSESSMENTS: DocTable = TableDefinition::new("impact_assessments");
const REPOSITORIES: DocTable = TableDefinition::new("repositories");
const TICKET_OUTBOX: DocTable = TableDefinition::new("ticket_outbox");
const TICKET_LEDGER: DocTable = TableDefinition::new("ticket_ledger");

const ALL_TABLES: [DocTable; 8] = [
    WORKFLOWS,
    SYSTEMS,
    COMPONENTS,
    REGULATIONS,
    ASSESSMENTS,
    REPOSITORIES,
    TICKET_OUTBOX,
    TICKET_LEDGER,
];

pub(crate) fn db_err(e: impl std::fmt::Display) -> ImpactError {
    ImpactError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// AssessmentFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AssessmentFilter {
    pub workflow_id: Option<String>,
    pub regulation_id: Option<String>,
}

impl AssessmentFilter {
    fn matches(&self, a: &ImpactAssessment) -> bool {
        self.workflow_id
            .as_deref()
            .map_or(true, |w| a.workflow_id == w)
            && self
                .regulation_id
                .as_deref()
                .map_or(true, |r| a.regulation_id == r)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Persistent store for reference data, assessments and ticket bookkeeping.
pub struct Store {
    db: Database,
}

impl Store {
    /// Open or create the redb database at `path`, creating every table.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        for table in ALL_TABLES {
            wt.open_table(table).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Generic document access
    // -----------------------------------------------------------------------

    fn put<T: Serialize>(&self, table: DocTable, id: &str, doc: &T) -> Result<()> {
        let value = serde_json::to_vec(doc)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut t = wt.open_table(table).map_err(db_err)?;
            t.insert(id, value.as_slice()).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, table: DocTable, id: &str) -> Result<Option<T>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let t = rt.open_table(table).map_err(db_err)?;
        match t.get(id).map_err(db_err)? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// All documents of a table in key order.
    fn list<T: DeserializeOwned>(&self, table: DocTable) -> Result<Vec<T>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let t = rt.open_table(table).map_err(db_err)?;
        let mut out = Vec::new();
        for entry in t.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            out.push(serde_json::from_slice(v.value())?);
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    pub fn upsert_workflow(&self, workflow: &Workflow) -> Result<()> {
        self.put(WORKFLOWS, &workflow.id, workflow)
    }

    pub fn workflow(&self, id: &str) -> Result<Workflow> {
        self.get(WORKFLOWS, id)?
            .ok_or_else(|| ImpactError::WorkflowNotFound(id.to_string()))
    }

    pub fn workflows(&self) -> Result<Vec<Workflow>> {
        self.list(WORKFLOWS)
    }

    pub fn workflows_by_type(&self, workflow_type: &str) -> Result<Vec<Workflow>> {
        Ok(self
            .workflows()?
            .into_iter()
            .filter(|w| w.workflow_type == workflow_type)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Trading systems
    // -----------------------------------------------------------------------

    pub fn upsert_system(&self, system: &TradingSystem) -> Result<()> {
        self.put(SYSTEMS, &system.id, system)
    }

    pub fn system(&self, id: &str) -> Result<TradingSystem> {
        self.get(SYSTEMS, id)?
            .ok_or_else(|| ImpactError::SystemNotFound(id.to_string()))
    }

    pub fn systems(&self) -> Result<Vec<TradingSystem>> {
        self.list(SYSTEMS)
    }

    /// Resolve a workflow's system reference: by name first, then by id.
    pub fn find_system(&self, name_or_id: &str) -> Result<Option<TradingSystem>> {
        let systems = self.systems()?;
        if let Some(s) = systems.iter().find(|s| s.name == name_or_id) {
            return Ok(Some(s.clone()));
        }
        Ok(systems.into_iter().find(|s| s.id == name_or_id))
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    pub fn upsert_component(&self, component: &Component) -> Result<()> {
        self.put(COMPONENTS, &component.id, component)
    }

    /// Components owned by `system_id`, in id order.
    pub fn components_for_system(&self, system_id: &str) -> Result<Vec<Component>> {
        Ok(self
            .list::<Component>(COMPONENTS)?
            .into_iter()
            .filter(|c| c.system_id == system_id)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Regulations
    // -----------------------------------------------------------------------

    pub fn upsert_regulation(&self, regulation: &Regulation) -> Result<()> {
        self.put(REGULATIONS, &regulation.id, regulation)
    }

    pub fn regulation(&self, id: &str) -> Result<Regulation> {
        self.get(REGULATIONS, id)?
            .ok_or_else(|| ImpactError::RegulationNotFound(id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Repository indexes
    // -----------------------------------------------------------------------

    pub fn upsert_repository(&self, index: &RepositoryIndex) -> Result<()> {
        self.put(REPOSITORIES, &index.repo_url, index)
    }

    pub fn repository(&self, repo_url: &str) -> Result<Option<RepositoryIndex>> {
        self.get(REPOSITORIES, repo_url)
    }

    // -----------------------------------------------------------------------
    // Impact assessments
    // -----------------------------------------------------------------------

    pub fn save_assessment(&self, assessment: &ImpactAssessment) -> Result<()> {
        self.put(ASSESSMENTS, &assessment.id, assessment)
    }

    pub fn assessment(&self, id: &str) -> Result<ImpactAssessment> {
        self.get(ASSESSMENTS, id)?
            .ok_or_else(|| ImpactError::AssessmentNotFound(id.to_string()))
    }

    /// Assessments matching `filter`, newest first.
    pub fn assessments(&self, filter: &AssessmentFilter) -> Result<Vec<ImpactAssessment>> {
        let mut out: Vec<ImpactAssessment> = self
            .list::<ImpactAssessment>(ASSESSMENTS)?
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect();
        out.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        Ok(out)
    }

    /// Most recent assessment created for the request with `fingerprint`.
    pub fn latest_by_fingerprint(&self, fingerprint: &str) -> Result<Option<ImpactAssessment>> {
        Ok(self
            .list::<ImpactAssessment>(ASSESSMENTS)?
            .into_iter()
            .filter(|a| a.fingerprint == fingerprint)
            .max_by_key(|a| a.creation_date))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssessmentRequest, AssessmentStatus};
    use chrono::Duration;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("impact.db")).unwrap();
        (dir, store)
    }

    fn workflow(id: &str, kind: &str) -> Workflow {
        Workflow {
            id: id.into(),
            name: format!("{id} flow"),
            description: String::new(),
            workflow_type: kind.into(),
            impacted_systems: vec!["OrderRouter".into()],
            last_updated: chrono::Utc::now(),
        }
    }

    fn system(id: &str, name: &str) -> TradingSystem {
        TradingSystem {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            components: vec![],
            dependencies: vec![],
            git_project_url: None,
        }
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".impact/nested/impact.db");
        Store::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn workflow_roundtrip_and_type_filter() {
        let (_dir, store) = open_tmp();
        store.upsert_workflow(&workflow("w1", "Equities Cash")).unwrap();
        store.upsert_workflow(&workflow("w2", "FX Spot")).unwrap();
        store.upsert_workflow(&workflow("w3", "Equities Cash")).unwrap();

        assert_eq!(store.workflow("w2").unwrap().workflow_type, "FX Spot");
        assert_eq!(store.workflows().unwrap().len(), 3);

        let eq: Vec<String> = store
            .workflows_by_type("Equities Cash")
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(eq, vec!["w1", "w3"]);
        assert!(store.workflows_by_type("Rates").unwrap().is_empty());
    }

    #[test]
    fn missing_documents_map_to_not_found() {
        let (_dir, store) = open_tmp();
        assert!(matches!(
            store.workflow("nope"),
            Err(ImpactError::WorkflowNotFound(_))
        ));
        assert!(matches!(
            store.regulation("nope"),
            Err(ImpactError::RegulationNotFound(_))
        ));
        assert!(matches!(
            store.assessment("nope"),
            Err(ImpactError::AssessmentNotFound(_))
        ));
        assert!(matches!(
            store.system("nope"),
            Err(ImpactError::SystemNotFound(_))
        ));
    }

    #[test]
    fn upsert_replaces_existing_document() {
        let (_dir, store) = open_tmp();
        let mut w = workflow("w1", "Equities Cash");
        store.upsert_workflow(&w).unwrap();
        w.name = "renamed".into();
        store.upsert_workflow(&w).unwrap();
        assert_eq!(store.workflows().unwrap().len(), 1);
        assert_eq!(store.workflow("w1").unwrap().name, "renamed");
    }

    #[test]
    fn find_system_prefers_name_then_id() {
        let (_dir, store) = open_tmp();
        store.upsert_system(&system("sys-a", "OrderRouter")).unwrap();
        store.upsert_system(&system("OrderRouter", "LegacyRouter")).unwrap();

        assert_eq!(
            store.find_system("OrderRouter").unwrap().unwrap().id,
            "sys-a"
        );
        assert_eq!(
            store.find_system("LegacyRouter").unwrap().unwrap().id,
            "OrderRouter"
        );
        assert_eq!(store.find_system("sys-a").unwrap().unwrap().name, "OrderRouter");
        assert!(store.find_system("Unknown").unwrap().is_none());
    }

    #[test]
    fn components_are_indexed_by_system() {
        let (_dir, store) = open_tmp();
        for (id, sys) in [("c2", "sys-a"), ("c1", "sys-a"), ("c3", "sys-b")] {
            store
                .upsert_component(&Component {
                    id: id.into(),
                    name: id.into(),
                    description: String::new(),
                    class_names: vec![],
                    system_id: sys.into(),
                    application_stack: "java".into(),
                })
                .unwrap();
        }
        let ids: Vec<String> = store
            .components_for_system("sys-a")
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn assessments_filter_and_order() {
        let (_dir, store) = open_tmp();
        let mut older = ImpactAssessment::new(&AssessmentRequest::new("w1", "r1", "a"));
        older.creation_date = chrono::Utc::now() - Duration::minutes(5);
        let newer = ImpactAssessment::new(&AssessmentRequest::new("w1", "r2", "b"));
        let other = ImpactAssessment::new(&AssessmentRequest::new("w2", "r1", "c"));
        for a in [&older, &newer, &other] {
            store.save_assessment(a).unwrap();
        }

        let by_workflow = store
            .assessments(&AssessmentFilter {
                workflow_id: Some("w1".into()),
                regulation_id: None,
            })
            .unwrap();
        assert_eq!(by_workflow.len(), 2);
        assert_eq!(by_workflow[0].id, newer.id);

        let by_both = store
            .assessments(&AssessmentFilter {
                workflow_id: Some("w1".into()),
                regulation_id: Some("r1".into()),
            })
            .unwrap();
        assert_eq!(by_both.len(), 1);
        assert_eq!(by_both[0].id, older.id);

        assert_eq!(store.assessments(&AssessmentFilter::default()).unwrap().len(), 3);
    }

    #[test]
    fn latest_by_fingerprint_picks_newest() {
        let (_dir, store) = open_tmp();
        let req = AssessmentRequest::new("w1", "r1", "change");
        let mut first = ImpactAssessment::new(&req);
        first.creation_date = chrono::Utc::now() - Duration::minutes(1);
        first.fail("boom").unwrap();
        let second = ImpactAssessment::new(&req);
        store.save_assessment(&first).unwrap();
        store.save_assessment(&second).unwrap();

        let latest = store
            .latest_by_fingerprint(&req.fingerprint())
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.status, AssessmentStatus::InProgress);
        assert!(store.latest_by_fingerprint("unknown").unwrap().is_none());
    }

    #[test]
    fn repository_index_roundtrip() {
        let (_dir, store) = open_tmp();
        let index = RepositoryIndex {
            repo_url: "https://git.example.com/oms.git".into(),
            classes: vec![],
            dependencies: vec![],
        };
        store.upsert_repository(&index).unwrap();
        assert_eq!(
            store.repository(&index.repo_url).unwrap().unwrap(),
            index
        );
        assert!(store.repository("other").unwrap().is_none());
    }
}
