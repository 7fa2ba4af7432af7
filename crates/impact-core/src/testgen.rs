use sha2::{Digest, Sha256};

use crate::model::hex;

/// Proposes test cases for the classes a change touches.
pub trait TestGenerator: Send + Sync {
    /// Test-case ids for `impacted_classes` of `system_id`. Must return the
    /// same ids for the same class and system.
    fn generate_test_cases(&self, impacted_classes: &[String], system_id: &str) -> Vec<String>;
}

/// Default scenario templates applied to every impacted class.
pub const DEFAULT_TEMPLATES: &[&str] = &[
    "happy_path",
    "boundary_values",
    "regulatory_validation",
    "audit_logging",
];

/// One test case per (class, template), identified by a content hash.
#[derive(Debug, Clone)]
pub struct TemplateTestGenerator {
    templates: Vec<String>,
}

impl TemplateTestGenerator {
    pub fn new<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            templates: templates.into_iter().map(Into::into).collect(),
        }
    }

    /// `TC-` plus the first 12 hex digits of SHA-256(system, class, template).
    pub fn test_case_id(system_id: &str, class: &str, template: &str) -> String {
        let mut hasher = Sha256::new();
        for part in [system_id, class, template] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hex(&hasher.finalize());
        format!("TC-{}", &digest[..12])
    }
}

impl Default for TemplateTestGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATES.iter().copied())
    }
}

impl TestGenerator for TemplateTestGenerator {
    fn generate_test_cases(&self, impacted_classes: &[String], system_id: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(impacted_classes.len() * self.templates.len());
        for class in impacted_classes {
            for template in &self.templates {
                out.push(Self::test_case_id(system_id, class, template));
            }
        }
        out
    }
}
