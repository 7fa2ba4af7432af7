//! Decide which components of a trading system a change touches.
//!
//! The decision is a strategy (`ImpactAnalyzer`) so it can be swapped
//! without touching orchestration. `KeywordOverlapAnalyzer` is the default.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::model::{Component, TradingSystem};
use crate::store::Store;
use crate::text::Tokenizer;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMatch {
    pub component_id: String,
    pub component_name: String,
    /// Fraction of the change description's keywords found in the component.
    pub score: f64,
    pub shared_keywords: Vec<String>,
    pub matched: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemAnalysis {
    pub system_id: String,
    /// Class ids of matched components, in component order, without
    /// duplicates.
    pub impacted_classes: Vec<String>,
    /// One entry per component considered, in component order.
    pub components: Vec<ComponentMatch>,
}

impl SystemAnalysis {
    /// Score of the best matching component, 0 when nothing matched.
    pub fn best_match_score(&self) -> f64 {
        self.components
            .iter()
            .filter(|c| c.matched)
            .map(|c| c.score)
            .fold(0.0, f64::max)
    }

    pub fn matched_components(&self) -> usize {
        self.components.iter().filter(|c| c.matched).count()
    }
}

// ---------------------------------------------------------------------------
// ImpactAnalyzer
// ---------------------------------------------------------------------------

pub trait ImpactAnalyzer: Send + Sync {
    /// Score every component of `system` against `change_description`.
    /// Must be deterministic for a fixed input.
    fn analyze(
        &self,
        system: &TradingSystem,
        components: &[Component],
        change_description: &str,
    ) -> SystemAnalysis;
}

/// Resolve the system and its components from the store, then run
/// `analyzer`. Components come from the component collection; a system with
/// none stored there falls back to its embedded component list.
pub fn identify_impacted_classes(
    store: &Store,
    analyzer: &dyn ImpactAnalyzer,
    system_id: &str,
    change_description: &str,
) -> Result<SystemAnalysis> {
    let system = store.system(system_id)?;
    let mut components = store.components_for_system(&system.id)?;
    if components.is_empty() {
        components = system.components.clone();
    }
    Ok(analyzer.analyze(&system, &components, change_description))
}

// ---------------------------------------------------------------------------
// KeywordOverlapAnalyzer
// ---------------------------------------------------------------------------

/// Matches a component when enough of the change description's keywords
/// appear in the component's name, description, stack or class names.
#[derive(Debug, Clone)]
pub struct KeywordOverlapAnalyzer {
    tokenizer: Tokenizer,
    min_score: f64,
    min_overlap: usize,
}

impl KeywordOverlapAnalyzer {
    pub fn new(min_score: f64, min_overlap: usize) -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            min_score,
            min_overlap,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            tokenizer: Tokenizer::with_stop_words(&config.stop_words),
            min_score: config.min_score,
            min_overlap: config.min_overlap,
        }
    }

    fn score_component(
        &self,
        component: &Component,
        description: &std::collections::BTreeSet<String>,
    ) -> ComponentMatch {
        let mut vocabulary = self.tokenizer.keywords(&component.name);
        vocabulary.extend(self.tokenizer.keywords(&component.description));
        vocabulary.extend(self.tokenizer.keywords(&component.application_stack));
        for class in &component.class_names {
            vocabulary.extend(self.tokenizer.keywords(class));
        }

        let shared: Vec<String> = description.intersection(&vocabulary).cloned().collect();
        let score = if description.is_empty() {
            0.0
        } else {
            shared.len() as f64 / description.len() as f64
        };
        let matched = shared.len() >= self.min_overlap.max(1) && score >= self.min_score;

        ComponentMatch {
            component_id: component.id.clone(),
            component_name: component.name.clone(),
            score,
            shared_keywords: shared,
            matched,
        }
    }
}

impl Default for KeywordOverlapAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl ImpactAnalyzer for KeywordOverlapAnalyzer {
    fn analyze(
        &self,
        system: &TradingSystem,
        components: &[Component],
        change_description: &str,
    ) -> SystemAnalysis {
        let description = self.tokenizer.keywords(change_description);
        let mut analysis = SystemAnalysis {
            system_id: system.id.clone(),
            ..Default::default()
        };

        for component in components {
            let m = self.score_component(component, &description);
            if m.matched {
                for class in &component.class_names {
                    if !analysis.impacted_classes.contains(class) {
                        analysis.impacted_classes.push(class.clone());
                    }
                }
            }
            analysis.components.push(m);
        }

        tracing::debug!(
            system = %system.id,
            matched = analysis.matched_components(),
            classes = analysis.impacted_classes.len(),
            "keyword analysis complete"
        );
        analysis
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
