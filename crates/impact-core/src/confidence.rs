use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

/// What the assessment learned about one declared system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemEvidence {
    pub system_name: String,
    /// False when the workflow names a system the store does not know.
    pub resolved: bool,
    pub best_match_score: f64,
    pub matched_components: usize,
    pub repository_inspected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentEvidence {
    pub documentation_found: bool,
    pub systems: Vec<SystemEvidence>,
}

// ---------------------------------------------------------------------------
// ConfidenceScorer
// ---------------------------------------------------------------------------

pub trait ConfidenceScorer: Send + Sync {
    /// Confidence in [0, 1].
    fn score(&self, evidence: &AssessmentEvidence) -> f64;
}

/// Weighted mean of per-system evidence.
#[derive(Debug, Clone)]
pub struct EvidenceWeightedConfidence {
    pub match_weight: f64,
    pub repository_weight: f64,
    pub documentation_weight: f64,
}

impl Default for EvidenceWeightedConfidence {
    fn default() -> Self {
        Self {
            match_weight: 0.6,
            repository_weight: 0.25,
            documentation_weight: 0.15,
        }
    }
}

impl EvidenceWeightedConfidence {
    fn system_score(&self, system: &SystemEvidence, documentation_found: bool) -> f64 {
        if !system.resolved {
            return 0.0;
        }
        let mut s = self.match_weight * system.best_match_score.clamp(0.0, 1.0);
        if system.repository_inspected {
            s += self.repository_weight;
        }
        if documentation_found {
            s += self.documentation_weight;
        }
        s
    }
}

impl ConfidenceScorer for EvidenceWeightedConfidence {
    fn score(&self, evidence: &AssessmentEvidence) -> f64 {
        if evidence.systems.is_empty() {
            return 0.0;
        }
        let total: f64 = evidence
            .systems
            .iter()
            .map(|s| self.system_score(s, evidence.documentation_found))
            .sum();
        let mean = total / evidence.systems.len() as f64;
        if mean.is_finite() {
            mean.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(score: f64, inspected: bool) -> SystemEvidence {
        SystemEvidence {
            system_name: "sys".into(),
            resolved: true,
            best_match_score: score,
            matched_components: usize::from(score > 0.0),
            repository_inspected: inspected,
        }
    }

    #[test]
    fn full_evidence_scores_one() {
        let ev = AssessmentEvidence {
            documentation_found: true,
            systems: vec![resolved(1.0, true), resolved(1.0, true)],
        };
        let score = EvidenceWeightedConfidence::default().score(&ev);
        assert!((score - 1.0).abs() < 1e-9, "{score}");
    }

    #[test]
    fn no_systems_scores_zero() {
        let ev = AssessmentEvidence::default();
        assert_eq!(EvidenceWeightedConfidence::default().score(&ev), 0.0);
    }

    #[test]
    fn unresolved_systems_pull_the_mean_down() {
        let scorer = EvidenceWeightedConfidence::default();
        let all = AssessmentEvidence {
            documentation_found: false,
            systems: vec![resolved(1.0, false)],
        };
        let mut partial = all.clone();
        partial.systems.push(SystemEvidence {
            system_name: "ghost".into(),
            ..Default::default()
        });
        assert!((scorer.score(&all) - 0.6).abs() < 1e-9);
        assert!((scorer.score(&partial) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn score_is_always_within_unit_interval() {
        let scorer = EvidenceWeightedConfidence {
            match_weight: 2.0,
            repository_weight: 2.0,
            documentation_weight: 2.0,
        };
        for score in [-1.0, 0.0, 0.3, 1.0, 7.5, f64::NAN] {
            let ev = AssessmentEvidence {
                documentation_found: true,
                systems: vec![resolved(score, true)],
            };
            let c = scorer.score(&ev);
            assert!((0.0..=1.0).contains(&c), "{score} -> {c}");
        }
    }
}
