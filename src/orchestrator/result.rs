use serde::Serialize;
use std::collections::BTreeSet;

use super::plan::Criterion;
use crate::choquet::AggregationResult;
use crate::contracts::{ContractViolation, HermeticityDiagnosis, TierKind};
use crate::dispersion::{AdjustedScoreDetails, DispersionMetrics};

/// One aggregated node of the hierarchy.
#[derive(Debug, Clone, Serialize)]
pub struct TierNode {
    pub id: String,
    pub kind: TierKind,
    pub expected_children: BTreeSet<String>,
    pub actual_children: Vec<String>,
    pub score: f64,
    pub hermeticity: HermeticityDiagnosis,
}

/// How the node score was computed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Provenance {
    Choquet(AggregationResult),
    Dispersion(AdjustedScoreDetails),
}

#[derive(Debug, Clone, Serialize)]
pub struct TierResult {
    pub node: TierNode,
    pub coherence: f64,
    /// Spread of the child scores that were aggregated.
    pub metrics: DispersionMetrics,
    /// Everything recorded by this pass's validator, fatal or not.
    pub violations: Vec<ContractViolation>,
    pub provenance: Provenance,
}

impl TierResult {
    pub fn score(&self) -> f64 {
        self.node.score
    }

    /// No violations were recorded, informational ones included.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// This node as a child of the next tier up.
    pub fn as_criterion(&self) -> Criterion {
        Criterion::new(self.node.id.clone(), self.node.score)
    }
}
