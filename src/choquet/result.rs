use serde::Serialize;

use crate::capacity::ConstitutionalCompliance;

/// Linear attribution of one criterion: its Shapley value times its score.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CriterionContribution {
    pub criterion: String,
    pub score: f64,
    pub shapley_value: f64,
    pub contribution: f64,
    pub rationale: String,
}

/// Pairwise synergy or redundancy term.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InteractionContribution {
    pub criteria: Vec<String>,
    pub interaction_index: f64,
    pub contribution: f64,
    pub rationale: String,
}

/// One accumulation step of the discrete Choquet sum.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TraceStep {
    pub step: usize,
    pub criterion: String,
    pub score: f64,
    /// `x(i) - x(i+1)`
    pub diff: f64,
    pub coalition: Vec<String>,
    /// `v` of the criteria ranked `1..=i`
    pub capacity: f64,
    pub contribution: f64,
    pub running_total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregationResult {
    /// Choquet sum clamped to [0, 1].
    pub final_score: f64,
    /// Choquet sum before clamping. Differs from `final_score` only when
    /// some input lies outside [0, 1].
    pub raw_score: f64,
    pub linear_contribution: f64,
    pub interaction_contribution: f64,
    pub criterion_breakdown: Vec<CriterionContribution>,
    pub interaction_breakdown: Vec<InteractionContribution>,
    pub constitutional_compliance: ConstitutionalCompliance,
    pub computational_trace: Vec<TraceStep>,
}
