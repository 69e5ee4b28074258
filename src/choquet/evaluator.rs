use std::collections::BTreeMap;
use tracing::trace;

use super::result::{AggregationResult, CriterionContribution, InteractionContribution, TraceStep};
use crate::capacity::{Coalition, FuzzyMeasureConfig};
use crate::error::{AggregationError, Result};

/// Interaction indices smaller than this are left out of the breakdown.
const INTERACTION_EPSILON: f64 = 1e-9;

/// Evaluates the discrete Choquet integral against a capacity.
///
/// Inputs are expected on the normalized [0, 1] scale; the final score is
/// clamped to [0, 1]. The capacity is only read.
#[derive(Debug, Clone, Copy)]
pub struct ChoquetEvaluator<'a> {
    config: &'a FuzzyMeasureConfig,
}

impl<'a> ChoquetEvaluator<'a> {
    pub fn new(config: &'a FuzzyMeasureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FuzzyMeasureConfig {
        self.config
    }

    /// `C_v(x) = Σ_i (x(i) − x(i+1)) · v({criteria ranked 1..i})` with the
    /// criteria sorted by descending score and `x(n+1) = 0`.
    ///
    /// # Errors
    ///
    /// - `MissingCriteria` unless the score keys equal the capacity's criteria
    /// - `InvalidInput` for non-finite scores
    pub fn aggregate(&self, scores: &BTreeMap<String, f64>) -> Result<AggregationResult> {
        let x = self.ordered_scores(scores)?;
        let criteria = self.config.criteria();
        let n = x.len();

        // Descending by score; ties keep criteria order.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| x[b].total_cmp(&x[a]));

        let mut coalition = Coalition::EMPTY;
        let mut running_total = 0.0;
        let mut computational_trace = Vec::with_capacity(n);
        for (rank, &i) in order.iter().enumerate() {
            coalition = coalition.with(i);
            let next = order.get(rank + 1).map(|&j| x[j]).unwrap_or(0.0);
            let diff = x[i] - next;
            let capacity = self.config.capacity(coalition);
            let contribution = diff * capacity;
            running_total += contribution;
            trace!(
                step = rank + 1,
                criterion = %criteria[i],
                diff,
                capacity,
                running_total,
                "choquet step"
            );
            computational_trace.push(TraceStep {
                step: rank + 1,
                criterion: criteria[i].clone(),
                score: x[i],
                diff,
                coalition: self.config.coalition_ids(coalition),
                capacity,
                contribution,
                running_total,
            });
        }

        let criterion_breakdown = self.linear_breakdown(&x);
        let interaction_breakdown = self.interaction_breakdown(&x);

        Ok(AggregationResult {
            final_score: running_total.clamp(0.0, 1.0),
            raw_score: running_total,
            linear_contribution: criterion_breakdown.iter().map(|c| c.contribution).sum(),
            interaction_contribution: interaction_breakdown.iter().map(|c| c.contribution).sum(),
            criterion_breakdown,
            interaction_breakdown,
            constitutional_compliance: self.config.compliance(),
            computational_trace,
        })
    }

    /// Scores in criteria order, after checking the key sets match.
    fn ordered_scores(&self, scores: &BTreeMap<String, f64>) -> Result<Vec<f64>> {
        let criteria = self.config.criteria();
        let missing: Vec<String> = criteria
            .iter()
            .filter(|id| !scores.contains_key(*id))
            .cloned()
            .collect();
        let unexpected: Vec<String> = scores
            .keys()
            .filter(|id| !criteria.contains(*id))
            .cloned()
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(AggregationError::MissingCriteria {
                missing,
                unexpected,
            });
        }

        criteria
            .iter()
            .map(|id| {
                let score = scores[id];
                if score.is_finite() {
                    Ok(score)
                } else {
                    Err(AggregationError::InvalidInput(format!(
                        "score for '{}' is not finite",
                        id
                    )))
                }
            })
            .collect()
    }

    fn linear_breakdown(&self, x: &[f64]) -> Vec<CriterionContribution> {
        self.config
            .criteria()
            .iter()
            .zip(self.config.shapley_vector())
            .zip(x)
            .map(|((id, &shapley_value), &score)| CriterionContribution {
                criterion: id.clone(),
                score,
                shapley_value,
                contribution: shapley_value * score,
                rationale: format!(
                    "{}: shapley weight {:.3} x score {:.3}",
                    id, shapley_value, score
                ),
            })
            .collect()
    }

    /// Pairwise terms of the 2-additive decomposition: a synergy pulls the
    /// pair towards its minimum, a redundancy towards its maximum.
    fn interaction_breakdown(&self, x: &[f64]) -> Vec<InteractionContribution> {
        self.config
            .interaction_indices()
            .filter(|(coalition, index)| coalition.len() == 2 && index.abs() > INTERACTION_EPSILON)
            .map(|(coalition, index)| {
                let pair: Vec<usize> = coalition.members().collect();
                let (a, b) = (x[pair[0]], x[pair[1]]);
                let mean = (a + b) / 2.0;
                let ids = self.config.coalition_ids(coalition);
                let (contribution, rationale) = if index > 0.0 {
                    (
                        index * (a.min(b) - mean),
                        format!(
                            "synergy between {} and {} (I = {:.4}): weakest member dominates",
                            ids[0], ids[1], index
                        ),
                    )
                } else {
                    (
                        index.abs() * (a.max(b) - mean),
                        format!(
                            "redundancy between {} and {} (I = {:.4}): strongest member dominates",
                            ids[0], ids[1], index
                        ),
                    )
                };
                InteractionContribution {
                    criteria: ids,
                    interaction_index: index,
                    contribution,
                    rationale,
                }
            })
            .collect()
    }
}
