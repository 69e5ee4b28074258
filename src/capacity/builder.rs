use std::collections::BTreeMap;
use tracing::debug;

use super::coalition::Coalition;
use super::measure::{complete_bounds, FuzzyMeasureConfig, ShapleyBounds};
use crate::error::{AggregationError, Result};
use crate::MAX_CRITERIA;

/// Builds capacities whose Shapley values follow a set of importance weights.
///
/// Subset tables grow as `2^n`, so the builder refuses more criteria than its
/// configured ceiling instead of degrading.
#[derive(Debug, Clone, Copy)]
pub struct CapacityBuilder {
    max_criteria: usize,
}

impl Default for CapacityBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CapacityBuilder {
    pub fn new() -> Self {
        Self {
            max_criteria: MAX_CRITERIA,
        }
    }

    /// Lower the criteria ceiling. Values above [`MAX_CRITERIA`] are capped.
    pub fn with_max_criteria(mut self, max_criteria: usize) -> Self {
        self.max_criteria = max_criteria.min(MAX_CRITERIA);
        self
    }

    pub fn max_criteria(&self) -> usize {
        self.max_criteria
    }

    /// Generate a capacity from raw importance weights.
    ///
    /// Weights are normalized to proportions, clipped into their bounds and
    /// renormalized. Each coalition gets the sum of its members' proportions
    /// plus `interaction_strength` times the sum of pairwise products, then
    /// an isotonic pass lifts every `v(A)` to at least `max_i v(A \ {i})`.
    /// Finally `v(∅) = 0` and the table is rescaled so `v(N) = 1` exactly.
    ///
    /// Renormalizing after the clip can move a proportion back outside its
    /// bound. Such a capacity is still returned; [`FuzzyMeasureConfig::compliance`]
    /// lists the breach.
    ///
    /// Criteria are ordered by id.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for empty, negative or non-finite weights, an
    ///   interaction strength outside [0, 1], or bounds naming unknown ids
    /// - `InvalidBounds` when a bound has `lower > upper` or leaves [0, 1]
    /// - `TooManyCriteria` above the ceiling
    /// - `FuzzyMeasureViolation` if the corrected table still fails validation
    pub fn generate_shapley_proportional(
        &self,
        raw_weights: &BTreeMap<String, f64>,
        bounds: &BTreeMap<String, ShapleyBounds>,
        interaction_strength: f64,
    ) -> Result<FuzzyMeasureConfig> {
        if raw_weights.is_empty() {
            return Err(AggregationError::InvalidInput(
                "raw weights must not be empty".to_string(),
            ));
        }
        if raw_weights.len() > self.max_criteria {
            return Err(AggregationError::TooManyCriteria {
                count: raw_weights.len(),
                max: self.max_criteria,
            });
        }
        if !(0.0..=1.0).contains(&interaction_strength) {
            return Err(AggregationError::InvalidInput(format!(
                "interaction strength must be in [0, 1], got {}",
                interaction_strength
            )));
        }
        if let Some((id, w)) = raw_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(AggregationError::InvalidInput(format!(
                "weight for '{}' must be finite and non-negative, got {}",
                id, w
            )));
        }
        if let Some(unknown) = bounds.keys().find(|id| !raw_weights.contains_key(*id)) {
            return Err(AggregationError::InvalidInput(format!(
                "bounds reference unknown criterion '{}'",
                unknown
            )));
        }

        let criteria: Vec<String> = raw_weights.keys().cloned().collect();
        let full_bounds = complete_bounds(&criteria, bounds)?;

        let total: f64 = raw_weights.values().sum();
        if total <= 0.0 {
            return Err(AggregationError::InvalidInput(
                "raw weights sum to zero".to_string(),
            ));
        }

        let clipped: Vec<f64> = criteria
            .iter()
            .map(|id| full_bounds[id].clip(raw_weights[id] / total))
            .collect();
        let clipped_total: f64 = clipped.iter().sum();
        if clipped_total <= 0.0 {
            return Err(AggregationError::InvalidInput(
                "weights clipped into their bounds sum to zero".to_string(),
            ));
        }
        let shapley: Vec<f64> = clipped.iter().map(|w| w / clipped_total).collect();

        let n = criteria.len();
        let (values, corrections) = proportional_capacity(&shapley, interaction_strength);
        debug!(
            criteria = n,
            interaction_strength,
            corrections,
            "generated shapley-proportional capacity"
        );

        let config = FuzzyMeasureConfig::from_parts(criteria, values, shapley, full_bounds);
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(AggregationError::FuzzyMeasureViolation(errors.join("; ")));
        }
        Ok(config)
    }
}

/// Capacity table for normalized weights plus pairwise synergy, corrected to
/// be monotone and normalized. Returns the table and the number of isotonic
/// corrections applied.
fn proportional_capacity(shapley: &[f64], interaction_strength: f64) -> (Vec<f64>, usize) {
    let n = shapley.len();
    let mut values: Vec<f64> = Coalition::all(n)
        .map(|coalition| {
            let members: Vec<usize> = coalition.members().collect();
            let base: f64 = members.iter().map(|&i| shapley[i]).sum();
            let mut synergy = 0.0;
            for (pos, &i) in members.iter().enumerate() {
                for &j in &members[pos + 1..] {
                    synergy += shapley[i] * shapley[j];
                }
            }
            base + interaction_strength * synergy
        })
        .collect();

    // Mask order visits every A \ {i} before A.
    let mut corrections = 0;
    for coalition in Coalition::all(n).skip(1) {
        let floor = coalition
            .members()
            .map(|i| values[coalition.without(i).index()])
            .fold(0.0, f64::max);
        if floor > values[coalition.index()] {
            values[coalition.index()] = floor;
            corrections += 1;
        }
    }

    let full = Coalition::full(n).index();
    values[0] = 0.0;
    let top = values[full];
    if top > 0.0 {
        for v in values.iter_mut() {
            *v = (*v / top).clamp(0.0, 1.0);
        }
    }
    values[full] = 1.0;

    (values, corrections)
}
