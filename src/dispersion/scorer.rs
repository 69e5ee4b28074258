use serde::Serialize;
use tracing::debug;

use super::metrics::{DispersionMetrics, Scenario, Shape};
use crate::config::EngineSettings;
use crate::error::{AggregationError, Result};

/// Floor of the adaptive factor: never more than a 50% penalty.
pub const MIN_PENALTY_FACTOR: f64 = 0.5;

const BIMODAL_SHAPE_FACTOR: f64 = 1.3;
const EXTREME_SHAPE_EXPONENT: f64 = 1.8;
const WIDE_RANGE_DI: f64 = 0.7;
const WIDE_RANGE_SLOPE: f64 = 0.3;

/// How the adaptive penalty factor was derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PenaltyDetails {
    pub base_penalty: f64,
    pub sensitivity_multiplier: f64,
    pub shape_factor: f64,
    pub penalty_strength: f64,
    pub penalty_factor: f64,
    pub scenario: Scenario,
    pub shape: Shape,
}

/// What a constant penalty would have produced, kept for audits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FixedPenaltyBaseline {
    pub fixed_penalty: f64,
    /// `1 − fixed_penalty · normalized_std`
    pub baseline_factor: f64,
    pub baseline_score: f64,
    /// adjusted − baseline
    pub delta: f64,
}

/// Full provenance of an adjusted score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedScoreDetails {
    pub weights: Vec<f64>,
    pub weighted_score: f64,
    pub adjusted_score: f64,
    pub penalty_factor: f64,
    pub coherence: f64,
    pub metrics: DispersionMetrics,
    pub penalty: PenaltyDetails,
    pub baseline: FixedPenaltyBaseline,
}

/// Scores a set of child scores with a penalty that scales with their
/// dispersion instead of a fixed constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispersionScorer {
    max_score: f64,
    base_penalty_weight: f64,
    baseline_fixed_penalty: f64,
    weight_tolerance: f64,
}

impl Default for DispersionScorer {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

impl DispersionScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            max_score: settings.max_score,
            base_penalty_weight: settings.base_penalty_weight,
            baseline_fixed_penalty: settings.baseline_fixed_penalty,
            weight_tolerance: settings.weight_tolerance,
        }
    }

    pub fn with_base_penalty_weight(mut self, weight: f64) -> Self {
        self.base_penalty_weight = weight;
        self
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    pub fn compute_metrics(&self, scores: &[f64]) -> Result<DispersionMetrics> {
        DispersionMetrics::compute(scores, self.max_score)
    }

    /// Factor in [0.5, 1.0] to multiply the weighted score by.
    ///
    /// `penalty_strength = normalized_std · base_penalty_weight ·
    /// sensitivity_multiplier · shape_factor`, and the factor is
    /// `1 − penalty_strength` clamped to [0.5, 1.0].
    pub fn compute_adaptive_penalty_factor(
        &self,
        metrics: &DispersionMetrics,
    ) -> (f64, PenaltyDetails) {
        let base_penalty = metrics.normalized_std * self.base_penalty_weight;
        let sensitivity_multiplier = metrics.scenario.sensitivity_multiplier();
        let shape_factor = if metrics.shape == Shape::Bimodal {
            BIMODAL_SHAPE_FACTOR
        } else if metrics.scenario == Scenario::ExtremeDispersion {
            1.0 + metrics.dispersion_index.powf(EXTREME_SHAPE_EXPONENT)
        } else if metrics.dispersion_index > WIDE_RANGE_DI {
            1.0 + WIDE_RANGE_SLOPE * metrics.dispersion_index
        } else {
            1.0
        };
        let penalty_strength = base_penalty * sensitivity_multiplier * shape_factor;
        let penalty_factor = (1.0 - penalty_strength).clamp(MIN_PENALTY_FACTOR, 1.0);

        let details = PenaltyDetails {
            base_penalty,
            sensitivity_multiplier,
            shape_factor,
            penalty_strength,
            penalty_factor,
            scenario: metrics.scenario,
            shape: metrics.shape,
        };
        (penalty_factor, details)
    }

    /// Weighted score times the adaptive penalty factor.
    ///
    /// Weights default to uniform `1/n`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `scores` is empty or non-finite, or if `weights`
    /// has a different length, non-finite entries, or does not sum to 1.
    pub fn compute_adjusted_score(
        &self,
        scores: &[f64],
        weights: Option<&[f64]>,
    ) -> Result<(f64, AdjustedScoreDetails)> {
        if scores.is_empty() {
            return Err(AggregationError::InvalidInput(
                "scores must not be empty".to_string(),
            ));
        }
        let n = scores.len();
        let weights: Vec<f64> = match weights {
            Some(w) => {
                if w.len() != n {
                    return Err(AggregationError::InvalidInput(format!(
                        "{} weights for {} scores",
                        w.len(),
                        n
                    )));
                }
                if w.iter().any(|x| !x.is_finite()) {
                    return Err(AggregationError::InvalidInput(
                        "weights must be finite".to_string(),
                    ));
                }
                let sum: f64 = w.iter().sum();
                if (sum - 1.0).abs() > self.weight_tolerance {
                    return Err(AggregationError::InvalidInput(format!(
                        "weights sum to {}, expected 1.0",
                        sum
                    )));
                }
                w.to_vec()
            }
            None => vec![1.0 / n as f64; n],
        };

        let metrics = self.compute_metrics(scores)?;
        let (penalty_factor, penalty) = self.compute_adaptive_penalty_factor(&metrics);

        let weighted_score: f64 = scores.iter().zip(&weights).map(|(s, w)| s * w).sum();
        let adjusted_score = weighted_score * penalty_factor;
        let coherence = if n <= 1 {
            1.0
        } else {
            (1.0 - metrics.normalized_std).max(0.0)
        };

        let baseline_factor =
            (1.0 - self.baseline_fixed_penalty * metrics.normalized_std).clamp(0.0, 1.0);
        let baseline_score = weighted_score * baseline_factor;
        let baseline = FixedPenaltyBaseline {
            fixed_penalty: self.baseline_fixed_penalty,
            baseline_factor,
            baseline_score,
            delta: adjusted_score - baseline_score,
        };

        debug!(
            n,
            scenario = %metrics.scenario,
            shape = %metrics.shape,
            penalty_factor,
            weighted_score,
            adjusted_score,
            "computed adaptive dispersion score"
        );

        let details = AdjustedScoreDetails {
            weights,
            weighted_score,
            adjusted_score,
            penalty_factor,
            coherence,
            metrics,
            penalty,
            baseline,
        };
        Ok((adjusted_score, details))
    }
}
