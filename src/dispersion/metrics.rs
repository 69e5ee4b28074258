use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AggregationError, Result};

const CONVERGENCE_CV: f64 = 0.15;
const CONVERGENCE_DI: f64 = 0.20;
const MODERATE_CV: f64 = 0.40;
const HIGH_CV: f64 = 0.60;

/// Share of values within one standard deviation for a clustered shape.
const CLUSTERED_SHARE: f64 = 0.85;
/// Median gap must exceed this multiple of the mean gap for a bimodal shape.
const BIMODAL_GAP_RATIO: f64 = 2.0;
const UNIFORM_GAP_VARIANCE: f64 = 1e-6;
const SIGMA_SLACK: f64 = 1e-12;

/// Dispersion regime of a score vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Convergence,
    Moderate,
    HighDispersion,
    ExtremeDispersion,
}

impl Scenario {
    /// `convergence` needs both a low CV and a narrow range; the rest are
    /// CV bands.
    pub fn classify(coefficient_of_variation: f64, dispersion_index: f64) -> Self {
        if coefficient_of_variation < CONVERGENCE_CV && dispersion_index < CONVERGENCE_DI {
            Self::Convergence
        } else if coefficient_of_variation < MODERATE_CV {
            Self::Moderate
        } else if coefficient_of_variation < HIGH_CV {
            Self::HighDispersion
        } else {
            Self::ExtremeDispersion
        }
    }

    /// Penalty sensitivity applied on top of the base penalty.
    pub fn sensitivity_multiplier(&self) -> f64 {
        match self {
            Self::Convergence => 0.5,
            Self::Moderate => 1.0,
            Self::HighDispersion => 1.5,
            Self::ExtremeDispersion => 2.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Convergence => "convergence",
            Self::Moderate => "moderate",
            Self::HighDispersion => "high_dispersion",
            Self::ExtremeDispersion => "extreme_dispersion",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Distribution shape of a score vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Uniform,
    Clustered,
    Bimodal,
    Dispersed,
}

impl Shape {
    /// Bimodal is checked first (n ≥ 4): a two-point distribution puts every
    /// value exactly one standard deviation from the mean, which would
    /// otherwise read as clustered.
    pub fn classify(scores: &[f64], mean: f64, std_dev: f64) -> Self {
        let mut sorted = scores.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let gaps: Vec<f64> = sorted.windows(2).map(|w| w[1] - w[0]).collect();

        if sorted.len() >= 4 {
            let mean_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
            let median_gap = gaps[sorted.len() / 2 - 1];
            if mean_gap > 0.0 && median_gap > BIMODAL_GAP_RATIO * mean_gap {
                return Self::Bimodal;
            }
        }

        let within = scores
            .iter()
            .filter(|x| (*x - mean).abs() <= std_dev + SIGMA_SLACK)
            .count();
        if within as f64 / scores.len() as f64 > CLUSTERED_SHARE {
            return Self::Clustered;
        }

        if !gaps.is_empty() {
            let mean_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
            let gap_variance =
                gaps.iter().map(|g| (g - mean_gap).powi(2)).sum::<f64>() / gaps.len() as f64;
            if gap_variance < UNIFORM_GAP_VARIANCE {
                return Self::Uniform;
            }
        }

        Self::Dispersed
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Clustered => "clustered",
            Self::Bimodal => "bimodal",
            Self::Dispersed => "dispersed",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Spread statistics of a score vector on a `[0, max_score]` domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispersionMetrics {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    /// `(max − min) / max_score`
    pub dispersion_index: f64,
    /// `std_dev / max_score`
    pub normalized_std: f64,
    pub scenario: Scenario,
    pub shape: Shape,
}

impl DispersionMetrics {
    /// # Errors
    ///
    /// `InvalidInput` for an empty vector, non-finite scores or a
    /// non-positive `max_score`.
    pub fn compute(scores: &[f64], max_score: f64) -> Result<Self> {
        if scores.is_empty() {
            return Err(AggregationError::InvalidInput(
                "scores must not be empty".to_string(),
            ));
        }
        if !(max_score > 0.0 && max_score.is_finite()) {
            return Err(AggregationError::InvalidInput(format!(
                "max score must be positive, got {}",
                max_score
            )));
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(AggregationError::InvalidInput(format!(
                "score {} is not finite",
                bad
            )));
        }

        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        let coefficient_of_variation = if mean == 0.0 { 0.0 } else { std_dev / mean };
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let dispersion_index = (max - min) / max_score;

        Ok(Self {
            mean,
            std_dev,
            coefficient_of_variation,
            dispersion_index,
            normalized_std: std_dev / max_score,
            scenario: Scenario::classify(coefficient_of_variation, dispersion_index),
            shape: Shape::classify(scores, mean, std_dev),
        })
    }
}
