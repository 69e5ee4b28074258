use serde::{Deserialize, Serialize};

use crate::contracts::TierKind;
use crate::MAX_SCORE;

/// Engine-wide numeric settings.
///
/// Every field is optional in YAML; missing fields take their defaults.
///
/// Example YAML:
/// ```yaml
/// max_score: 3.0
/// abort_on_violation: true
/// base_penalty_weight: 0.35
/// ceilings:
///   dimension: 6
///   area: 10
///   macro_level: 4
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct EngineSettings {
    /// Upper end of the raw score domain (default: 3.0)
    pub max_score: f64,

    /// Tolerance for the weight-sum check (default: 1e-6)
    pub weight_tolerance: f64,

    /// Slack allowed around [min, max] of the inputs for the convexity check (default: 1e-9)
    pub convexity_epsilon: f64,

    /// Raise on fatal contract violations instead of only recording them
    pub abort_on_violation: bool,

    /// Weight applied to the normalized standard deviation in the adaptive penalty
    pub base_penalty_weight: f64,

    /// Constant penalty used for the audit baseline comparison
    pub baseline_fixed_penalty: f64,

    /// Criteria-per-capacity ceilings for the Choquet tiers
    pub ceilings: TierCeilings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_score: MAX_SCORE,
            weight_tolerance: 1e-6,
            convexity_epsilon: 1e-9,
            abort_on_violation: true,
            base_penalty_weight: 0.35,
            baseline_fixed_penalty: 0.3,
            ceilings: TierCeilings::default(),
        }
    }
}

/// Maximum number of criteria per node for the tiers that enumerate subsets.
///
/// Cluster nodes are scored by dispersion and have no subset table.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct TierCeilings {
    pub dimension: usize,
    pub area: usize,
    pub macro_level: usize,
}

impl Default for TierCeilings {
    fn default() -> Self {
        Self {
            dimension: 6,
            area: 10,
            macro_level: 4,
        }
    }
}

impl TierCeilings {
    /// Ceiling for a tier kind, `None` for tiers without a capacity.
    pub fn for_kind(&self, kind: TierKind) -> Option<usize> {
        match kind {
            TierKind::Dimension => Some(self.dimension),
            TierKind::Area => Some(self.area),
            TierKind::Macro => Some(self.macro_level),
            TierKind::Cluster => None,
        }
    }

    pub(crate) fn all(&self) -> [(&'static str, usize); 3] {
        [
            ("dimension", self.dimension),
            ("area", self.area),
            ("macro_level", self.macro_level),
        ]
    }
}
