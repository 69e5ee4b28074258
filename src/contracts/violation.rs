use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a contract violation, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The aggregation invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InvariantId {
    /// Weights sum to 1.
    #[serde(rename = "AGG-001")]
    WeightNormalization,
    /// Score within [0, max_score].
    #[serde(rename = "AGG-002")]
    ScoreBounds,
    /// Coherence within [0, 1].
    #[serde(rename = "AGG-003")]
    CoherenceBounds,
    /// Actual child ids equal the declared set.
    #[serde(rename = "AGG-004")]
    Hermeticity,
    /// Capacity monotonicity. Guaranteed when the capacity is built or
    /// identified, never re-checked per evaluation.
    #[serde(rename = "AGG-005")]
    Monotonicity,
    /// Aggregate within [min, max] of its inputs. Informational only.
    #[serde(rename = "AGG-006")]
    Convexity,
}

impl InvariantId {
    pub fn code(&self) -> &'static str {
        match self {
            Self::WeightNormalization => "AGG-001",
            Self::ScoreBounds => "AGG-002",
            Self::CoherenceBounds => "AGG-003",
            Self::Hermeticity => "AGG-004",
            Self::Monotonicity => "AGG-005",
            Self::Convexity => "AGG-006",
        }
    }

    /// Whether a breach may abort the pass when `abort_on_violation` is set.
    pub fn can_abort(&self) -> bool {
        match self {
            Self::WeightNormalization
            | Self::ScoreBounds
            | Self::CoherenceBounds
            | Self::Hermeticity => true,
            Self::Monotonicity | Self::Convexity => false,
        }
    }
}

impl fmt::Display for InvariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A recorded breach of one aggregation invariant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractViolation {
    pub contract_id: String,
    pub invariant_id: InvariantId,
    pub severity: Severity,
    pub message: String,
    pub actual: serde_json::Value,
    pub expected: serde_json::Value,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {} (actual {}, expected {})",
            self.severity,
            self.contract_id,
            self.invariant_id,
            self.message,
            self.actual,
            self.expected
        )
    }
}
