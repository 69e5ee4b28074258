use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::violation::Severity;
use crate::error::AggregationError;

/// Number of clusters every macro node must aggregate.
pub const MACRO_CHILD_COUNT: usize = 4;

/// The four tiers of the aggregation hierarchy.
///
/// Each tier supplies its own hermeticity check and severity; only the
/// cluster tier is scored by dispersion instead of a Choquet integral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Dimension,
    Area,
    Cluster,
    Macro,
}

impl TierKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dimension => "dimension",
            Self::Area => "area",
            Self::Cluster => "cluster",
            Self::Macro => "macro",
        }
    }

    pub fn uses_choquet(&self) -> bool {
        !matches!(self, Self::Cluster)
    }

    /// Severity of a hermeticity breach at this tier.
    pub fn hermeticity_severity(&self) -> Severity {
        match self {
            Self::Dimension | Self::Cluster => Severity::High,
            Self::Area | Self::Macro => Severity::Critical,
        }
    }

    /// Exact number of distinct children the tier requires, if any.
    pub fn required_children(&self) -> Option<usize> {
        match self {
            Self::Macro => Some(MACRO_CHILD_COUNT),
            Self::Dimension | Self::Area | Self::Cluster => None,
        }
    }

    /// Compare actual child ids against the declared set.
    pub fn validate_hermeticity(
        &self,
        actual: &[String],
        expected: &BTreeSet<String>,
    ) -> HermeticityDiagnosis {
        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for id in actual {
            if !seen.insert(id.clone()) {
                duplicates.insert(id.clone());
            }
        }

        let cardinality = match self.required_children() {
            Some(required) if seen.len() != required || expected.len() != required => {
                Some(CardinalityMismatch {
                    required,
                    declared: expected.len(),
                    actual: seen.len(),
                })
            }
            _ => None,
        };

        HermeticityDiagnosis {
            tier: *self,
            missing: expected.difference(&seen).cloned().collect(),
            extra: seen.difference(expected).cloned().collect(),
            duplicates,
            cardinality,
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TierKind {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dimension" => Ok(Self::Dimension),
            "area" => Ok(Self::Area),
            "cluster" => Ok(Self::Cluster),
            "macro" => Ok(Self::Macro),
            _ => Err(AggregationError::UnknownTierLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardinalityMismatch {
    pub required: usize,
    pub declared: usize,
    pub actual: usize,
}

/// Result of a hermeticity check for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HermeticityDiagnosis {
    pub tier: TierKind,
    pub missing: BTreeSet<String>,
    pub extra: BTreeSet<String>,
    pub duplicates: BTreeSet<String>,
    pub cardinality: Option<CardinalityMismatch>,
}

impl HermeticityDiagnosis {
    pub fn is_hermetic(&self) -> bool {
        self.missing.is_empty()
            && self.extra.is_empty()
            && self.duplicates.is_empty()
            && self.cardinality.is_none()
    }

    pub fn describe(&self) -> String {
        if self.is_hermetic() {
            return format!("{} children are hermetic", self.tier);
        }
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing {:?}", self.missing));
        }
        if !self.extra.is_empty() {
            parts.push(format!("extra {:?}", self.extra));
        }
        if !self.duplicates.is_empty() {
            parts.push(format!("duplicated {:?}", self.duplicates));
        }
        if let Some(c) = self.cardinality {
            parts.push(format!(
                "requires exactly {} children (declared {}, actual {})",
                c.required, c.declared, c.actual
            ));
        }
        format!("{} hermeticity broken: {}", self.tier, parts.join(", "))
    }
}
