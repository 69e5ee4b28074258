use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::capacity::ShapleyBounds;
use crate::config::{validate_settings, EngineSettings};
use crate::contracts::TierKind;
use crate::error::{AggregationError, Result};

/// A child id with its raw score in [0, max_score].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub score: f64,
}

impl Criterion {
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Externally declared structure and weighting of one node.
///
/// Example YAML:
/// ```yaml
/// id: AREA-01
/// kind: area
/// expected_children: [DIM-01, DIM-02, DIM-03]
/// weights: { DIM-01: 2, DIM-02: 1, DIM-03: 1 }
/// interaction_strength: 0.2
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub id: String,
    pub kind: TierKind,
    pub expected_children: BTreeSet<String>,

    /// Raw importance per child; empty means equal weights
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,

    /// Permissible Shapley range per child (Choquet tiers only)
    #[serde(default)]
    pub bounds: BTreeMap<String, ShapleyBounds>,

    /// Pairwise synergy in [0, 1] (Choquet tiers only)
    #[serde(default)]
    pub interaction_strength: f64,
}

impl NodeSpec {
    pub fn new<I, S>(id: impl Into<String>, kind: TierKind, expected_children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            kind,
            expected_children: expected_children.into_iter().map(Into::into).collect(),
            weights: BTreeMap::new(),
            bounds: BTreeMap::new(),
            interaction_strength: 0.0,
        }
    }

    pub fn with_weights<I, S>(mut self, weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.weights = weights.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    pub fn with_bounds(mut self, id: impl Into<String>, bounds: ShapleyBounds) -> Self {
        self.bounds.insert(id.into(), bounds);
        self
    }

    pub fn with_interaction_strength(mut self, strength: f64) -> Self {
        self.interaction_strength = strength;
        self
    }

    /// Raw weights for every expected child, equal when none are declared.
    pub fn effective_weights(&self) -> Result<BTreeMap<String, f64>> {
        if self.weights.is_empty() {
            return Ok(self
                .expected_children
                .iter()
                .map(|id| (id.clone(), 1.0))
                .collect());
        }
        let declared: BTreeSet<&String> = self.weights.keys().collect();
        let expected: BTreeSet<&String> = self.expected_children.iter().collect();
        if declared != expected {
            return Err(AggregationError::InvalidInput(format!(
                "node '{}': weights must cover exactly the expected children",
                self.id
            )));
        }
        Ok(self.weights.clone())
    }
}

/// Every node the orchestrator may be asked to aggregate, plus settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TierPlan {
    #[serde(default)]
    pub settings: EngineSettings,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

impl TierPlan {
    pub fn new(settings: EngineSettings, nodes: Vec<NodeSpec>) -> Self {
        Self { settings, nodes }
    }

    /// Parse a plan from YAML text and validate its settings.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let plan: TierPlan = serde_saphyr::from_str(yaml)
            .map_err(|e| AggregationError::InvalidInput(format!("invalid plan YAML: {}", e)))?;
        validate_settings(&plan.settings).map_err(|errors| {
            AggregationError::InvalidInput(format!("invalid settings: {}", errors.join("; ")))
        })?;
        Ok(plan)
    }
}
