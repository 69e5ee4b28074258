use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use super::plan::{Criterion, NodeSpec, TierPlan};
use super::result::{Provenance, TierNode, TierResult};
use crate::capacity::{CapacityBuilder, FuzzyMeasureConfig};
use crate::choquet::ChoquetEvaluator;
use crate::config::{validate_settings, EngineSettings};
use crate::contracts::ContractValidator;
use crate::dispersion::{DispersionMetrics, DispersionScorer};
use crate::error::{AggregationError, Result};

/// A declared node with everything that can be computed ahead of scoring.
#[derive(Debug)]
struct PreparedNode {
    spec: NodeSpec,
    /// Present for Choquet tiers only.
    capacity: Option<Arc<FuzzyMeasureConfig>>,
    /// Normalized raw weights, used by the cluster tier.
    weights: BTreeMap<String, f64>,
}

/// Composes capacity evaluation, dispersion scoring and contract checks for
/// each node of a tier plan.
///
/// Capacities are built once in [`AggregationOrchestrator::new`] and shared
/// read-only afterwards. Every call to [`AggregationOrchestrator::aggregate_node`]
/// uses its own [`ContractValidator`], so independent nodes can be scored
/// concurrently.
#[derive(Debug)]
pub struct AggregationOrchestrator {
    settings: EngineSettings,
    scorer: DispersionScorer,
    nodes: HashMap<String, PreparedNode>,
}

impl AggregationOrchestrator {
    /// Validate the plan and build one capacity per Choquet node.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for invalid settings, duplicate node ids, nodes
    ///   without children, a macro node without exactly four children, or
    ///   weights that do not match the children
    /// - any capacity construction error, e.g. `TooManyCriteria` when a node
    ///   exceeds its tier ceiling
    pub fn new(plan: TierPlan) -> Result<Self> {
        let TierPlan { settings, nodes } = plan;
        validate_settings(&settings).map_err(|errors| {
            AggregationError::InvalidInput(format!("invalid settings: {}", errors.join("; ")))
        })?;

        let mut prepared = HashMap::with_capacity(nodes.len());
        for spec in nodes {
            if prepared.contains_key(&spec.id) {
                return Err(AggregationError::InvalidInput(format!(
                    "duplicate node id '{}'",
                    spec.id
                )));
            }
            let node = Self::prepare(&settings, spec)?;
            prepared.insert(node.spec.id.clone(), node);
        }

        debug!(nodes = prepared.len(), "prepared tier plan");
        Ok(Self {
            scorer: DispersionScorer::from_settings(&settings),
            settings,
            nodes: prepared,
        })
    }

    fn prepare(settings: &EngineSettings, spec: NodeSpec) -> Result<PreparedNode> {
        if spec.expected_children.is_empty() {
            return Err(AggregationError::InvalidInput(format!(
                "node '{}' declares no children",
                spec.id
            )));
        }
        if let Some(required) = spec.kind.required_children() {
            if spec.expected_children.len() != required {
                return Err(AggregationError::InvalidInput(format!(
                    "{} node '{}' must declare exactly {} children, got {}",
                    spec.kind,
                    spec.id,
                    required,
                    spec.expected_children.len()
                )));
            }
        }
        let raw = spec.effective_weights()?;

        let total: f64 = raw.values().sum();
        if !total.is_finite() || total <= 0.0 || raw.values().any(|w| *w < 0.0) {
            return Err(AggregationError::InvalidInput(format!(
                "node '{}': weights must be non-negative with a positive sum",
                spec.id
            )));
        }
        let weights = raw.iter().map(|(id, w)| (id.clone(), w / total)).collect();

        // Cluster nodes have no ceiling and no capacity.
        let capacity = match settings.ceilings.for_kind(spec.kind) {
            Some(ceiling) => {
                let config = CapacityBuilder::new()
                    .with_max_criteria(ceiling)
                    .generate_shapley_proportional(&raw, &spec.bounds, spec.interaction_strength)?;
                Some(Arc::new(config))
            }
            None => None,
        };

        Ok(PreparedNode {
            spec,
            capacity,
            weights,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Declared node ids, sorted.
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn node_spec(&self, node_id: &str) -> Option<&NodeSpec> {
        self.nodes.get(node_id).map(|n| &n.spec)
    }

    /// Shared capacity of a Choquet node.
    pub fn capacity(&self, node_id: &str) -> Option<Arc<FuzzyMeasureConfig>> {
        self.nodes.get(node_id).and_then(|n| n.capacity.clone())
    }

    /// Aggregate one node from its child scores.
    ///
    /// Hermeticity is checked first. Duplicate ids keep their first score and
    /// undeclared ids are ignored. Child scores must lie in `[0, max_score]`.
    /// Choquet tiers need a score for every declared child; the cluster tier
    /// scores whichever children are present. The result is then checked for
    /// weight normalization, score and coherence bounds, and convexity.
    ///
    /// # Errors
    ///
    /// - `UnknownNode` if `node_id` is not in the plan
    /// - `ContractViolation` for a fatal breach when aborting is enabled
    /// - `MissingCriteria` when a Choquet node lacks child scores
    /// - `InvalidInput` for non-finite scores or a node with no usable children
    pub fn aggregate_node(&self, node_id: &str, children: &[Criterion]) -> Result<TierResult> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| AggregationError::UnknownNode(node_id.to_string()))?;
        let spec = &node.spec;
        debug!(node = node_id, tier = %spec.kind, children = children.len(), "aggregating node");

        let mut validator = ContractValidator::new(spec.kind, self.settings.abort_on_violation)
            .with_settings(&self.settings);

        let actual_children: Vec<String> = children.iter().map(|c| c.id.clone()).collect();
        let hermeticity =
            validator.validate_hermeticity(&actual_children, &spec.expected_children)?;

        let mut scores: BTreeMap<String, f64> = BTreeMap::new();
        for child in children {
            if spec.expected_children.contains(&child.id) {
                scores.entry(child.id.clone()).or_insert(child.score);
            }
        }
        if let Some((id, score)) = scores.iter().find(|(_, s)| !s.is_finite()) {
            return Err(AggregationError::InvalidInput(format!(
                "score for '{}' is not finite: {}",
                id, score
            )));
        }
        validator.validate_child_scores(&scores)?;
        let inputs: Vec<f64> = scores.values().copied().collect();

        let (score, provenance) = match &node.capacity {
            Some(capacity) => self.score_choquet(capacity, &scores, &mut validator)?,
            None => self.score_dispersion(node, &scores, &mut validator)?,
        };

        let metrics = self.scorer.compute_metrics(&inputs)?;
        let coherence = coherence_of(&metrics, inputs.len());

        validator.validate_score_bounds(score)?;
        validator.validate_coherence_bounds(coherence)?;
        validator.validate_convexity(score, &inputs);

        let violations = validator.take_violations();
        debug!(
            node = node_id,
            score,
            coherence,
            violations = violations.len(),
            "aggregated node"
        );

        Ok(TierResult {
            node: TierNode {
                id: spec.id.clone(),
                kind: spec.kind,
                expected_children: spec.expected_children.clone(),
                actual_children,
                score,
                hermeticity,
            },
            coherence,
            metrics,
            violations,
            provenance,
        })
    }

    /// Aggregate independent nodes in parallel. Results keep request order.
    pub fn aggregate_batch(
        &self,
        requests: &[(String, Vec<Criterion>)],
    ) -> Vec<Result<TierResult>> {
        requests
            .par_iter()
            .map(|(node_id, children)| self.aggregate_node(node_id, children))
            .collect()
    }

    fn score_choquet(
        &self,
        capacity: &FuzzyMeasureConfig,
        scores: &BTreeMap<String, f64>,
        validator: &mut ContractValidator,
    ) -> Result<(f64, Provenance)> {
        validator.validate_weight_normalization(capacity.shapley_vector())?;

        let max_score = self.settings.max_score;
        let normalized: BTreeMap<String, f64> = scores
            .iter()
            .map(|(id, s)| (id.clone(), s / max_score))
            .collect();
        let result = ChoquetEvaluator::new(capacity).aggregate(&normalized)?;
        // Unclamped, so out-of-domain inputs stay visible to the score check.
        Ok((result.raw_score * max_score, Provenance::Choquet(result)))
    }

    fn score_dispersion(
        &self,
        node: &PreparedNode,
        scores: &BTreeMap<String, f64>,
        validator: &mut ContractValidator,
    ) -> Result<(f64, Provenance)> {
        if scores.is_empty() {
            return Err(AggregationError::InvalidInput(format!(
                "node '{}' has no declared children to score",
                node.spec.id
            )));
        }

        // Renormalize over the children actually present.
        let raw: Vec<f64> = scores
            .keys()
            .map(|id| node.weights.get(id).copied().unwrap_or(0.0))
            .collect();
        let present: f64 = raw.iter().sum();
        let weights: Vec<f64> = if present > 0.0 {
            raw.iter().map(|w| w / present).collect()
        } else {
            vec![1.0 / scores.len() as f64; scores.len()]
        };
        validator.validate_weight_normalization(&weights)?;

        let values: Vec<f64> = scores.values().copied().collect();
        let (score, details) = self.scorer.compute_adjusted_score(&values, Some(&weights))?;
        Ok((score, Provenance::Dispersion(details)))
    }
}

fn coherence_of(metrics: &DispersionMetrics, n: usize) -> f64 {
    if n <= 1 {
        1.0
    } else {
        (1.0 - metrics.normalized_std).max(0.0)
    }
}
