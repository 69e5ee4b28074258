use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use super::tier::{HermeticityDiagnosis, TierKind};
use super::violation::{ContractViolation, InvariantId, Severity};
use crate::config::EngineSettings;
use crate::error::{AggregationError, Result};

/// Create a contract validator for one aggregation pass at `level`.
///
/// `level` is one of "dimension", "area", "cluster" or "macro".
pub fn create_aggregation_contract(
    level: &str,
    abort_on_violation: bool,
) -> Result<ContractValidator> {
    let kind: TierKind = level.parse()?;
    Ok(ContractValidator::new(kind, abort_on_violation))
}

/// Per-severity violation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ViolationSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ViolationSummary {
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Accumulates contract violations for exactly one aggregation pass.
///
/// Each `validate_*` call records a violation when its invariant fails. With
/// `abort_on_violation` set, AGG-001..AGG-004 additionally return
/// `AggregationError::ContractViolation` after recording. AGG-006 never
/// aborts. Create one validator per (node, pass) and drop or clear it
/// afterwards; it is not meant to be shared.
#[derive(Debug, Clone)]
pub struct ContractValidator {
    contract_id: String,
    level: TierKind,
    abort_on_violation: bool,
    max_score: f64,
    weight_tolerance: f64,
    convexity_epsilon: f64,
    violations: Vec<ContractViolation>,
}

impl ContractValidator {
    pub fn new(level: TierKind, abort_on_violation: bool) -> Self {
        let defaults = EngineSettings::default();
        Self {
            contract_id: format!("aggregation.{}", level),
            level,
            abort_on_violation,
            max_score: defaults.max_score,
            weight_tolerance: defaults.weight_tolerance,
            convexity_epsilon: defaults.convexity_epsilon,
            violations: Vec::new(),
        }
    }

    /// Take score ceiling and tolerances from engine settings.
    pub fn with_settings(mut self, settings: &EngineSettings) -> Self {
        self.max_score = settings.max_score;
        self.weight_tolerance = settings.weight_tolerance;
        self.convexity_epsilon = settings.convexity_epsilon;
        self
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    pub fn level(&self) -> TierKind {
        self.level
    }

    pub fn abort_on_violation(&self) -> bool {
        self.abort_on_violation
    }

    /// AGG-001: weights sum to 1 within tolerance.
    pub fn validate_weight_normalization(&mut self, weights: &[f64]) -> Result<bool> {
        let sum: f64 = weights.iter().sum();
        if sum.is_finite() && (sum - 1.0).abs() <= self.weight_tolerance {
            return Ok(true);
        }
        let violation = self.violation(
            InvariantId::WeightNormalization,
            Severity::Critical,
            format!("weights sum to {:.9}, expected 1.0", sum),
            json!(sum),
            json!(1.0),
            [
                ("weights".to_string(), json!(weights)),
                ("tolerance".to_string(), json!(self.weight_tolerance)),
            ],
        );
        self.record(violation)?;
        Ok(false)
    }

    /// AGG-002: `0 ≤ score ≤ max_score`.
    pub fn validate_score_bounds(&mut self, score: f64) -> Result<bool> {
        if (0.0..=self.max_score).contains(&score) {
            return Ok(true);
        }
        let violation = self.violation(
            InvariantId::ScoreBounds,
            Severity::High,
            format!("score {} outside [0, {}]", score, self.max_score),
            json!(score),
            json!([0.0, self.max_score]),
            [],
        );
        self.record(violation)?;
        Ok(false)
    }

    /// AGG-002 applied to the inputs of a node: every child score lies in
    /// `[0, max_score]`. Offenders are listed in one violation.
    pub fn validate_child_scores(&mut self, scores: &BTreeMap<String, f64>) -> Result<bool> {
        let out_of_range: BTreeMap<&String, f64> = scores
            .iter()
            .filter(|(_, s)| !(0.0..=self.max_score).contains(*s))
            .map(|(id, s)| (id, *s))
            .collect();
        if out_of_range.is_empty() {
            return Ok(true);
        }
        let ids: Vec<&str> = out_of_range.keys().map(|id| id.as_str()).collect();
        let violation = self.violation(
            InvariantId::ScoreBounds,
            Severity::High,
            format!(
                "child scores outside [0, {}]: {}",
                self.max_score,
                ids.join(", ")
            ),
            json!(out_of_range),
            json!([0.0, self.max_score]),
            [("children".to_string(), json!(ids))],
        );
        self.record(violation)?;
        Ok(false)
    }

    /// AGG-003: `0 ≤ coherence ≤ 1`.
    pub fn validate_coherence_bounds(&mut self, coherence: f64) -> Result<bool> {
        if (0.0..=1.0).contains(&coherence) {
            return Ok(true);
        }
        let violation = self.violation(
            InvariantId::CoherenceBounds,
            Severity::Medium,
            format!("coherence {} outside [0, 1]", coherence),
            json!(coherence),
            json!([0.0, 1.0]),
            [],
        );
        self.record(violation)?;
        Ok(false)
    }

    /// AGG-004: the actual child ids equal the declared set, with no
    /// duplicates, and satisfy the tier's cardinality rule.
    pub fn validate_hermeticity(
        &mut self,
        actual: &[String],
        expected: &BTreeSet<String>,
    ) -> Result<HermeticityDiagnosis> {
        let diagnosis = self.level.validate_hermeticity(actual, expected);
        if diagnosis.is_hermetic() {
            return Ok(diagnosis);
        }
        let violation = self.violation(
            InvariantId::Hermeticity,
            self.level.hermeticity_severity(),
            diagnosis.describe(),
            json!(actual),
            json!(expected),
            [
                ("missing".to_string(), json!(diagnosis.missing)),
                ("extra".to_string(), json!(diagnosis.extra)),
                ("duplicates".to_string(), json!(diagnosis.duplicates)),
            ],
        );
        self.record(violation)?;
        Ok(diagnosis)
    }

    /// AGG-006: the aggregate lies within `[min − ε, max + ε]` of its inputs.
    ///
    /// Informational: a breach is recorded but never aborts, whatever
    /// `abort_on_violation` says.
    pub fn validate_convexity(&mut self, aggregated: f64, inputs: &[f64]) -> bool {
        if inputs.is_empty() {
            return true;
        }
        let min = inputs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = inputs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let eps = self.convexity_epsilon;
        if aggregated >= min - eps && aggregated <= max + eps {
            return true;
        }
        let violation = self.violation(
            InvariantId::Convexity,
            Severity::High,
            format!(
                "aggregate {} outside input range [{}, {}]",
                aggregated, min, max
            ),
            json!(aggregated),
            json!([min, max]),
            [
                ("epsilon".to_string(), json!(eps)),
                ("informational".to_string(), json!(true)),
            ],
        );
        self.push(violation);
        false
    }

    pub fn get_violations(&self) -> &[ContractViolation] {
        &self.violations
    }

    pub fn clear_violations(&mut self) {
        self.violations.clear();
    }

    /// Move the recorded violations out, leaving the validator empty.
    pub fn take_violations(&mut self) -> Vec<ContractViolation> {
        std::mem::take(&mut self.violations)
    }

    pub fn summary(&self) -> ViolationSummary {
        let mut summary = ViolationSummary::default();
        for v in &self.violations {
            match v.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
        }
        summary
    }

    pub fn has_critical(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == Severity::Critical)
    }

    /// Whether any recorded violation belongs to an invariant that can abort.
    pub fn has_fatal(&self) -> bool {
        self.violations.iter().any(|v| v.invariant_id.can_abort())
    }

    fn violation<const N: usize>(
        &self,
        invariant_id: InvariantId,
        severity: Severity,
        message: String,
        actual: serde_json::Value,
        expected: serde_json::Value,
        context: [(String, serde_json::Value); N],
    ) -> ContractViolation {
        let mut ctx: BTreeMap<String, serde_json::Value> = context.into_iter().collect();
        ctx.insert("level".to_string(), json!(self.level.name()));
        ContractViolation {
            contract_id: self.contract_id.clone(),
            invariant_id,
            severity,
            message,
            actual,
            expected,
            context: ctx,
        }
    }

    /// Log and store a violation without deciding whether to abort.
    fn push(&mut self, violation: ContractViolation) {
        warn!(
            contract = %violation.contract_id,
            invariant = %violation.invariant_id,
            severity = %violation.severity,
            "{}",
            violation.message
        );
        self.violations.push(violation);
    }

    /// Store a violation, then raise it when aborting applies to its invariant.
    fn record(&mut self, violation: ContractViolation) -> Result<()> {
        if self.abort_on_violation && violation.invariant_id.can_abort() {
            let raised = Box::new(violation.clone());
            self.push(violation);
            return Err(AggregationError::ContractViolation(raised));
        }
        self.push(violation);
        Ok(())
    }
}
