use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::coalition::Coalition;
use super::transforms::{interaction_indices, mobius_transform};
use crate::error::{AggregationError, Result};
use crate::MAX_CRITERIA;

/// Numeric slack for boundary and monotonicity checks on capacity tables.
pub const MEASURE_TOLERANCE: f64 = 1e-9;

/// Permissible Shapley range for one criterion.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ShapleyBounds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for ShapleyBounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ShapleyBounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// The whole unit interval.
    pub fn unbounded() -> Self {
        Self {
            lower: 0.0,
            upper: 1.0,
        }
    }

    /// Reject non-finite values, `lower > upper`, or a range outside [0, 1].
    pub fn check(&self, id: &str) -> Result<()> {
        let well_formed = self.lower.is_finite()
            && self.upper.is_finite()
            && self.lower <= self.upper
            && self.lower >= 0.0
            && self.upper <= 1.0;
        if well_formed {
            Ok(())
        } else {
            Err(AggregationError::InvalidBounds {
                id: id.to_string(),
                lower: self.lower,
                upper: self.upper,
            })
        }
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.lower - tolerance && value <= self.upper + tolerance
    }
}

/// Outcome of checking a capacity against its structural and constitutional
/// constraints.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConstitutionalCompliance {
    pub compliant: bool,
    pub violations: Vec<String>,
}

/// A validated capacity with its derived representations.
///
/// Tables are indexed by [`Coalition`] mask over `criteria`. Instances are
/// immutable once built and can be shared across threads.
#[derive(Debug, Clone, Serialize)]
pub struct FuzzyMeasureConfig {
    criteria: Vec<String>,
    fuzzy_measure: Vec<f64>,
    mobius_transform: Vec<f64>,
    interaction_indices: Vec<f64>,
    shapley_values: Vec<f64>,
    target_weights: Vec<f64>,
    constitutional_bounds: BTreeMap<String, ShapleyBounds>,
}

impl FuzzyMeasureConfig {
    /// Identify a capacity from an explicit table of `2^n` values in mask order.
    ///
    /// `bounds` may omit criteria; those default to [0, 1]. The target
    /// weights of an identified capacity are its own Shapley values.
    ///
    /// # Errors
    ///
    /// - `CapacityIdentification` if the criteria are empty, duplicated, too
    ///   many, the table has the wrong size, or bounds name unknown criteria
    /// - `InvalidBounds` for malformed bounds
    /// - `FuzzyMeasureViolation` if the table is not a monotone capacity
    pub fn from_capacity(
        criteria: Vec<String>,
        values: Vec<f64>,
        bounds: &BTreeMap<String, ShapleyBounds>,
    ) -> Result<Self> {
        if criteria.is_empty() {
            return Err(AggregationError::CapacityIdentification(
                "no criteria supplied".to_string(),
            ));
        }
        if criteria.len() > MAX_CRITERIA {
            return Err(AggregationError::TooManyCriteria {
                count: criteria.len(),
                max: MAX_CRITERIA,
            });
        }
        let mut sorted = criteria.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != criteria.len() {
            return Err(AggregationError::CapacityIdentification(
                "criteria list contains duplicates".to_string(),
            ));
        }
        let expected = 1usize << criteria.len();
        if values.len() != expected {
            return Err(AggregationError::CapacityIdentification(format!(
                "expected {} capacity values for {} criteria, got {}",
                expected,
                criteria.len(),
                values.len()
            )));
        }
        if let Some(unknown) = bounds.keys().find(|id| !criteria.contains(*id)) {
            return Err(AggregationError::CapacityIdentification(format!(
                "bounds reference unknown criterion '{}'",
                unknown
            )));
        }

        let full_bounds = complete_bounds(&criteria, bounds)?;
        let n = criteria.len();
        let mobius = mobius_transform(&values, n);
        let shapley = singleton_indices(&interaction_indices(&mobius, n), n);
        let config = Self::from_parts(criteria, values, shapley, full_bounds);

        let errors = config.validate();
        if !errors.is_empty() {
            return Err(AggregationError::FuzzyMeasureViolation(errors.join("; ")));
        }
        Ok(config)
    }

    /// Assemble a config from a capacity table, deriving Möbius, interaction
    /// and Shapley tables. Performs no validation.
    pub(crate) fn from_parts(
        criteria: Vec<String>,
        fuzzy_measure: Vec<f64>,
        target_weights: Vec<f64>,
        constitutional_bounds: BTreeMap<String, ShapleyBounds>,
    ) -> Self {
        let n = criteria.len();
        let mobius_transform = mobius_transform(&fuzzy_measure, n);
        let interaction_indices = interaction_indices(&mobius_transform, n);
        let shapley_values = singleton_indices(&interaction_indices, n);
        Self {
            criteria,
            fuzzy_measure,
            mobius_transform,
            interaction_indices,
            shapley_values,
            target_weights,
            constitutional_bounds,
        }
    }

    pub fn criteria(&self) -> &[String] {
        &self.criteria
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn grand_coalition(&self) -> Coalition {
        Coalition::full(self.criteria.len())
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.criteria.iter().position(|c| c == id)
    }

    /// Coalition for a set of criterion ids.
    pub fn coalition_of<S: AsRef<str>>(&self, ids: &[S]) -> Result<Coalition> {
        ids.iter().try_fold(Coalition::EMPTY, |acc, id| {
            let id = id.as_ref();
            self.index_of(id).map(|i| acc.with(i)).ok_or_else(|| {
                AggregationError::InvalidInput(format!("unknown criterion '{}'", id))
            })
        })
    }

    /// Criterion ids of a coalition, in criteria order.
    pub fn coalition_ids(&self, coalition: Coalition) -> Vec<String> {
        coalition
            .members()
            .filter_map(|i| self.criteria.get(i).cloned())
            .collect()
    }

    /// `v(A)`
    pub fn capacity(&self, coalition: Coalition) -> f64 {
        self.fuzzy_measure[coalition.index()]
    }

    /// `m(A)`
    pub fn mobius(&self, coalition: Coalition) -> f64 {
        self.mobius_transform[coalition.index()]
    }

    /// `I(A)`
    pub fn interaction(&self, coalition: Coalition) -> f64 {
        self.interaction_indices[coalition.index()]
    }

    /// All `(A, v(A))` pairs in mask order.
    pub fn fuzzy_measure(&self) -> impl Iterator<Item = (Coalition, f64)> + '_ {
        self.fuzzy_measure
            .iter()
            .enumerate()
            .map(|(mask, v)| (Coalition::from_bits(mask as u32), *v))
    }

    /// All `(A, m(A))` pairs in mask order.
    pub fn mobius_transform(&self) -> impl Iterator<Item = (Coalition, f64)> + '_ {
        self.mobius_transform
            .iter()
            .enumerate()
            .map(|(mask, m)| (Coalition::from_bits(mask as u32), *m))
    }

    /// Interaction indices for coalitions of two or more criteria.
    pub fn interaction_indices(&self) -> impl Iterator<Item = (Coalition, f64)> + '_ {
        self.interaction_indices
            .iter()
            .enumerate()
            .map(|(mask, i)| (Coalition::from_bits(mask as u32), *i))
            .filter(|(c, _)| c.len() >= 2)
    }

    /// Shapley value per criterion, in criteria order.
    pub fn shapley_vector(&self) -> &[f64] {
        &self.shapley_values
    }

    pub fn shapley_value(&self, id: &str) -> Option<f64> {
        self.index_of(id).map(|i| self.shapley_values[i])
    }

    pub fn shapley_values(&self) -> BTreeMap<String, f64> {
        self.criteria
            .iter()
            .cloned()
            .zip(self.shapley_values.iter().copied())
            .collect()
    }

    /// Normalized, bound-clipped weights the capacity was generated from.
    pub fn target_weights(&self) -> &[f64] {
        &self.target_weights
    }

    pub fn constitutional_bounds(&self) -> &BTreeMap<String, ShapleyBounds> {
        &self.constitutional_bounds
    }

    /// Boundary and full pairwise-superset monotonicity check.
    ///
    /// Returns one message per problem; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let full = self.grand_coalition();

        for (coalition, value) in self.fuzzy_measure() {
            if !value.is_finite() {
                errors.push(format!("v({}) is not finite", coalition));
            } else if value < -MEASURE_TOLERANCE || value > 1.0 + MEASURE_TOLERANCE {
                errors.push(format!("v({}) = {} is outside [0, 1]", coalition, value));
            }
        }

        let empty = self.capacity(Coalition::EMPTY);
        if empty.abs() > MEASURE_TOLERANCE {
            errors.push(format!("v(∅) = {} (expected 0)", empty));
        }
        let grand = self.capacity(full);
        if (grand - 1.0).abs() > MEASURE_TOLERANCE {
            errors.push(format!("v(N) = {} (expected 1)", grand));
        }

        for superset in Coalition::all(self.len()) {
            let upper = self.capacity(superset);
            for subset in superset.subsets() {
                let lower = self.capacity(subset);
                if lower > upper + MEASURE_TOLERANCE {
                    errors.push(format!(
                        "monotonicity: v({}) = {} > v({}) = {}",
                        subset, lower, superset, upper
                    ));
                }
            }
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Structural validity plus each criterion's Shapley value against its
    /// constitutional bounds.
    pub fn compliance(&self) -> ConstitutionalCompliance {
        let mut violations = self.validate();
        for (i, id) in self.criteria.iter().enumerate() {
            let bounds = self
                .constitutional_bounds
                .get(id)
                .copied()
                .unwrap_or_default();
            let value = self.shapley_values[i];
            if !bounds.contains(value, MEASURE_TOLERANCE) {
                violations.push(format!(
                    "shapley({}) = {:.6} outside constitutional bounds [{}, {}]",
                    id, value, bounds.lower, bounds.upper
                ));
            }
        }
        ConstitutionalCompliance {
            compliant: violations.is_empty(),
            violations,
        }
    }
}

/// Bounds for every criterion, defaulting missing entries to [0, 1].
pub(crate) fn complete_bounds(
    criteria: &[String],
    bounds: &BTreeMap<String, ShapleyBounds>,
) -> Result<BTreeMap<String, ShapleyBounds>> {
    criteria
        .iter()
        .map(|id| {
            let b = bounds.get(id).copied().unwrap_or_default();
            b.check(id)?;
            Ok((id.clone(), b))
        })
        .collect()
}

fn singleton_indices(indices: &[f64], n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| indices[Coalition::singleton(i).index()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_capacity_valid_table() {
        let config = FuzzyMeasureConfig::from_capacity(
            ids(&["a", "b"]),
            vec![0.0, 0.3, 0.3, 1.0],
            &BTreeMap::new(),
        )
        .unwrap();

        assert!(config.is_valid());
        assert!((config.shapley_value("a").unwrap() - 0.5).abs() < 1e-12);
        assert!((config.shapley_value("b").unwrap() - 0.5).abs() < 1e-12);
        let pair = config.coalition_of(&["a", "b"]).unwrap();
        assert!((config.interaction(pair) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_from_capacity_wrong_table_size() {
        let err = FuzzyMeasureConfig::from_capacity(
            ids(&["a", "b"]),
            vec![0.0, 0.5, 1.0],
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AggregationError::CapacityIdentification(_)));
    }

    #[test]
    fn test_from_capacity_non_monotone() {
        let err = FuzzyMeasureConfig::from_capacity(
            ids(&["a", "b", "c"]),
            vec![0.0, 0.6, 0.2, 0.5, 0.1, 0.4, 0.5, 1.0],
            &BTreeMap::new(),
        )
        .unwrap_err();
        match err {
            AggregationError::FuzzyMeasureViolation(msg) => assert!(msg.contains("monotonicity")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_capacity_bad_boundary() {
        let err = FuzzyMeasureConfig::from_capacity(
            ids(&["a", "b"]),
            vec![0.1, 0.3, 0.3, 0.9],
            &BTreeMap::new(),
        )
        .unwrap_err();
        match err {
            AggregationError::FuzzyMeasureViolation(msg) => {
                assert!(msg.contains("v(∅)"));
                assert!(msg.contains("v(N)"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_capacity_duplicate_criteria() {
        let err = FuzzyMeasureConfig::from_capacity(
            ids(&["a", "a"]),
            vec![0.0, 0.5, 0.5, 1.0],
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AggregationError::CapacityIdentification(_)));
    }

    #[test]
    fn test_from_capacity_unknown_bound_id() {
        let mut bounds = BTreeMap::new();
        bounds.insert("z".to_string(), ShapleyBounds::new(0.0, 0.5));
        let err = FuzzyMeasureConfig::from_capacity(
            ids(&["a", "b"]),
            vec![0.0, 0.5, 0.5, 1.0],
            &bounds,
        )
        .unwrap_err();
        assert!(matches!(err, AggregationError::CapacityIdentification(_)));
    }

    #[test]
    fn test_compliance_flags_shapley_outside_bounds() {
        let mut bounds = BTreeMap::new();
        bounds.insert("a".to_string(), ShapleyBounds::new(0.0, 0.4));
        let config = FuzzyMeasureConfig::from_capacity(
            ids(&["a", "b"]),
            vec![0.0, 0.3, 0.3, 1.0],
            &bounds,
        )
        .unwrap();

        let compliance = config.compliance();
        assert!(!compliance.compliant);
        assert_eq!(compliance.violations.len(), 1);
        assert!(compliance.violations[0].contains("shapley(a)"));
    }

    #[test]
    fn test_bounds_check() {
        assert!(ShapleyBounds::new(0.2, 0.1).check("x").is_err());
        assert!(ShapleyBounds::new(-0.1, 0.5).check("x").is_err());
        assert!(ShapleyBounds::new(0.0, f64::NAN).check("x").is_err());
        assert!(ShapleyBounds::new(0.1, 0.1).check("x").is_ok());
    }

    #[test]
    fn test_coalition_helpers() {
        let config = FuzzyMeasureConfig::from_capacity(
            ids(&["x", "y", "z"]),
            vec![0.0, 0.2, 0.3, 0.5, 0.4, 0.6, 0.7, 1.0],
            &BTreeMap::new(),
        )
        .unwrap();

        let c = config.coalition_of(&["z", "x"]).unwrap();
        assert_eq!(c.bits(), 0b101);
        assert_eq!(config.coalition_ids(c), vec!["x", "z"]);
        assert!(config.coalition_of(&["w"]).is_err());
        assert_eq!(config.interaction_indices().count(), 4);
    }
}
