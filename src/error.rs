//! Error types for the aggregation core.
//! One enum, `thiserror` only.

use crate::contracts::ContractViolation;

/// Errors raised by capacity construction, evaluation and contract checks.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("fuzzy measure violation: {0}")]
    FuzzyMeasureViolation(String),

    #[error("capacity identification failed: {0}")]
    CapacityIdentification(String),

    #[error("missing criteria scores: missing {missing:?}, unexpected {unexpected:?}")]
    MissingCriteria {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("invalid bounds for '{id}': [{lower}, {upper}]")]
    InvalidBounds { id: String, lower: f64, upper: f64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown tier level '{0}' (expected dimension, area, cluster or macro)")]
    UnknownTierLevel(String),

    #[error("too many criteria: {count} exceeds ceiling of {max}")]
    TooManyCriteria { count: usize, max: usize },

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("contract violation {}: {}", .0.invariant_id, .0.message)]
    ContractViolation(Box<ContractViolation>),
}

pub type Result<T> = std::result::Result<T, AggregationError>;
