//! Contract-governed, multi-tier score aggregation.
//!
//! Per-criterion scores are combined into a single tier score with a Choquet
//! integral over a monotone fuzzy measure, or (for the cluster tier) with a
//! dispersion-sensitive adaptive penalty. Every result is checked against the
//! aggregation contracts before it moves up to the next tier.

pub mod capacity;
pub mod choquet;
pub mod config;
pub mod contracts;
pub mod dispersion;
pub mod error;
pub mod orchestrator;

pub use capacity::{CapacityBuilder, Coalition, FuzzyMeasureConfig, ShapleyBounds};
pub use choquet::{AggregationResult, ChoquetEvaluator};
pub use config::{EngineSettings, TierCeilings};
pub use contracts::{
    create_aggregation_contract, ContractValidator, ContractViolation, HermeticityDiagnosis,
    InvariantId, Severity, TierKind,
};
pub use dispersion::{DispersionMetrics, DispersionScorer, Scenario, Shape};
pub use error::{AggregationError, Result};
pub use orchestrator::{
    AggregationOrchestrator, Criterion, NodeSpec, Provenance, TierNode, TierPlan, TierResult,
};

/// Upper end of the raw score domain.
pub const MAX_SCORE: f64 = 3.0;

/// Hard ceiling on criteria per capacity. Subset tables hold `2^n` entries.
pub const MAX_CRITERIA: usize = 12;
