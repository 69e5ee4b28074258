pub mod metrics;
pub mod scorer;

pub use metrics::{DispersionMetrics, Scenario, Shape};
pub use scorer::{
    AdjustedScoreDetails, DispersionScorer, FixedPenaltyBaseline, PenaltyDetails,
    MIN_PENALTY_FACTOR,
};
