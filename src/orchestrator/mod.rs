//! Per-node composition of capacity evaluation, dispersion scoring and
//! contract checks across the dimension, area, cluster and macro tiers.

mod engine;
mod plan;
mod result;

pub use engine::AggregationOrchestrator;
pub use plan::{Criterion, NodeSpec, TierPlan};
pub use result::{Provenance, TierNode, TierResult};
