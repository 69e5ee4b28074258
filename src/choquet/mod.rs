pub mod evaluator;
pub mod result;

pub use evaluator::ChoquetEvaluator;
pub use result::{AggregationResult, CriterionContribution, InteractionContribution, TraceStep};
