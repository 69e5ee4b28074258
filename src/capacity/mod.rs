pub mod builder;
pub mod coalition;
pub mod measure;
pub mod transforms;

pub use builder::CapacityBuilder;
pub use coalition::Coalition;
pub use measure::{ConstitutionalCompliance, FuzzyMeasureConfig, ShapleyBounds, MEASURE_TOLERANCE};
