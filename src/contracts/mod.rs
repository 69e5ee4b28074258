//! Aggregation contracts: the six invariants, their severities, and the
//! per-pass validator that records breaches.

pub mod tier;
pub mod validator;
pub mod violation;

pub use tier::{CardinalityMismatch, HermeticityDiagnosis, TierKind, MACRO_CHILD_COUNT};
pub use validator::{create_aggregation_contract, ContractValidator, ViolationSummary};
pub use violation::{ContractViolation, InvariantId, Severity};
