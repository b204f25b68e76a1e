//! Scoring: the deterministic base score and the condition registry.

mod base;
mod builtin;
mod condition;
mod registry;

pub use base::{BaseScore, calculate_base_score};
pub use builtin::{
    IndustrialIsolation, ParkCoverage, ResidentialDistrict, UnifiedRoads, builtin_conditions,
};
pub use condition::{ConditionDetails, ScoringCondition};
pub use registry::{ConditionRegistry, ConditionScore, ScoreBreakdown, score_with_conditions};
