mod estimate;
mod plan;

pub use estimate::{complexity_score, estimate_duration, ComplexityReport};
pub use plan::{adjust_validations, plan};
