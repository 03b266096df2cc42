mod analyzer;
mod orchestrator;
mod registry;
mod rollback;

pub use analyzer::ManifestAnalyzer;
pub use orchestrator::Orchestrator;
pub use registry::ExecutorRegistry;
pub use rollback::{PostRollbackValidation, RollbackController, RollbackOptions};
