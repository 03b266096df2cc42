mod checkpoint;
mod collab;
mod error;
mod events;
mod manifest;
mod options;
mod step;
mod version;

pub use checkpoint::{
    BuildStatus, Checkpoint, CheckpointMetadata, CheckpointValidation, CompletedStep,
    RollbackResult, UpgradeResult,
};
pub use collab::{
    CommandOutput, CommandRunner, ProjectAnalyzer, ProjectState, StepExecutor, StepOutcome,
    VersionCapabilities,
};
pub use error::UpgradeError;
pub use events::{ProgressObserver, UpgradeEvent};
pub use manifest::{ProjectManifest, PROJECT_MANIFEST_NAME};
pub use options::{
    CheckpointFrequency, RollbackPolicy, UpgradeOptions, UpgradeStrategy, ValidationLevel,
};
pub use step::{
    BreakingChange, Prerequisite, PrerequisiteKind, Severity, UpgradePlan, UpgradeStep,
    ValidationKind, ValidationSpec,
};
pub use version::{VersionIdentifier, VersionRef};

#[cfg(test)]
mod tests;
