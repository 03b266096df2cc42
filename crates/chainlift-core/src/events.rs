use crate::version::VersionIdentifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeEvent {
    AnalysisCompleted {
        current_version: VersionIdentifier,
    },
    PlanCalculated {
        from: VersionIdentifier,
        to: VersionIdentifier,
        step_count: usize,
    },
    StepStarted {
        index: usize,
        total: usize,
        to: VersionIdentifier,
    },
    StepCompleted {
        index: usize,
        to: VersionIdentifier,
    },
    StepFailed {
        index: usize,
        to: VersionIdentifier,
        detail: String,
    },
    ManualInterventionRequired {
        to: VersionIdentifier,
        change_id: String,
        summary: String,
    },
    CheckpointCreated {
        id: String,
        label: String,
    },
    RollbackStarted {
        checkpoint_id: String,
    },
    RollbackCompleted {
        checkpoint_id: String,
    },
    RunCompleted {
        to: VersionIdentifier,
    },
    RunFailed {
        detail: String,
    },
}

// Observers are advisory: the run outcome must be identical with none attached.
pub trait ProgressObserver {
    fn on_event(&self, event: &UpgradeEvent);
}
