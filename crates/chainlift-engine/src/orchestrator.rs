use std::time::Instant;

use anyhow::Result;
use log::{debug, info, warn};

use chainlift_core::{
    Checkpoint, CheckpointFrequency, CompletedStep, ProgressObserver, ProjectAnalyzer,
    RollbackPolicy, StepExecutor, UpgradeError, UpgradeEvent, UpgradeOptions, UpgradeResult,
    UpgradeStep, ValidationKind, ValidationLevel, VersionCapabilities, VersionIdentifier,
};
use chainlift_planner::plan;
use chainlift_runner::ValidationRunner;
use chainlift_store::CheckpointStore;

use crate::registry::ExecutorRegistry;
use crate::rollback::{RollbackController, RollbackOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Analyzing,
    Planning,
    ValidatingPrerequisites,
    ExecutingStep(usize),
    FinalValidating,
    RollingBack,
}

impl Phase {
    fn describe(&self) -> String {
        match self {
            Self::Analyzing => "analyzing".to_string(),
            Self::Planning => "planning".to_string(),
            Self::ValidatingPrerequisites => "validating prerequisites".to_string(),
            Self::ExecutingStep(index) => format!("executing step {}", index + 1),
            Self::FinalValidating => "running final validation".to_string(),
            Self::RollingBack => "rolling back".to_string(),
        }
    }
}

struct RunTally {
    from: VersionIdentifier,
    to: VersionIdentifier,
    completed: Vec<CompletedStep>,
    checkpoints: Vec<Checkpoint>,
    warnings: Vec<String>,
    started: Instant,
}

pub struct Orchestrator<'a> {
    analyzer: &'a dyn ProjectAnalyzer,
    capabilities: &'a dyn VersionCapabilities,
    registry: &'a ExecutorRegistry,
    store: &'a CheckpointStore,
    validator: &'a ValidationRunner,
    observers: Vec<&'a dyn ProgressObserver>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        analyzer: &'a dyn ProjectAnalyzer,
        capabilities: &'a dyn VersionCapabilities,
        registry: &'a ExecutorRegistry,
        store: &'a CheckpointStore,
        validator: &'a ValidationRunner,
    ) -> Self {
        Self {
            analyzer,
            capabilities,
            registry,
            store,
            validator,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: &'a dyn ProgressObserver) {
        self.observers.push(observer);
    }

    pub fn orchestrate(
        &self,
        target: &VersionIdentifier,
        options: &UpgradeOptions,
    ) -> Result<UpgradeResult> {
        let started = Instant::now();

        self.enter(Phase::Analyzing);
        let state = self.analyzer.analyze(options.target_dir())?;
        self.emit(UpgradeEvent::AnalysisCompleted {
            current_version: state.current_version.clone(),
        });

        self.enter(Phase::Planning);
        let upgrade_plan = plan(&state.current_version, target, self.capabilities, options)?;
        self.emit(UpgradeEvent::PlanCalculated {
            from: state.current_version.clone(),
            to: target.clone(),
            step_count: upgrade_plan.steps().len(),
        });

        // Every handler is resolved before anything mutates.
        let executors = self.registry.resolve(&upgrade_plan)?;

        // An unsatisfiable plan must be detected before the project is touched.
        self.enter(Phase::ValidatingPrerequisites);
        for step in upgrade_plan.steps() {
            for prerequisite in step.critical_prerequisites() {
                if !self.validator.validate_prerequisite(prerequisite) {
                    return Err(UpgradeError::PrerequisiteFailed {
                        name: prerequisite.name.clone(),
                        detail: format!(
                            "{} must satisfy {} for version {}",
                            prerequisite.kind.as_str(),
                            prerequisite.required_range,
                            step.to
                        ),
                    }
                    .into());
                }
            }
        }

        let mut tally = RunTally {
            from: state.current_version.clone(),
            to: target.clone(),
            completed: Vec::new(),
            checkpoints: Vec::new(),
            warnings: Vec::new(),
            started,
        };

        let initial = self
            .store
            .create_checkpoint(&state.current_version.to_string(), "initial state before upgrade")?;
        self.emit(UpgradeEvent::CheckpointCreated {
            id: initial.id.clone(),
            label: initial.version_label.clone(),
        });
        let mut anchor_id = initial.id.clone();
        tally.checkpoints.push(initial);

        let total = upgrade_plan.steps().len();
        for (index, (step, executor)) in
            upgrade_plan.steps().iter().zip(executors).enumerate()
        {
            self.enter(Phase::ExecutingStep(index));
            self.emit(UpgradeEvent::StepStarted {
                index,
                total,
                to: step.to.clone(),
            });

            let step_started = Instant::now();
            match self.execute_step(step, executor, options) {
                Ok(step_warnings) => {
                    tally.warnings.extend(step_warnings.iter().cloned());
                    tally.completed.push(CompletedStep {
                        to: step.to.clone(),
                        elapsed: step_started.elapsed(),
                        warnings: step_warnings,
                    });
                    self.emit(UpgradeEvent::StepCompleted {
                        index,
                        to: step.to.clone(),
                    });
                }
                Err(err) => {
                    let detail = format!("{err:#}");
                    self.emit(UpgradeEvent::StepFailed {
                        index,
                        to: step.to.clone(),
                        detail: detail.clone(),
                    });
                    return Ok(self.fail_run(tally, &anchor_id, detail, options));
                }
            }

            if should_checkpoint(options.checkpoint_frequency, step) {
                let checkpoint = self.store.create_checkpoint(
                    &step.to.to_string(),
                    &format!("after upgrade to {}", step.to),
                )?;
                self.emit(UpgradeEvent::CheckpointCreated {
                    id: checkpoint.id.clone(),
                    label: checkpoint.version_label.clone(),
                });
                anchor_id = checkpoint.id.clone();
                tally.checkpoints.push(checkpoint);
            }
        }

        self.enter(Phase::FinalValidating);
        if let Err(err) = self.final_validation(&upgrade_plan.steps()[total - 1], options) {
            let detail = format!("{err:#}");
            return Ok(self.fail_run(tally, &anchor_id, detail, options));
        }

        if options.rollback_on_final_warnings
            && !tally.warnings.is_empty()
            && options.rollback_policy == RollbackPolicy::Automatic
        {
            let detail = format!(
                "final validation left {} warning(s); rolled back by policy",
                tally.warnings.len()
            );
            return Ok(self.fail_run(tally, &anchor_id, detail, options));
        }

        self.emit(UpgradeEvent::RunCompleted {
            to: target.clone(),
        });
        info!(
            "upgrade {} -> {} completed in {:?}",
            tally.from,
            tally.to,
            tally.started.elapsed()
        );
        Ok(UpgradeResult {
            success: true,
            from_version: tally.from,
            to_version: tally.to,
            completed_steps: tally.completed,
            rollback_available: !tally.checkpoints.is_empty(),
            checkpoints: tally.checkpoints,
            duration: tally.started.elapsed(),
            warnings: tally.warnings,
            error: None,
            rollback_error: None,
        })
    }

    fn execute_step(
        &self,
        step: &UpgradeStep,
        executor: &dyn StepExecutor,
        options: &UpgradeOptions,
    ) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        for prerequisite in &step.prerequisites {
            if self.validator.validate_prerequisite(prerequisite) {
                continue;
            }
            if prerequisite.critical {
                return Err(UpgradeError::PrerequisiteFailed {
                    name: prerequisite.name.clone(),
                    detail: format!(
                        "{} must satisfy {}",
                        prerequisite.kind.as_str(),
                        prerequisite.required_range
                    ),
                }
                .into());
            }
            warnings.push(format!(
                "prerequisite '{}' not satisfied ({} {})",
                prerequisite.name,
                prerequisite.kind.as_str(),
                prerequisite.required_range
            ));
        }

        executor.validate_prerequisites(options.target_dir())?;

        for change in &step.breaking_changes {
            if change.auto_migratable {
                continue;
            }
            self.emit(UpgradeEvent::ManualInterventionRequired {
                to: step.to.clone(),
                change_id: change.id.clone(),
                summary: change.summary.clone(),
            });
            warnings.push(format!(
                "manual migration needed for '{}': {}",
                change.id, change.summary
            ));
        }

        let outcome = executor.execute(options.target_dir(), step, options)?;
        warnings.extend(outcome.warnings);
        debug!(
            "step to {} applied {} change(s)",
            step.to,
            outcome.applied_changes.len()
        );

        for spec in &step.validations {
            let result = self.validator.run(spec);
            if result.success {
                continue;
            }
            let detail = result.error.unwrap_or_else(|| result.message.clone());
            if spec.required {
                return Err(UpgradeError::StepExecution {
                    version: step.to.to_string(),
                    detail: format!("required {} validation failed: {detail}", spec.kind.as_str()),
                }
                .into());
            }
            warnings.push(format!(
                "{} validation failed (non-blocking): {detail}",
                spec.kind.as_str()
            ));
        }

        Ok(warnings)
    }

    // Always re-checks the build; the test suite too under comprehensive.
    fn final_validation(&self, last_step: &UpgradeStep, options: &UpgradeOptions) -> Result<()> {
        let mut kinds = vec![ValidationKind::Build];
        if options.validation_level == ValidationLevel::Comprehensive {
            kinds.push(ValidationKind::Test);
        }

        for kind in kinds {
            let Some(spec) = last_step
                .validations
                .iter()
                .find(|spec| spec.kind == kind)
            else {
                continue;
            };
            let result = self.validator.run(spec);
            if !result.success {
                let detail = result.error.unwrap_or_else(|| result.message.clone());
                return Err(UpgradeError::StepExecution {
                    version: last_step.to.to_string(),
                    detail: format!("final {} validation failed: {detail}", kind.as_str()),
                }
                .into());
            }
        }
        Ok(())
    }

    fn fail_run(
        &self,
        tally: RunTally,
        anchor_id: &str,
        error: String,
        options: &UpgradeOptions,
    ) -> UpgradeResult {
        let mut rollback_error = None;

        if options.rollback_policy == RollbackPolicy::Automatic {
            self.enter(Phase::RollingBack);
            self.emit(UpgradeEvent::RollbackStarted {
                checkpoint_id: anchor_id.to_string(),
            });
            let controller = RollbackController::new(self.store);
            match controller.rollback_to(anchor_id, &RollbackOptions::default()) {
                Ok(_) => {
                    self.emit(UpgradeEvent::RollbackCompleted {
                        checkpoint_id: anchor_id.to_string(),
                    });
                }
                Err(err) => {
                    // Never swallowed: the result reports both failures.
                    warn!("rollback to {anchor_id} failed: {err:#}");
                    rollback_error = Some(format!("{err:#}"));
                }
            }
        }

        self.emit(UpgradeEvent::RunFailed {
            detail: error.clone(),
        });
        UpgradeResult {
            success: false,
            from_version: tally.from,
            to_version: tally.to,
            completed_steps: tally.completed,
            rollback_available: !tally.checkpoints.is_empty(),
            checkpoints: tally.checkpoints,
            duration: tally.started.elapsed(),
            warnings: tally.warnings,
            error: Some(error),
            rollback_error,
        }
    }

    fn enter(&self, phase: Phase) {
        debug!("orchestrator phase: {}", phase.describe());
    }

    fn emit(&self, event: UpgradeEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

fn should_checkpoint(frequency: CheckpointFrequency, step: &UpgradeStep) -> bool {
    match frequency {
        CheckpointFrequency::EveryStep => true,
        CheckpointFrequency::MajorVersions => step.required,
        CheckpointFrequency::Disabled => false,
    }
}
