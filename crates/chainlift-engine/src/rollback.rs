use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};

use chainlift_core::{
    BuildStatus, Checkpoint, RollbackResult, UpgradeError, ValidationSpec,
};
use chainlift_runner::ValidationRunner;
use chainlift_store::CheckpointStore;

#[derive(Debug, Clone, Default)]
pub struct RollbackOptions {
    pub preserve_files: Vec<PathBuf>,
    pub backup_before: bool,
    pub validate_after: bool,
}

pub struct PostRollbackValidation<'a> {
    pub runner: &'a ValidationRunner,
    pub specs: Vec<ValidationSpec>,
}

pub struct RollbackController<'a> {
    store: &'a CheckpointStore,
    post_validation: Option<PostRollbackValidation<'a>>,
}

impl<'a> RollbackController<'a> {
    pub fn new(store: &'a CheckpointStore) -> Self {
        Self {
            store,
            post_validation: None,
        }
    }

    pub fn with_post_validation(mut self, validation: PostRollbackValidation<'a>) -> Self {
        self.post_validation = Some(validation);
        self
    }

    pub fn rollback_to(
        &self,
        checkpoint_id: &str,
        options: &RollbackOptions,
    ) -> Result<RollbackResult> {
        // Fail fast before touching the tree.
        let checkpoint = self.store.get(checkpoint_id)?;
        let validation = self.store.validate(checkpoint_id);
        if !validation.valid {
            return Err(UpgradeError::CheckpointCorrupt {
                id: checkpoint_id.to_string(),
                detail: validation.errors.join("; "),
            }
            .into());
        }

        let mut warnings = Vec::new();

        let backup_checkpoint = if options.backup_before {
            let backup = self
                .store
                .create_checkpoint(&checkpoint.version_label, "pre-rollback")
                .context("failed to create pre-rollback checkpoint")?;
            info!("captured pre-rollback checkpoint {}", backup.id);
            Some(backup)
        } else {
            None
        };

        let preserved = self.read_preserved_files(options, &mut warnings)?;

        self.store.restore(checkpoint_id)?;

        let project_dir = self.store.layout().project_dir().to_path_buf();
        let mut preserved_paths = Vec::new();
        for (relative, contents) in preserved {
            let destination = project_dir.join(&relative);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&destination, contents).with_context(|| {
                format!("failed restoring preserved file {}", destination.display())
            })?;
            preserved_paths.push(relative);
        }

        // The rollback itself succeeded; validation problems are advisory.
        if options.validate_after {
            if let Some(validation) = &self.post_validation {
                for spec in &validation.specs {
                    let result = validation.runner.run(spec);
                    if !result.success {
                        warnings.push(result.error.unwrap_or(result.message));
                    }
                }
            }
        }

        info!(
            "rolled back to checkpoint {checkpoint_id} (version {})",
            checkpoint.version_label
        );
        Ok(RollbackResult {
            checkpoint_id: checkpoint.id,
            restored_version_label: checkpoint.version_label,
            preserved_files: preserved_paths,
            backup_checkpoint,
            warnings,
        })
    }

    pub fn rollback_to_last_good(&self) -> Result<RollbackResult> {
        for checkpoint in self.newest_first()? {
            if checkpoint.metadata.build_status != BuildStatus::Success {
                continue;
            }
            if !self.store.validate(&checkpoint.id).valid {
                warn!("skipping checkpoint {} with damaged storage", checkpoint.id);
                continue;
            }
            return self.rollback_to(&checkpoint.id, &RollbackOptions::default());
        }
        Err(UpgradeError::NoValidCheckpoint.into())
    }

    // Best-effort walk towards the newest usable state.
    pub fn progressive_rollback(&self, target_id: Option<&str>) -> Result<RollbackResult> {
        let checkpoints = self.newest_first()?;
        if checkpoints.is_empty() {
            return Err(UpgradeError::NoValidCheckpoint.into());
        }

        let options = RollbackOptions {
            validate_after: true,
            ..RollbackOptions::default()
        };

        let mut last_result = None;
        for checkpoint in checkpoints {
            let result = self.rollback_to(&checkpoint.id, &options)?;
            let reached_target = target_id == Some(result.checkpoint_id.as_str());
            if result.warnings.is_empty() || reached_target {
                return Ok(result);
            }
            last_result = Some(result);
        }

        last_result.ok_or_else(|| UpgradeError::NoValidCheckpoint.into())
    }

    fn newest_first(&self) -> Result<Vec<Checkpoint>> {
        let mut checkpoints = self.store.list()?;
        checkpoints.sort_by(|a, b| {
            b.created_at_unix
                .cmp(&a.created_at_unix)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(checkpoints)
    }

    fn read_preserved_files(
        &self,
        options: &RollbackOptions,
        warnings: &mut Vec<String>,
    ) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
        let project_dir = self.store.layout().project_dir();
        let mut preserved = BTreeMap::new();
        for relative in &options.preserve_files {
            let path = project_dir.join(relative);
            match fs::read(&path) {
                Ok(contents) => {
                    preserved.insert(relative.clone(), contents);
                }
                Err(err) => {
                    warnings.push(format!(
                        "could not preserve {}: {err}",
                        relative.display()
                    ));
                }
            }
        }
        Ok(preserved)
    }
}
