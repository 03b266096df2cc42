use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use chainlift_core::{
    BuildStatus, Checkpoint, CheckpointMetadata, CheckpointValidation, CommandRunner,
    ProjectManifest, UpgradeError, PROJECT_MANIFEST_NAME,
};

mod fs_ops;
mod index;

use fs_ops::{
    compute_tree_digest, copy_dir_merge, copy_tree_filtered, current_unix_timestamp,
    remove_tree_except,
};
use index::{load_index, save_index};

pub const STORE_DIR_NAME: &str = ".chainlift";

// Build output, dependency caches, version-control metadata, and the store
// itself are never part of a capture.
pub const EXCLUDED_DIR_NAMES: &[&str] = &[
    STORE_DIR_NAME,
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "dist",
    "build",
    "target",
    "deps",
];

pub const ESSENTIAL_PROJECT_FILES: &[&str] = &[PROJECT_MANIFEST_NAME];

static NEXT_CHECKPOINT_SEQ: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    project_dir: PathBuf,
}

impl StoreLayout {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn store_dir(&self) -> PathBuf {
        self.project_dir.join(STORE_DIR_NAME)
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.store_dir().join("checkpoints")
    }

    pub fn index_path(&self) -> PathBuf {
        self.checkpoints_dir().join("index.json")
    }

    pub fn checkpoint_dir(&self, id: &str) -> PathBuf {
        self.checkpoints_dir().join(id)
    }

    pub fn payload_dir(&self, id: &str) -> PathBuf {
        self.checkpoint_dir(id).join("payload")
    }

    pub fn checkpoint_metadata_path(&self, id: &str) -> PathBuf {
        self.checkpoint_dir(id).join("checkpoint.json")
    }
}

pub struct BuildProbe {
    pub runner: Box<dyn CommandRunner>,
    pub command: String,
    pub timeout: Duration,
}

pub struct CheckpointStore {
    layout: StoreLayout,
    build_probe: Option<BuildProbe>,
}

impl CheckpointStore {
    pub fn open(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: StoreLayout::new(project_dir),
            build_probe: None,
        }
    }

    pub fn with_build_probe(mut self, probe: BuildProbe) -> Self {
        self.build_probe = Some(probe);
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn create_checkpoint(&self, version_label: &str, description: &str) -> Result<Checkpoint> {
        let id = next_checkpoint_id();
        let checkpoint_dir = self.layout.checkpoint_dir(&id);
        let payload_dir = self.layout.payload_dir(&id);
        fs::create_dir_all(&payload_dir).with_context(|| {
            format!("failed creating checkpoint storage {}", payload_dir.display())
        })?;

        debug!("capturing checkpoint {id} into {}", checkpoint_dir.display());
        let stats = copy_tree_filtered(
            self.layout.project_dir(),
            &payload_dir,
            EXCLUDED_DIR_NAMES,
        )?;
        let tree_digest = compute_tree_digest(&payload_dir)?;

        let manifest = ProjectManifest::load_if_present(self.layout.project_dir())
            .unwrap_or_else(|err| {
                warn!("checkpoint {id}: project manifest unreadable: {err:#}");
                None
            });

        let checkpoint = Checkpoint {
            id: id.clone(),
            version_label: version_label.to_string(),
            description: description.to_string(),
            created_at_unix: current_unix_timestamp(),
            storage_dir: checkpoint_dir.clone(),
            metadata: CheckpointMetadata {
                manifest,
                build_status: self.probe_build_status(&id),
                size_bytes: stats.size_bytes,
                file_count: stats.file_count,
                tree_digest,
            },
        };

        let metadata_body = serde_json::to_string_pretty(&checkpoint)
            .context("failed to encode checkpoint metadata")?;
        index::atomic_write_text(&self.layout.checkpoint_metadata_path(&id), &metadata_body)?;

        // Index entry is appended last so every indexed checkpoint has storage.
        let index_path = self.layout.index_path();
        let mut doc = load_index(&index_path)?;
        doc.checkpoints.push(checkpoint.clone());
        save_index(&index_path, &doc)?;

        info!(
            "created checkpoint {id} ({} files, {} bytes)",
            stats.file_count, stats.size_bytes
        );
        Ok(checkpoint)
    }

    pub fn restore(&self, id: &str) -> Result<()> {
        let checkpoint = self.get(id)?;
        let payload_dir = self.layout.payload_dir(id);
        if !payload_dir.is_dir() {
            return Err(UpgradeError::CheckpointCorrupt {
                id: id.to_string(),
                detail: format!("payload missing at {}", payload_dir.display()),
            }
            .into());
        }

        info!(
            "restoring checkpoint {id} (version {})",
            checkpoint.version_label
        );
        remove_tree_except(self.layout.project_dir(), EXCLUDED_DIR_NAMES)?;
        copy_dir_merge(&payload_dir, self.layout.project_dir())
    }

    pub fn list(&self) -> Result<Vec<Checkpoint>> {
        Ok(load_index(&self.layout.index_path())?.checkpoints)
    }

    pub fn get(&self, id: &str) -> Result<Checkpoint> {
        let doc = load_index(&self.layout.index_path())?;
        doc.checkpoints
            .into_iter()
            .find(|checkpoint| checkpoint.id == id)
            .ok_or_else(|| UpgradeError::CheckpointNotFound(id.to_string()).into())
    }

    pub fn validate(&self, id: &str) -> CheckpointValidation {
        let mut errors = Vec::new();

        let indexed = match load_index(&self.layout.index_path()) {
            Ok(doc) => doc
                .checkpoints
                .into_iter()
                .find(|checkpoint| checkpoint.id == id),
            Err(err) => {
                errors.push(format!("checkpoint index unreadable: {err:#}"));
                None
            }
        };

        let checkpoint_dir = self.layout.checkpoint_dir(id);
        let payload_dir = self.layout.payload_dir(id);

        if indexed.is_none() && checkpoint_dir.is_dir() {
            errors.push(format!("storage exists for '{id}' but the index has no entry"));
        }
        if indexed.is_some() && !checkpoint_dir.is_dir() {
            errors.push(format!(
                "index lists '{id}' but storage is missing at {}",
                checkpoint_dir.display()
            ));
        }
        if indexed.is_none() && !checkpoint_dir.is_dir() {
            errors.push(format!("unknown checkpoint: {id}"));
        }

        if payload_dir.is_dir() {
            for essential in ESSENTIAL_PROJECT_FILES {
                if !payload_dir.join(essential).is_file() {
                    errors.push(format!("essential file missing from payload: {essential}"));
                }
            }

            if let Some(checkpoint) = &indexed {
                match compute_tree_digest(&payload_dir) {
                    Ok(digest) if digest != checkpoint.metadata.tree_digest => {
                        errors.push(format!(
                            "payload digest mismatch: recorded {}, found {digest}",
                            checkpoint.metadata.tree_digest
                        ));
                    }
                    Ok(_) => {}
                    Err(err) => errors.push(format!("payload digest unreadable: {err:#}")),
                }
            }
        } else if indexed.is_some() {
            errors.push(format!(
                "payload missing at {}",
                payload_dir.display()
            ));
        }

        if errors.is_empty() {
            CheckpointValidation::ok()
        } else {
            CheckpointValidation::failed(errors)
        }
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let index_path = self.layout.index_path();
        let mut doc = load_index(&index_path)?;
        let before = doc.checkpoints.len();
        doc.checkpoints.retain(|checkpoint| checkpoint.id != id);
        if doc.checkpoints.len() == before {
            return Err(UpgradeError::CheckpointNotFound(id.to_string()).into());
        }
        save_index(&index_path, &doc)?;

        let checkpoint_dir = self.layout.checkpoint_dir(id);
        if checkpoint_dir.exists() {
            fs::remove_dir_all(&checkpoint_dir).with_context(|| {
                format!(
                    "failed removing checkpoint storage {}",
                    checkpoint_dir.display()
                )
            })?;
        }
        Ok(())
    }

    pub fn cleanup(&self, keep: usize) -> Result<Vec<String>> {
        let mut checkpoints = self.list()?;
        if checkpoints.len() <= keep {
            return Ok(Vec::new());
        }

        // Newest first; ids carry a monotonic sequence to break same-second ties.
        checkpoints.sort_by(|a, b| {
            b.created_at_unix
                .cmp(&a.created_at_unix)
                .then_with(|| b.id.cmp(&a.id))
        });

        let mut deleted = Vec::new();
        for checkpoint in checkpoints.into_iter().skip(keep) {
            self.delete(&checkpoint.id)?;
            deleted.push(checkpoint.id);
        }
        info!("checkpoint cleanup removed {} checkpoint(s)", deleted.len());
        Ok(deleted)
    }

    fn probe_build_status(&self, id: &str) -> BuildStatus {
        let Some(probe) = &self.build_probe else {
            return BuildStatus::Skipped;
        };

        match probe
            .runner
            .run(&probe.command, self.layout.project_dir(), probe.timeout)
        {
            Ok(output) if output.success() => BuildStatus::Success,
            Ok(output) => {
                warn!("checkpoint {id}: build probe failed: {}", output.summary());
                BuildStatus::Failed
            }
            Err(err) => {
                warn!("checkpoint {id}: build probe errored: {err:#}");
                BuildStatus::Failed
            }
        }
    }
}

fn next_checkpoint_id() -> String {
    let seq = NEXT_CHECKPOINT_SEQ.fetch_add(1, Ordering::SeqCst);
    format!("cp-{}-{seq:06}", current_unix_timestamp())
}

#[cfg(test)]
mod tests;
