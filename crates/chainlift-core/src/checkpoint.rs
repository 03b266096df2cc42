use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::manifest::ProjectManifest;
use crate::version::VersionIdentifier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Success,
    Failed,
    Skipped,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointMetadata {
    pub manifest: Option<ProjectManifest>,
    pub build_status: BuildStatus,
    pub size_bytes: u64,
    pub file_count: u64,
    pub tree_digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    pub id: String,
    pub version_label: String,
    pub description: String,
    pub created_at_unix: u64,
    pub storage_dir: PathBuf,
    pub metadata: CheckpointMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl CheckpointValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedStep {
    pub to: VersionIdentifier,
    pub elapsed: Duration,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UpgradeResult {
    pub success: bool,
    pub from_version: VersionIdentifier,
    pub to_version: VersionIdentifier,
    pub completed_steps: Vec<CompletedStep>,
    pub checkpoints: Vec<Checkpoint>,
    pub duration: Duration,
    pub rollback_available: bool,
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub rollback_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RollbackResult {
    pub checkpoint_id: String,
    pub restored_version_label: String,
    pub preserved_files: Vec<PathBuf>,
    pub backup_checkpoint: Option<Checkpoint>,
    pub warnings: Vec<String>,
}
