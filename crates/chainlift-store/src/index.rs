use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chainlift_core::Checkpoint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CheckpointIndexDoc {
    pub version: u32,
    pub checkpoints: Vec<Checkpoint>,
}

impl Default for CheckpointIndexDoc {
    fn default() -> Self {
        Self {
            version: 1,
            checkpoints: Vec::new(),
        }
    }
}

pub(crate) fn load_index(path: &Path) -> Result<CheckpointIndexDoc> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(CheckpointIndexDoc::default());
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read checkpoint index: {}", path.display()));
        }
    };

    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse checkpoint index: {}", path.display()))
}

pub(crate) fn save_index(path: &Path, index: &CheckpointIndexDoc) -> Result<()> {
    let body = serde_json::to_string_pretty(index).context("failed to encode checkpoint index")?;
    atomic_write_text(path, &body)
        .with_context(|| format!("failed to write checkpoint index: {}", path.display()))
}

pub(crate) fn atomic_write_text(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid file path for atomic write: {}", path.display()))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp.{}", std::process::id()));

    fs::write(&tmp, body)
        .with_context(|| format!("failed to write temp file {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| {
        format!("failed to rename {} -> {}", tmp.display(), path.display())
    })
}
