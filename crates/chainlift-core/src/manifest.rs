use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

pub const PROJECT_MANIFEST_NAME: &str = "project.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectManifest {
    pub project: ProjectSection,
    #[serde(default)]
    pub dependencies: BTreeMap<String, Version>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectSection {
    pub name: String,
    pub framework_version: Version,
}

impl ProjectManifest {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(input).context("failed to parse project manifest")?;
        if manifest.project.name.trim().is_empty() {
            return Err(anyhow!("project manifest has an empty project name"));
        }
        Ok(manifest)
    }

    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(PROJECT_MANIFEST_NAME);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read project manifest: {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("failed parsing project manifest: {}", path.display()))
    }

    pub fn load_if_present(project_dir: &Path) -> Result<Option<Self>> {
        let path = project_dir.join(PROJECT_MANIFEST_NAME);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read project manifest: {}", path.display())
                });
            }
        };
        let manifest = Self::from_toml_str(&raw)
            .with_context(|| format!("failed parsing project manifest: {}", path.display()))?;
        Ok(Some(manifest))
    }

    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let path = project_dir.join(PROJECT_MANIFEST_NAME);
        let body = toml::to_string_pretty(self).context("failed to serialize project manifest")?;
        fs::write(&path, body)
            .with_context(|| format!("failed to write project manifest: {}", path.display()))
    }

    pub fn dependency_version(&self, name: &str) -> Option<&Version> {
        self.dependencies.get(name)
    }
}
