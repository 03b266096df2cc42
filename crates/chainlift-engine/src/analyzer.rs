use std::path::Path;

use anyhow::{Context, Result};

use chainlift_core::{ProjectAnalyzer, ProjectManifest, ProjectState, VersionIdentifier};

#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestAnalyzer;

impl ManifestAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl ProjectAnalyzer for ManifestAnalyzer {
    fn analyze(&self, project_dir: &Path) -> Result<ProjectState> {
        let manifest = ProjectManifest::load(project_dir)
            .with_context(|| format!("cannot analyze project at {}", project_dir.display()))?;
        let current_version =
            VersionIdentifier::from_version(manifest.project.framework_version.clone());

        Ok(ProjectState {
            current_version,
            project_name: manifest.project.name.clone(),
            manifest,
        })
    }
}
