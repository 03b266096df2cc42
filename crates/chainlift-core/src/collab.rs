use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::manifest::ProjectManifest;
use crate::options::UpgradeOptions;
use crate::step::{BreakingChange, Prerequisite, UpgradeStep, ValidationSpec};
use crate::version::VersionIdentifier;

#[derive(Debug, Clone)]
pub struct ProjectState {
    pub current_version: VersionIdentifier,
    pub project_name: String,
    pub manifest: ProjectManifest,
}

pub trait ProjectAnalyzer {
    fn analyze(&self, project_dir: &Path) -> Result<ProjectState>;
}

pub trait VersionCapabilities {
    fn supports(&self, major: u64) -> bool;
    fn release_for(&self, major: u64) -> Result<VersionIdentifier>;
    fn prerequisites(&self, major: u64) -> Vec<Prerequisite>;
    fn breaking_changes(&self, major: u64) -> Vec<BreakingChange>;
    fn validations(&self, major: u64) -> Vec<ValidationSpec>;
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }

    pub fn summary(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.status_code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

pub trait CommandRunner {
    fn run(&self, command: &str, cwd: &Path, timeout: Duration) -> Result<CommandOutput>;
}

#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub applied_changes: Vec<String>,
    pub warnings: Vec<String>,
}

pub trait StepExecutor {
    fn execute(
        &self,
        project_dir: &Path,
        step: &UpgradeStep,
        options: &UpgradeOptions,
    ) -> Result<StepOutcome>;

    fn validate_prerequisites(&self, project_dir: &Path) -> Result<()>;
}
