use std::path::PathBuf;
use std::time::Duration;

use log::{debug, warn};

use chainlift_core::{
    CommandRunner, Prerequisite, PrerequisiteKind, ProjectManifest, UpgradeError, ValidationKind,
    ValidationSpec, VersionIdentifier,
};

mod command;
mod compat;

pub use command::SystemCommandRunner;

const TOOL_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn passed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            warnings: Vec::new(),
        }
    }

    fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error.into()),
            warnings: Vec::new(),
        }
    }
}

pub struct ValidationRunner {
    project_dir: PathBuf,
    runner: Box<dyn CommandRunner>,
}

impl ValidationRunner {
    pub fn new(project_dir: impl Into<PathBuf>, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            project_dir: project_dir.into(),
            runner,
        }
    }

    // Failures are carried in the result; the caller escalates based on
    // spec.required. A timeout fails the check, it never hangs the run.
    pub fn run(&self, spec: &ValidationSpec) -> ValidationResult {
        debug!("running {} validation: {}", spec.kind.as_str(), spec.description);
        match spec.kind {
            ValidationKind::Build
            | ValidationKind::Test
            | ValidationKind::Lint
            | ValidationKind::Runtime => self.run_command_validation(spec),
            ValidationKind::Compatibility => self.run_compatibility_validation(spec),
        }
    }

    fn run_command_validation(&self, spec: &ValidationSpec) -> ValidationResult {
        match self.runner.run(&spec.command, &self.project_dir, spec.timeout) {
            Ok(output) if output.success() => {
                ValidationResult::passed(format!("{} passed", spec.description))
            }
            Ok(output) => ValidationResult::failed(
                format!("{} failed", spec.description),
                output.summary(),
            ),
            Err(err) => match err.downcast_ref::<UpgradeError>() {
                Some(UpgradeError::Timeout { timeout_secs, .. }) => ValidationResult::failed(
                    format!("{} timed out", spec.description),
                    format!("exceeded the {timeout_secs}s timeout"),
                ),
                _ => ValidationResult::failed(
                    format!("{} could not be run", spec.description),
                    format!("{err:#}"),
                ),
            },
        }
    }

    fn run_compatibility_validation(&self, spec: &ValidationSpec) -> ValidationResult {
        let manifest = match ProjectManifest::load(&self.project_dir) {
            Ok(manifest) => manifest,
            Err(err) => {
                return ValidationResult::failed(
                    format!("{} could not inspect the manifest", spec.description),
                    format!("{err:#}"),
                );
            }
        };

        let issues = compat::family_mismatches(&manifest);
        if issues.is_empty() {
            return ValidationResult::passed(format!("{}: families aligned", spec.description));
        }

        ValidationResult {
            success: false,
            message: format!(
                "{}: {} dependency major-version mismatch(es)",
                spec.description,
                issues.len()
            ),
            error: Some(issues.join("; ")),
            warnings: issues,
        }
    }

    // Narrow probe, never errors: any failure to determine satisfaction is
    // reported as unsatisfied.
    pub fn validate_prerequisite(&self, prerequisite: &Prerequisite) -> bool {
        match prerequisite.kind {
            PrerequisiteKind::ToolVersion => self.tool_version_satisfied(prerequisite),
            PrerequisiteKind::DependencyVersion => self.dependency_version_satisfied(prerequisite),
            PrerequisiteKind::EnvironmentCapability => std::env::var(&prerequisite.name)
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false),
        }
    }

    fn tool_version_satisfied(&self, prerequisite: &Prerequisite) -> bool {
        let probe = format!("{} --version", prerequisite.name);
        let output = match self.runner.run(&probe, &self.project_dir, TOOL_PROBE_TIMEOUT) {
            Ok(output) if output.success() => output,
            Ok(output) => {
                warn!("tool probe '{probe}' failed: {}", output.summary());
                return false;
            }
            Err(err) => {
                warn!("tool probe '{probe}' errored: {err:#}");
                return false;
            }
        };

        match parse_reported_version(&output.stdout) {
            Some(version) => prerequisite.required_range.matches(version.as_version()),
            None => false,
        }
    }

    fn dependency_version_satisfied(&self, prerequisite: &Prerequisite) -> bool {
        let manifest = match ProjectManifest::load(&self.project_dir) {
            Ok(manifest) => manifest,
            Err(_) => return false,
        };
        manifest
            .dependency_version(&prerequisite.name)
            .map(|version| prerequisite.required_range.matches(version))
            .unwrap_or(false)
    }
}

pub fn parse_reported_version(output: &str) -> Option<VersionIdentifier> {
    output
        .split_whitespace()
        .map(|token| token.trim_start_matches('v'))
        .filter(|token| token.chars().next().is_some_and(|ch| ch.is_ascii_digit()))
        .find_map(|token| VersionIdentifier::parse(token).ok())
}

#[cfg(test)]
mod tests;
