use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use semver::{Version, VersionReq};

use chainlift_core::{
    BreakingChange, Prerequisite, PrerequisiteKind, ProjectManifest, Severity, StepExecutor,
    StepOutcome, UpgradeOptions, UpgradeStep, ValidationKind, ValidationSpec,
    VersionCapabilities, VersionIdentifier,
};

pub(crate) const SUPPORTED_MIN_MAJOR: u64 = 10;
pub(crate) const SUPPORTED_MAX_MAJOR: u64 = 20;

const FRAMEWORK_TOOL: &str = "fwk";

// Version-specific knowledge is plain data; there is one executor shape, not a
// handler class per version.
pub(crate) struct StaticCatalogue;

impl VersionCapabilities for StaticCatalogue {
    fn supports(&self, major: u64) -> bool {
        (SUPPORTED_MIN_MAJOR..=SUPPORTED_MAX_MAJOR).contains(&major)
    }

    fn release_for(&self, major: u64) -> Result<VersionIdentifier> {
        if !self.supports(major) {
            return Err(anyhow!("major version {major} is outside the supported set"));
        }
        VersionIdentifier::parse(&format!("{major}.0.0"))
    }

    fn prerequisites(&self, major: u64) -> Vec<Prerequisite> {
        vec![Prerequisite {
            kind: PrerequisiteKind::ToolVersion,
            name: FRAMEWORK_TOOL.to_string(),
            required_range: VersionReq::parse(&format!(">={}", major.saturating_sub(1)))
                .unwrap_or(VersionReq::STAR),
            critical: true,
        }]
    }

    fn breaking_changes(&self, major: u64) -> Vec<BreakingChange> {
        let mut changes = vec![BreakingChange {
            id: format!("bc-{major}-deprecations"),
            summary: format!("APIs deprecated before v{major} are removed"),
            severity: Severity::Medium,
            auto_migratable: true,
        }];
        match major {
            13 => changes.push(BreakingChange {
                id: "bc-13-config-format".to_string(),
                summary: "workspace configuration moved to the v2 schema".to_string(),
                severity: Severity::High,
                auto_migratable: true,
            }),
            16 => changes.push(BreakingChange {
                id: "bc-16-runtime-bootstrap".to_string(),
                summary: "applications must adopt the standalone bootstrap API".to_string(),
                severity: Severity::High,
                auto_migratable: false,
            }),
            18 => changes.push(BreakingChange {
                id: "bc-18-render-pipeline".to_string(),
                summary: "legacy render pipeline removed; custom renderers need review"
                    .to_string(),
                severity: Severity::Critical,
                auto_migratable: false,
            }),
            _ => {}
        }
        changes
    }

    fn validations(&self, _major: u64) -> Vec<ValidationSpec> {
        vec![
            ValidationSpec {
                kind: ValidationKind::Build,
                command: format!("{FRAMEWORK_TOOL} build"),
                timeout: Duration::from_secs(600),
                required: true,
                description: "project build".to_string(),
            },
            ValidationSpec {
                kind: ValidationKind::Compatibility,
                command: String::new(),
                timeout: Duration::from_secs(30),
                required: false,
                description: "dependency family alignment".to_string(),
            },
            ValidationSpec {
                kind: ValidationKind::Test,
                command: format!("{FRAMEWORK_TOOL} test"),
                timeout: Duration::from_secs(900),
                required: false,
                description: "test suite".to_string(),
            },
            ValidationSpec {
                kind: ValidationKind::Lint,
                command: format!("{FRAMEWORK_TOOL} lint"),
                timeout: Duration::from_secs(300),
                required: false,
                description: "lint checks".to_string(),
            },
        ]
    }
}

// Default executor: rewrites the manifest so the framework version and the
// dependencies that track it land on the step's target major.
pub(crate) struct ManifestStepExecutor;

impl StepExecutor for ManifestStepExecutor {
    fn execute(
        &self,
        project_dir: &Path,
        step: &UpgradeStep,
        _options: &UpgradeOptions,
    ) -> Result<StepOutcome> {
        let mut manifest = ProjectManifest::load(project_dir)?;
        let old_major = manifest.project.framework_version.major;
        let target_major = step.to.major();

        let mut applied_changes = vec![format!(
            "framework_version {} -> {}",
            manifest.project.framework_version, step.to
        )];
        manifest.project.framework_version = step.to.as_version().clone();

        for (name, dep_version) in manifest.dependencies.iter_mut() {
            if dep_version.major == old_major {
                applied_changes.push(format!("{name} {dep_version} -> {target_major}.0.0"));
                *dep_version = Version::new(target_major, 0, 0);
            }
        }
        manifest.save(project_dir)?;

        Ok(StepOutcome {
            applied_changes,
            warnings: Vec::new(),
        })
    }

    fn validate_prerequisites(&self, project_dir: &Path) -> Result<()> {
        ProjectManifest::load(project_dir).map(|_| ())
    }
}
