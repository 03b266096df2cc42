use std::time::Duration;

use super::*;

fn version(input: &str) -> VersionIdentifier {
    VersionIdentifier::parse(input).expect("version should parse")
}

fn bare_step(to_major: u64) -> UpgradeStep {
    UpgradeStep {
        from: VersionRef::Current,
        to: version(&format!("{to_major}.0.0")),
        required: true,
        prerequisites: Vec::new(),
        breaking_changes: Vec::new(),
        validations: Vec::new(),
    }
}

#[test]
fn parse_lenient_version_forms() {
    assert_eq!(version("17").major(), 17);
    assert_eq!(version("17").canonical(), "17.0.0");
    assert_eq!(version("17.1").canonical(), "17.1.0");
    assert_eq!(version("17.1.3").canonical(), "17.1.3");
    assert_eq!(version("17").raw(), "17");
}

#[test]
fn version_equality_ignores_raw_form() {
    assert_eq!(version("17"), version("17.0.0"));
    assert!(version("17.1") > version("17.0.5"));
}

#[test]
fn version_rejects_garbage() {
    assert!(VersionIdentifier::parse("").is_err());
    assert!(VersionIdentifier::parse("seventeen").is_err());
}

#[test]
fn version_ref_displays_sentinel() {
    assert_eq!(VersionRef::Current.to_string(), "current");
    assert_eq!(
        VersionRef::Release(version("15.0.0")).to_string(),
        "15.0.0"
    );
    assert_eq!(VersionRef::Current.major(), None);
}

#[test]
fn plan_requires_ascending_majors() {
    let err = UpgradePlan::new(version("17"), version("15"), Vec::new())
        .expect_err("descending range must fail");
    assert!(matches!(err, UpgradeError::InvalidRange { .. }));

    let err = UpgradePlan::new(version("17"), version("17.2"), Vec::new())
        .expect_err("same-major range must fail");
    assert!(matches!(err, UpgradeError::InvalidRange { .. }));
}

#[test]
fn plan_requires_contiguous_steps() {
    // 15 -> 17 skipping 16 is not a valid chain.
    let steps = vec![bare_step(15), bare_step(17)];
    let err = UpgradePlan::new(version("14"), version("17"), steps)
        .expect_err("gap in majors must fail");
    assert!(matches!(err, UpgradeError::InvalidRange { .. }));

    let steps = vec![bare_step(15), bare_step(16), bare_step(17)];
    let plan = UpgradePlan::new(version("14"), version("17"), steps).expect("plan must build");
    assert_eq!(plan.steps().len(), 3);
    assert_eq!(plan.span(), 3);
}

#[test]
fn parse_project_manifest() {
    let content = r#"
[project]
name = "storefront"
framework_version = "14.2.0"

[dependencies]
acme-router = "14.2.0"
acme-forms = "14.1.3"
left-pad = "1.3.0"
"#;

    let manifest = ProjectManifest::from_toml_str(content).expect("manifest should parse");
    assert_eq!(manifest.project.name, "storefront");
    assert_eq!(manifest.project.framework_version.major, 14);
    assert_eq!(
        manifest
            .dependency_version("acme-forms")
            .map(ToString::to_string)
            .as_deref(),
        Some("14.1.3")
    );
}

#[test]
fn manifest_rejects_empty_name() {
    let content = r#"
[project]
name = "  "
framework_version = "14.0.0"
"#;
    assert!(ProjectManifest::from_toml_str(content).is_err());
}

#[test]
fn severity_weights_are_ordered() {
    assert!(Severity::Critical.weight() > Severity::High.weight());
    assert!(Severity::High.weight() > Severity::Medium.weight());
    assert!(Severity::Medium.weight() > Severity::Low.weight());
}

#[test]
fn prerequisite_kind_round_trips() {
    for kind in [
        PrerequisiteKind::ToolVersion,
        PrerequisiteKind::DependencyVersion,
        PrerequisiteKind::EnvironmentCapability,
    ] {
        assert_eq!(
            PrerequisiteKind::parse(kind.as_str()).expect("kind should parse"),
            kind
        );
    }
    assert!(PrerequisiteKind::parse("os-version").is_err());
}

#[test]
fn command_output_summary_prefers_stderr() {
    let output = CommandOutput {
        stdout: "ok\n".to_string(),
        stderr: "warning: deprecated flag\n".to_string(),
        status_code: Some(1),
    };
    assert_eq!(output.summary(), "warning: deprecated flag");
    assert!(!output.success());

    let silent = CommandOutput {
        stdout: String::new(),
        stderr: String::new(),
        status_code: Some(2),
    };
    assert_eq!(silent.summary(), "exit status 2");
}

#[test]
fn critical_prerequisites_filter() {
    let mut step = bare_step(15);
    step.prerequisites = vec![
        Prerequisite {
            kind: PrerequisiteKind::ToolVersion,
            name: "acme".to_string(),
            required_range: semver::VersionReq::parse(">=14").expect("valid range"),
            critical: true,
        },
        Prerequisite {
            kind: PrerequisiteKind::EnvironmentCapability,
            name: "CI".to_string(),
            required_range: semver::VersionReq::STAR,
            critical: false,
        },
    ];
    let critical: Vec<_> = step.critical_prerequisites().collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].name, "acme");
}

#[test]
fn validation_spec_holds_opaque_command() {
    let spec = ValidationSpec {
        kind: ValidationKind::Build,
        command: "acme build --configuration production".to_string(),
        timeout: Duration::from_secs(300),
        required: true,
        description: "production build".to_string(),
    };
    assert_eq!(spec.kind.as_str(), "build");
    assert!(spec.required);
}
