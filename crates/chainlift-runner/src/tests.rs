use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use chainlift_core::{
    CommandOutput, CommandRunner, Prerequisite, PrerequisiteKind, UpgradeError, ValidationKind,
    ValidationSpec,
};
use semver::VersionReq;

use super::*;

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_project_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!(
        "chainlift-runner-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    fs::create_dir_all(&path).expect("must create test dir");
    path
}

struct ScriptedRunner {
    responses: RefCell<Vec<Result<CommandOutput>>>,
    commands: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    fn new(responses: Vec<Result<CommandOutput>>) -> Self {
        Self {
            responses: RefCell::new(responses),
            commands: RefCell::new(Vec::new()),
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str, _cwd: &Path, _timeout: Duration) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(command.to_string());
        self.responses.borrow_mut().remove(0)
    }
}

fn ok_output(stdout: &str) -> Result<CommandOutput> {
    Ok(CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        status_code: Some(0),
    })
}

fn failed_output(stderr: &str) -> Result<CommandOutput> {
    Ok(CommandOutput {
        stdout: String::new(),
        stderr: stderr.to_string(),
        status_code: Some(1),
    })
}

fn build_spec() -> ValidationSpec {
    ValidationSpec {
        kind: ValidationKind::Build,
        command: "acme build".to_string(),
        timeout: Duration::from_secs(300),
        required: true,
        description: "production build".to_string(),
    }
}

fn write_manifest(dir: &Path, dependencies: &str) {
    fs::write(
        dir.join("project.toml"),
        format!(
            "[project]\nname = \"storefront\"\nframework_version = \"15.0.0\"\n\n[dependencies]\n{dependencies}"
        ),
    )
    .expect("must write manifest");
}

#[test]
fn command_validation_passes_on_zero_exit() {
    let dir = test_project_dir();
    let runner = ValidationRunner::new(&dir, Box::new(ScriptedRunner::new(vec![ok_output("")])));
    let result = runner.run(&build_spec());
    assert!(result.success);
    assert!(result.error.is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn command_validation_reports_failure_output() {
    let dir = test_project_dir();
    let runner = ValidationRunner::new(
        &dir,
        Box::new(ScriptedRunner::new(vec![failed_output(
            "error TS2551: property renamed",
        )])),
    );
    let result = runner.run(&build_spec());
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("error TS2551: property renamed"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn timed_out_validation_reports_timeout_not_hang() {
    let dir = test_project_dir();
    let runner = ValidationRunner::new(
        &dir,
        Box::new(ScriptedRunner::new(vec![Err(UpgradeError::Timeout {
            command: "acme build".to_string(),
            timeout_secs: 300,
        }
        .into())])),
    );
    let result = runner.run(&build_spec());
    assert!(!result.success);
    assert!(result.message.contains("timed out"));
    assert_eq!(
        result.error.as_deref(),
        Some("exceeded the 300s timeout")
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn compatibility_reports_family_major_mismatches() {
    let dir = test_project_dir();
    write_manifest(
        &dir,
        "acme-router = \"15.0.0\"\nacme-forms = \"14.1.3\"\nleft-pad = \"1.3.0\"\n",
    );
    let runner = ValidationRunner::new(&dir, Box::new(ScriptedRunner::new(Vec::new())));

    let result = runner.run(&ValidationSpec {
        kind: ValidationKind::Compatibility,
        command: String::new(),
        timeout: Duration::from_secs(30),
        required: false,
        description: "dependency families".to_string(),
    });
    assert!(!result.success);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("acme-forms 14.1.3"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn compatibility_passes_when_families_agree() {
    let dir = test_project_dir();
    write_manifest(&dir, "acme-router = \"15.0.0\"\nacme-forms = \"15.2.1\"\n");
    let runner = ValidationRunner::new(&dir, Box::new(ScriptedRunner::new(Vec::new())));

    let result = runner.run(&ValidationSpec {
        kind: ValidationKind::Compatibility,
        command: String::new(),
        timeout: Duration::from_secs(30),
        required: false,
        description: "dependency families".to_string(),
    });
    assert!(result.success, "unexpected issues: {:?}", result.warnings);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn scoped_packages_share_a_family() {
    assert_eq!(
        compat::family_key("@acme/router").as_deref(),
        Some("@acme")
    );
    assert_eq!(compat::family_key("acme-router").as_deref(), Some("acme"));
    assert_eq!(compat::family_key("lodash"), None);
}

#[test]
fn tool_prerequisite_matches_reported_version() {
    let dir = test_project_dir();
    let prerequisite = Prerequisite {
        kind: PrerequisiteKind::ToolVersion,
        name: "acme".to_string(),
        required_range: VersionReq::parse(">=15").expect("valid range"),
        critical: true,
    };

    let runner = ValidationRunner::new(
        &dir,
        Box::new(ScriptedRunner::new(vec![ok_output("acme cli v15.1.0 (stable)")])),
    );
    assert!(runner.validate_prerequisite(&prerequisite));

    let runner = ValidationRunner::new(
        &dir,
        Box::new(ScriptedRunner::new(vec![ok_output("acme cli v14.9.2 (stable)")])),
    );
    assert!(!runner.validate_prerequisite(&prerequisite));

    // A missing tool is unsatisfied, never an error.
    let runner = ValidationRunner::new(
        &dir,
        Box::new(ScriptedRunner::new(vec![Err(anyhow::anyhow!(
            "no such program"
        ))])),
    );
    assert!(!runner.validate_prerequisite(&prerequisite));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn dependency_prerequisite_reads_the_manifest() {
    let dir = test_project_dir();
    write_manifest(&dir, "acme-router = \"15.0.0\"\n");
    let runner = ValidationRunner::new(&dir, Box::new(ScriptedRunner::new(Vec::new())));

    let satisfied = Prerequisite {
        kind: PrerequisiteKind::DependencyVersion,
        name: "acme-router".to_string(),
        required_range: VersionReq::parse(">=14, <16").expect("valid range"),
        critical: true,
    };
    assert!(runner.validate_prerequisite(&satisfied));

    let absent = Prerequisite {
        kind: PrerequisiteKind::DependencyVersion,
        name: "acme-animations".to_string(),
        required_range: VersionReq::parse(">=14").expect("valid range"),
        critical: false,
    };
    assert!(!runner.validate_prerequisite(&absent));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn environment_prerequisite_checks_variables() {
    let dir = test_project_dir();
    let runner = ValidationRunner::new(&dir, Box::new(ScriptedRunner::new(Vec::new())));

    std::env::set_var("CHAINLIFT_TEST_CAPABILITY", "enabled");
    let present = Prerequisite {
        kind: PrerequisiteKind::EnvironmentCapability,
        name: "CHAINLIFT_TEST_CAPABILITY".to_string(),
        required_range: VersionReq::STAR,
        critical: false,
    };
    assert!(runner.validate_prerequisite(&present));

    let missing = Prerequisite {
        kind: PrerequisiteKind::EnvironmentCapability,
        name: "CHAINLIFT_TEST_CAPABILITY_UNSET".to_string(),
        required_range: VersionReq::STAR,
        critical: false,
    };
    assert!(!runner.validate_prerequisite(&missing));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn parse_reported_version_skips_prose() {
    let version = parse_reported_version("acme cli version v16.2.0 (production)")
        .expect("must find a version");
    assert_eq!(version.canonical(), "16.2.0");
    assert!(parse_reported_version("no digits here").is_none());
}

#[cfg(unix)]
#[test]
fn system_runner_captures_output() {
    let dir = test_project_dir();
    let runner = SystemCommandRunner::new();
    let output = runner
        .run("echo chainlift", &dir, Duration::from_secs(10))
        .expect("echo must run");
    assert!(output.success());
    assert_eq!(output.stdout.trim(), "chainlift");

    let _ = fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn system_runner_kills_on_timeout() {
    let dir = test_project_dir();
    let runner = SystemCommandRunner::new();
    let err = runner
        .run("sleep 5", &dir, Duration::from_millis(200))
        .expect_err("sleep must time out");
    assert!(matches!(
        err.downcast_ref::<UpgradeError>(),
        Some(UpgradeError::Timeout { .. })
    ));

    let _ = fs::remove_dir_all(&dir);
}
