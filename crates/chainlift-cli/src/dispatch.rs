use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use chainlift_core::{
    CheckpointFrequency, ProjectAnalyzer, ProjectManifest, RollbackPolicy, UpgradeOptions,
    UpgradeStrategy, ValidationKind, ValidationLevel, VersionCapabilities, VersionIdentifier,
};
use chainlift_engine::{
    ExecutorRegistry, ManifestAnalyzer, Orchestrator, PostRollbackValidation, RollbackController,
    RollbackOptions,
};
use chainlift_planner::{complexity_score, estimate_duration, plan};
use chainlift_runner::{SystemCommandRunner, ValidationRunner};
use chainlift_store::{BuildProbe, CheckpointStore};

use crate::catalogue::{
    ManifestStepExecutor, StaticCatalogue, SUPPORTED_MAX_MAJOR, SUPPORTED_MIN_MAJOR,
};
use crate::render::{self, OutputStyle, TerminalReporter};
use crate::{CheckpointCommands, Cli, Commands, FrequencyArg, LevelArg, PolicyArg, StrategyArg};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let style = render::output_style(cli.plain);
    let project_dir = cli
        .project_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Plan {
            from,
            to,
            level,
            strategy,
        } => {
            let target = VersionIdentifier::parse(&to)?;
            let current = match from {
                Some(raw) => VersionIdentifier::parse(&raw)?,
                None => ManifestAnalyzer::new().analyze(&project_dir)?.current_version,
            };

            let mut options = UpgradeOptions::for_dir(&project_dir);
            options.validation_level = level.map(ValidationLevel::from).unwrap_or_default();
            options.strategy = strategy.map(UpgradeStrategy::from).unwrap_or_default();

            let catalogue = StaticCatalogue;
            let upgrade_plan = plan(&current, &target, &catalogue, &options)?;
            let estimate = estimate_duration(&upgrade_plan, &options);
            let complexity = complexity_score(&upgrade_plan);
            for line in render::format_plan_lines(&upgrade_plan, estimate, &complexity) {
                println!("{line}");
            }
        }
        Commands::Upgrade {
            to,
            level,
            checkpoint_frequency,
            rollback_policy,
            dry_run,
        } => {
            let target = VersionIdentifier::parse(&to)?;
            let mut options = UpgradeOptions::for_dir(&project_dir);
            options.validation_level = level.map(ValidationLevel::from).unwrap_or_default();
            options.checkpoint_frequency = checkpoint_frequency
                .map(CheckpointFrequency::from)
                .unwrap_or_default();
            options.rollback_policy = rollback_policy
                .map(RollbackPolicy::from)
                .unwrap_or_default();

            let catalogue = StaticCatalogue;
            let analyzer = ManifestAnalyzer::new();

            if dry_run {
                let current = analyzer.analyze(&project_dir)?.current_version;
                let upgrade_plan = plan(&current, &target, &catalogue, &options)?;
                let estimate = estimate_duration(&upgrade_plan, &options);
                let complexity = complexity_score(&upgrade_plan);
                for line in render::format_plan_lines(&upgrade_plan, estimate, &complexity) {
                    println!("{line}");
                }
                render::print_status(style, "ok", "dry run: no changes were made");
                return Ok(());
            }

            let store = open_store(&project_dir, &catalogue);
            let validator =
                ValidationRunner::new(&project_dir, Box::new(SystemCommandRunner::new()));
            let registry = default_registry();
            let reporter = TerminalReporter::new(style);

            let mut orchestrator =
                Orchestrator::new(&analyzer, &catalogue, &registry, &store, &validator);
            orchestrator.add_observer(&reporter);

            let result = orchestrator.orchestrate(&target, &options)?;
            for line in render::format_result_lines(&result) {
                println!("{line}");
            }
            if !result.success {
                let error = result
                    .error
                    .unwrap_or_else(|| "unknown failure".to_string());
                return Err(anyhow!("upgrade failed: {error}"));
            }
        }
        Commands::Checkpoint { command } => {
            run_checkpoint_command(command, &project_dir, style)?;
        }
        Commands::Rollback {
            to,
            last_good,
            progressive,
            preserve,
            backup,
            validate_after,
        } => {
            let catalogue = StaticCatalogue;
            let store = open_store(&project_dir, &catalogue);
            let validator =
                ValidationRunner::new(&project_dir, Box::new(SystemCommandRunner::new()));
            let post_validation = PostRollbackValidation {
                runner: &validator,
                specs: catalogue
                    .validations(SUPPORTED_MIN_MAJOR)
                    .into_iter()
                    .filter(|spec| spec.kind == ValidationKind::Build)
                    .collect(),
            };
            let controller =
                RollbackController::new(&store).with_post_validation(post_validation);

            let result = if last_good {
                controller.rollback_to_last_good()?
            } else if progressive {
                controller.progressive_rollback(to.as_deref())?
            } else {
                let id = to.ok_or_else(|| {
                    anyhow!("pass --to <checkpoint-id>, --last-good, or --progressive")
                })?;
                controller.rollback_to(
                    &id,
                    &RollbackOptions {
                        preserve_files: preserve,
                        backup_before: backup,
                        validate_after,
                    },
                )?
            };

            render::print_status(
                style,
                "done",
                &format!(
                    "restored checkpoint {} (version {})",
                    result.checkpoint_id, result.restored_version_label
                ),
            );
            for warning in &result.warnings {
                render::print_status(style, "warn", warning);
            }
        }
        Commands::Doctor => {
            run_doctor(&project_dir, style)?;
        }
        Commands::Completions { shell } => {
            crate::completion::write_completions_script(shell, &mut std::io::stdout())?;
        }
    }

    Ok(())
}

fn run_checkpoint_command(
    command: CheckpointCommands,
    project_dir: &Path,
    style: OutputStyle,
) -> Result<()> {
    let catalogue = StaticCatalogue;
    let store = open_store(project_dir, &catalogue);

    match command {
        CheckpointCommands::List => {
            for line in render::format_checkpoint_lines(&store.list()?) {
                println!("{line}");
            }
        }
        CheckpointCommands::Create { description } => {
            let version_label = ProjectManifest::load_if_present(project_dir)?
                .map(|manifest| manifest.project.framework_version.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let checkpoint = store.create_checkpoint(
                &version_label,
                description.as_deref().unwrap_or("manual checkpoint"),
            )?;
            render::print_status(
                style,
                "done",
                &format!("created checkpoint {} at v{version_label}", checkpoint.id),
            );
        }
        CheckpointCommands::Delete { id } => {
            store.delete(&id)?;
            render::print_status(style, "done", &format!("deleted checkpoint {id}"));
        }
        CheckpointCommands::Cleanup { keep } => {
            let deleted = store.cleanup(keep)?;
            render::print_status(
                style,
                "done",
                &format!("removed {} checkpoint(s), kept {keep} most recent", deleted.len()),
            );
        }
        CheckpointCommands::Validate { id } => {
            let validation = store.validate(&id);
            for line in render::format_validation_lines(&id, &validation) {
                println!("{line}");
            }
            if !validation.valid {
                return Err(anyhow!("checkpoint {id} failed validation"));
            }
        }
    }
    Ok(())
}

fn run_doctor(project_dir: &Path, style: OutputStyle) -> Result<()> {
    println!("project: {}", project_dir.display());
    match ProjectManifest::load_if_present(project_dir)
        .context("project manifest is unreadable")?
    {
        Some(manifest) => render::print_status(
            style,
            "ok",
            &format!(
                "{} on framework v{}",
                manifest.project.name, manifest.project.framework_version
            ),
        ),
        None => render::print_status(style, "warn", "no project.toml found"),
    }

    let catalogue = StaticCatalogue;
    let store = open_store(project_dir, &catalogue);
    println!("store: {}", store.layout().store_dir().display());
    println!(
        "supported majors: {SUPPORTED_MIN_MAJOR}..={SUPPORTED_MAX_MAJOR}"
    );
    render::print_status(
        style,
        "ok",
        &format!("{} checkpoint(s) recorded", store.list()?.len()),
    );
    Ok(())
}

fn open_store(project_dir: &Path, catalogue: &dyn VersionCapabilities) -> CheckpointStore {
    let build_command = catalogue
        .validations(SUPPORTED_MIN_MAJOR)
        .into_iter()
        .find(|spec| spec.kind == ValidationKind::Build);

    let store = CheckpointStore::open(project_dir);
    match build_command {
        Some(spec) => store.with_build_probe(BuildProbe {
            runner: Box::new(SystemCommandRunner::new()),
            command: spec.command,
            timeout: Duration::from_secs(spec.timeout.as_secs().max(60)),
        }),
        None => store,
    }
}

fn default_registry() -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    for major in SUPPORTED_MIN_MAJOR..=SUPPORTED_MAX_MAJOR {
        registry.register(major, Box::new(ManifestStepExecutor));
    }
    registry
}

impl From<LevelArg> for ValidationLevel {
    fn from(value: LevelArg) -> Self {
        match value {
            LevelArg::Basic => Self::Basic,
            LevelArg::Standard => Self::Standard,
            LevelArg::Comprehensive => Self::Comprehensive,
        }
    }
}

impl From<StrategyArg> for UpgradeStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Conservative => Self::Conservative,
            StrategyArg::Balanced => Self::Balanced,
            StrategyArg::Progressive => Self::Progressive,
        }
    }
}

impl From<FrequencyArg> for CheckpointFrequency {
    fn from(value: FrequencyArg) -> Self {
        match value {
            FrequencyArg::EveryStep => Self::EveryStep,
            FrequencyArg::MajorVersions => Self::MajorVersions,
            FrequencyArg::Disabled => Self::Disabled,
        }
    }
}

impl From<PolicyArg> for RollbackPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Automatic => Self::Automatic,
            PolicyArg::Manual => Self::Manual,
        }
    }
}
