use std::cell::RefCell;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};

use chainlift_core::{
    Checkpoint, CheckpointValidation, ProgressObserver, UpgradeEvent, UpgradePlan, UpgradeResult,
};
use chainlift_planner::ComplexityReport;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn output_style(plain_flag: bool) -> OutputStyle {
    if plain_flag {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

fn status_style(status: &str) -> Style {
    match status {
        "ok" | "done" => Style::new()
            .fg_color(Some(AnsiColor::Green.into()))
            .effects(Effects::BOLD),
        "warn" => Style::new()
            .fg_color(Some(AnsiColor::Yellow.into()))
            .effects(Effects::BOLD),
        "fail" => Style::new()
            .fg_color(Some(AnsiColor::Red.into()))
            .effects(Effects::BOLD),
        _ => Style::new().effects(Effects::BOLD),
    }
}

fn colorize(style: Style, text: &str) -> String {
    format!("{style}{text}{}", style.render_reset())
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => format!("[{status}] {message}"),
        OutputStyle::Rich => {
            format!("{} {message}", colorize(status_style(status), status))
        }
    }
}

pub(crate) fn print_status(style: OutputStyle, status: &str, message: &str) {
    println!("{}", render_status_line(style, status, message));
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    if total_secs < 60 {
        return format!("{total_secs}s");
    }
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}

pub(crate) fn format_plan_lines(
    plan: &UpgradePlan,
    estimate: Duration,
    complexity: &ComplexityReport,
) -> Vec<String> {
    let mut lines = vec![format!(
        "Upgrade path {} -> {} ({} step(s), estimated {})",
        plan.from_version(),
        plan.to_version(),
        plan.steps().len(),
        format_duration(estimate)
    )];
    for (index, step) in plan.steps().iter().enumerate() {
        lines.push(format!(
            "  {}. {} -> {}  [{} change(s), {} validation(s)]",
            index + 1,
            step.from,
            step.to,
            step.breaking_changes.len(),
            step.validations.len()
        ));
        for change in &step.breaking_changes {
            if !change.auto_migratable {
                lines.push(format!(
                    "       manual: {} ({})",
                    change.summary,
                    change.severity.as_str()
                ));
            }
        }
    }
    lines.push(format!("Complexity score: {}", complexity.score));
    for factor in &complexity.factors {
        lines.push(format!("  - {factor}"));
    }
    lines
}

pub(crate) fn format_checkpoint_lines(checkpoints: &[Checkpoint]) -> Vec<String> {
    if checkpoints.is_empty() {
        return vec!["No checkpoints recorded.".to_string()];
    }
    checkpoints
        .iter()
        .map(|checkpoint| {
            format!(
                "{}  v{}  {}  [build: {}, {} file(s)]",
                checkpoint.id,
                checkpoint.version_label,
                checkpoint.description,
                checkpoint.metadata.build_status.as_str(),
                checkpoint.metadata.file_count
            )
        })
        .collect()
}

pub(crate) fn format_validation_lines(id: &str, validation: &CheckpointValidation) -> Vec<String> {
    if validation.valid {
        return vec![format!("Checkpoint {id} is intact.")];
    }
    let mut lines = vec![format!("Checkpoint {id} failed validation:")];
    for error in &validation.errors {
        lines.push(format!("  - {error}"));
    }
    lines
}

pub(crate) fn format_result_lines(result: &UpgradeResult) -> Vec<String> {
    let mut lines = Vec::new();
    if result.success {
        lines.push(format!(
            "Upgrade {} -> {} succeeded in {} ({} step(s)).",
            result.from_version,
            result.to_version,
            format_duration(result.duration),
            result.completed_steps.len()
        ));
    } else {
        lines.push(format!(
            "Upgrade {} -> {} failed after {} completed step(s).",
            result.from_version,
            result.to_version,
            result.completed_steps.len()
        ));
        if let Some(error) = &result.error {
            lines.push(format!("  error: {error}"));
        }
        if let Some(rollback_error) = &result.rollback_error {
            lines.push(format!("  rollback also failed: {rollback_error}"));
        }
    }
    for step in &result.completed_steps {
        lines.push(format!(
            "  step to {} ({})",
            step.to,
            format_duration(step.elapsed)
        ));
    }
    if !result.warnings.is_empty() {
        lines.push(format!("{} warning(s):", result.warnings.len()));
        for warning in &result.warnings {
            lines.push(format!("  - {warning}"));
        }
    }
    lines.push(format!(
        "Checkpoints: {} (rollback {})",
        result.checkpoints.len(),
        if result.rollback_available {
            "available"
        } else {
            "unavailable"
        }
    ));
    lines
}

pub(crate) struct TerminalReporter {
    style: OutputStyle,
    bar: RefCell<Option<ProgressBar>>,
}

impl TerminalReporter {
    pub(crate) fn new(style: OutputStyle) -> Self {
        Self {
            style,
            bar: RefCell::new(None),
        }
    }

    fn start_bar(&self, total: u64) {
        if self.style != OutputStyle::Rich {
            return;
        }
        let bar = ProgressBar::new(total.max(1));
        if let Ok(bar_style) = ProgressStyle::with_template(
            "{spinner:.cyan.bold} {msg:<24} [{bar:20.cyan/blue}] {pos:>2}/{len:2}",
        ) {
            bar.set_style(bar_style);
        }
        *self.bar.borrow_mut() = Some(bar);
    }

    fn finish_bar(&self) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_and_clear();
        }
    }

    fn suspended_print(&self, status: &str, message: &str) {
        let line = render_status_line(self.style, status, message);
        match self.bar.borrow().as_ref() {
            Some(bar) => bar.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }
}

impl ProgressObserver for TerminalReporter {
    fn on_event(&self, event: &UpgradeEvent) {
        match event {
            UpgradeEvent::AnalysisCompleted { current_version } => {
                self.suspended_print("ok", &format!("project is on version {current_version}"));
            }
            UpgradeEvent::PlanCalculated { from, to, step_count } => {
                self.suspended_print(
                    "ok",
                    &format!("planned {step_count} step(s) from {from} to {to}"),
                );
                self.start_bar(*step_count as u64);
            }
            UpgradeEvent::StepStarted { to, .. } => {
                if let Some(bar) = self.bar.borrow().as_ref() {
                    bar.set_message(format!("upgrading to {to}"));
                }
            }
            UpgradeEvent::StepCompleted { to, .. } => {
                if let Some(bar) = self.bar.borrow().as_ref() {
                    bar.inc(1);
                }
                self.suspended_print("done", &format!("step to {to} complete"));
            }
            UpgradeEvent::StepFailed { to, detail, .. } => {
                self.finish_bar();
                self.suspended_print("fail", &format!("step to {to} failed: {detail}"));
            }
            UpgradeEvent::ManualInterventionRequired { change_id, summary, .. } => {
                self.suspended_print("warn", &format!("manual follow-up {change_id}: {summary}"));
            }
            UpgradeEvent::CheckpointCreated { id, label } => {
                self.suspended_print("ok", &format!("checkpoint {id} captured at v{label}"));
            }
            UpgradeEvent::RollbackStarted { checkpoint_id } => {
                self.finish_bar();
                self.suspended_print("warn", &format!("rolling back to {checkpoint_id}"));
            }
            UpgradeEvent::RollbackCompleted { checkpoint_id } => {
                self.suspended_print("ok", &format!("rollback to {checkpoint_id} complete"));
            }
            UpgradeEvent::RunCompleted { to } => {
                self.finish_bar();
                self.suspended_print("done", &format!("upgrade to {to} complete"));
            }
            UpgradeEvent::RunFailed { detail } => {
                self.finish_bar();
                self.suspended_print("fail", detail);
            }
        }
    }
}
