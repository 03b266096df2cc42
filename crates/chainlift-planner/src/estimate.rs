use std::time::Duration;

use chainlift_core::{Severity, UpgradeOptions, UpgradePlan};

const STEP_BASE_SECS: u64 = 120;
const SEVERITY_SURCHARGE_SECS: u64 = 20;
const VALIDATION_SECS: u64 = 45;

pub fn estimate_duration(plan: &UpgradePlan, options: &UpgradeOptions) -> Duration {
    let mut raw_secs = 0_u64;
    for step in plan.steps() {
        raw_secs += STEP_BASE_SECS;
        raw_secs += step
            .breaking_changes
            .iter()
            .map(|change| change.severity.weight() * SEVERITY_SURCHARGE_SECS)
            .sum::<u64>();
        raw_secs += step.validations.len() as u64 * VALIDATION_SECS;
    }

    let scaled = raw_secs as f64
        * options.strategy.duration_factor()
        * options.validation_level.duration_factor();
    Duration::from_secs(scaled.ceil() as u64)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexityReport {
    pub score: u64,
    pub factors: Vec<String>,
}

pub fn complexity_score(plan: &UpgradePlan) -> ComplexityReport {
    let mut score = 0_u64;
    let mut factors = Vec::new();

    let span = plan.span();
    score += span * 2;
    factors.push(format!("{span} major version boundaries to cross"));

    let mut manual_changes = 0_usize;
    for step in plan.steps() {
        for change in &step.breaking_changes {
            score += change.severity.weight();
            if !change.auto_migratable {
                manual_changes += 1;
            }
        }
    }

    let critical = plan
        .steps()
        .iter()
        .flat_map(|step| &step.breaking_changes)
        .filter(|change| change.severity == Severity::Critical)
        .count();
    if critical > 0 {
        factors.push(format!("{critical} critical breaking change(s)"));
    }
    if manual_changes > 0 {
        score += manual_changes as u64 * 3;
        factors.push(format!(
            "{manual_changes} change(s) require manual migration"
        ));
    }

    ComplexityReport { score, factors }
}
