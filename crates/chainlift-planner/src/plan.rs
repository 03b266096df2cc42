use anyhow::{Context, Result};

use chainlift_core::{
    UpgradeError, UpgradeOptions, UpgradePlan, UpgradeStep, ValidationKind, ValidationLevel,
    ValidationSpec, VersionCapabilities, VersionIdentifier, VersionRef,
};

pub fn plan(
    from: &VersionIdentifier,
    to: &VersionIdentifier,
    capabilities: &dyn VersionCapabilities,
    options: &UpgradeOptions,
) -> Result<UpgradePlan> {
    // All range checks happen before the first capability lookup.
    if from.major() >= to.major() {
        return Err(UpgradeError::InvalidRange {
            from: from.to_string(),
            to: to.to_string(),
        }
        .into());
    }
    for endpoint in [from, to] {
        if !capabilities.supports(endpoint.major()) {
            return Err(UpgradeError::UnsupportedVersion(endpoint.to_string()).into());
        }
    }
    let span = to.major() - from.major();
    if span > options.max_span {
        return Err(UpgradeError::ExcessiveSpan {
            span,
            max: options.max_span,
        }
        .into());
    }

    let mut steps = Vec::with_capacity(span as usize);
    let mut previous = VersionRef::Current;
    for major in from.major() + 1..=to.major() {
        let release = capabilities
            .release_for(major)
            .with_context(|| format!("no release known for major version {major}"))?;
        let validations =
            adjust_validations(capabilities.validations(major), options.validation_level);

        steps.push(UpgradeStep {
            from: previous,
            to: release.clone(),
            required: true,
            prerequisites: capabilities.prerequisites(major),
            breaking_changes: capabilities.breaking_changes(major),
            validations,
        });
        previous = VersionRef::Release(release);
    }

    let plan = UpgradePlan::new(from.clone(), to.clone(), steps)?;
    Ok(plan)
}

pub fn adjust_validations(
    specs: Vec<ValidationSpec>,
    level: ValidationLevel,
) -> Vec<ValidationSpec> {
    match level {
        ValidationLevel::Basic => specs
            .into_iter()
            .filter(|spec| spec.kind == ValidationKind::Build)
            .collect(),
        ValidationLevel::Standard => specs
            .into_iter()
            .filter(|spec| !matches!(spec.kind, ValidationKind::Test | ValidationKind::Lint))
            .collect(),
        ValidationLevel::Comprehensive => specs,
    }
}
