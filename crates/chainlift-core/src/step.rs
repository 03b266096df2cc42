use std::time::Duration;

use anyhow::{anyhow, Result};
use semver::VersionReq;

use crate::error::UpgradeError;
use crate::version::{VersionIdentifier, VersionRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrerequisiteKind {
    ToolVersion,
    DependencyVersion,
    EnvironmentCapability,
}

impl PrerequisiteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolVersion => "tool-version",
            Self::DependencyVersion => "dependency-version",
            Self::EnvironmentCapability => "environment-capability",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "tool-version" => Ok(Self::ToolVersion),
            "dependency-version" => Ok(Self::DependencyVersion),
            "environment-capability" => Ok(Self::EnvironmentCapability),
            _ => Err(anyhow!("invalid prerequisite kind: {value}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisite {
    pub kind: PrerequisiteKind,
    pub name: String,
    pub required_range: VersionReq,
    pub critical: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn weight(&self) -> u64 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 4,
            Self::Critical => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakingChange {
    pub id: String,
    pub summary: String,
    pub severity: Severity,
    pub auto_migratable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Build,
    Test,
    Lint,
    Runtime,
    Compatibility,
}

impl ValidationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Test => "test",
            Self::Lint => "lint",
            Self::Runtime => "runtime",
            Self::Compatibility => "compatibility",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSpec {
    pub kind: ValidationKind,
    pub command: String,
    pub timeout: Duration,
    pub required: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeStep {
    pub from: VersionRef,
    pub to: VersionIdentifier,
    pub required: bool,
    pub prerequisites: Vec<Prerequisite>,
    pub breaking_changes: Vec<BreakingChange>,
    pub validations: Vec<ValidationSpec>,
}

impl UpgradeStep {
    pub fn critical_prerequisites(&self) -> impl Iterator<Item = &Prerequisite> {
        self.prerequisites.iter().filter(|p| p.critical)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePlan {
    from: VersionIdentifier,
    to: VersionIdentifier,
    steps: Vec<UpgradeStep>,
}

impl UpgradePlan {
    // Steps must climb exactly one major per entry, from.major+1 ..= to.major.
    pub fn new(
        from: VersionIdentifier,
        to: VersionIdentifier,
        steps: Vec<UpgradeStep>,
    ) -> Result<Self, UpgradeError> {
        if from.major() >= to.major() {
            return Err(UpgradeError::InvalidRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let expected: Vec<u64> = (from.major() + 1..=to.major()).collect();
        let actual: Vec<u64> = steps.iter().map(|step| step.to.major()).collect();
        if actual != expected {
            return Err(UpgradeError::InvalidRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        Ok(Self { from, to, steps })
    }

    pub fn from_version(&self) -> &VersionIdentifier {
        &self.from
    }

    pub fn to_version(&self) -> &VersionIdentifier {
        &self.to
    }

    pub fn steps(&self) -> &[UpgradeStep] {
        &self.steps
    }

    pub fn span(&self) -> u64 {
        self.to.major() - self.from.major()
    }
}
