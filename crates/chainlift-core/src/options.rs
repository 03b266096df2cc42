use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_SPAN: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    Basic,
    #[default]
    Standard,
    Comprehensive,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Comprehensive => "comprehensive",
        }
    }

    pub fn duration_factor(&self) -> f64 {
        match self {
            Self::Basic => 0.8,
            Self::Standard => 1.0,
            Self::Comprehensive => 1.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckpointFrequency {
    #[default]
    EveryStep,
    MajorVersions,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    #[default]
    Automatic,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpgradeStrategy {
    Conservative,
    #[default]
    Balanced,
    Progressive,
}

impl UpgradeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Progressive => "progressive",
        }
    }

    pub fn duration_factor(&self) -> f64 {
        match self {
            Self::Conservative => 1.5,
            Self::Balanced => 1.0,
            Self::Progressive => 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOptions {
    pub target_dir: PathBuf,
    pub validation_level: ValidationLevel,
    pub checkpoint_frequency: CheckpointFrequency,
    pub rollback_policy: RollbackPolicy,
    pub strategy: UpgradeStrategy,
    pub max_span: u64,
    pub rollback_on_final_warnings: bool,
}

impl UpgradeOptions {
    pub fn for_dir(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            validation_level: ValidationLevel::default(),
            checkpoint_frequency: CheckpointFrequency::default(),
            rollback_policy: RollbackPolicy::default(),
            strategy: UpgradeStrategy::default(),
            max_span: DEFAULT_MAX_SPAN,
            rollback_on_final_warnings: false,
        }
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }
}
