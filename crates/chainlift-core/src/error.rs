use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("invalid upgrade range: {from} does not precede {to}")]
    InvalidRange { from: String, to: String },

    #[error("unsupported framework version: {0}")]
    UnsupportedVersion(String),

    #[error("upgrade span of {span} major versions exceeds the safety threshold of {max}")]
    ExcessiveSpan { span: u64, max: u64 },

    #[error("no step executor registered for major version {0}")]
    NoHandler(u64),

    #[error("critical prerequisite '{name}' is not satisfied: {detail}")]
    PrerequisiteFailed { name: String, detail: String },

    #[error("upgrade step to {version} failed: {detail}")]
    StepExecution { version: String, detail: String },

    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("checkpoint '{id}' is corrupt: {detail}")]
    CheckpointCorrupt { id: String, detail: String },

    #[error("no checkpoint with a passing build and intact storage is available")]
    NoValidCheckpoint,

    #[error("command '{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },
}
