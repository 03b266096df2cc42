use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use anyhow::{anyhow, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct VersionIdentifier {
    version: Version,
    raw: String,
}

impl VersionIdentifier {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("version string is empty"));
        }

        // Accept "17" and "17.1" by padding to a full semver triple.
        let padded = match trimmed.matches('.').count() {
            0 => format!("{trimmed}.0.0"),
            1 => format!("{trimmed}.0"),
            _ => trimmed.to_string(),
        };
        let version = Version::parse(&padded)
            .with_context(|| format!("failed to parse version '{trimmed}'"))?;

        Ok(Self {
            version,
            raw: trimmed.to_string(),
        })
    }

    pub fn from_version(version: Version) -> Self {
        let raw = version.to_string();
        Self { version, raw }
    }

    pub fn major(&self) -> u64 {
        self.version.major
    }

    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    pub fn as_version(&self) -> &Version {
        &self.version
    }

    pub fn canonical(&self) -> String {
        self.version.to_string()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for VersionIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for VersionIdentifier {}

impl PartialOrd for VersionIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

impl Hash for VersionIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.version.hash(state);
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl TryFrom<String> for VersionIdentifier {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionIdentifier> for String {
    fn from(value: VersionIdentifier) -> Self {
        value.raw
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    Current,
    Release(VersionIdentifier),
}

impl VersionRef {
    pub fn major(&self) -> Option<u64> {
        match self {
            Self::Current => None,
            Self::Release(version) => Some(version.major()),
        }
    }

    pub fn is_current(&self) -> bool {
        matches!(self, Self::Current)
    }
}

impl fmt::Display for VersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Release(version) => write!(f, "{version}"),
        }
    }
}
