//! # Version Tags
//!
//! Every deployment of the worker carries one version tag. The tag is baked
//! into the worker source at build time by replacing [`VERSION_PLACEHOLDER`],
//! and it scopes every partition name the worker creates.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::WorkerError;

/// Token substituted with the build-time version
pub const VERSION_PLACEHOLDER: &str = "%%CACHE_VERSION%%";

/// Build-time identifier used to scope and evict partitions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTag(String);

impl VersionTag {
    /// Validate an externally supplied tag.
    ///
    /// Tags end up in partition names and directory names, so only ASCII
    /// alphanumerics and `-`, `_`, `.` are accepted.
    pub fn new(tag: impl Into<String>) -> Result<Self, WorkerError> {
        let tag = tag.into();
        let valid_chars = tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if tag.is_empty() || !valid_chars || tag.starts_with('.') {
            return Err(WorkerError::InvalidVersion(tag));
        }

        Ok(Self(tag))
    }

    /// Generate a fresh tag for a new deployment
    pub fn generate() -> Self {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let nonce = Uuid::new_v4().simple().to_string();
        Self(format!("v{stamp}-{}", &nonce[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VersionTag {
    type Error = WorkerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VersionTag> for String {
    fn from(tag: VersionTag) -> Self {
        tag.0
    }
}

/// Substitute the version placeholder in a worker source text.
///
/// Fails if the source has no placeholder, since the result would silently
/// keep serving the previous deployment's partitions.
pub fn inject_version(source: &str, version: &VersionTag) -> Result<String, WorkerError> {
    if !source.contains(VERSION_PLACEHOLDER) {
        return Err(WorkerError::MissingPlaceholder(VERSION_PLACEHOLDER));
    }

    Ok(source.replace(VERSION_PLACEHOLDER, version.as_str()))
}
