use std::fmt;

use serde::{Deserialize, Serialize};

use crate::VersionTag;

/// The four partitions a worker version owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Static,
    Images,
    Fonts,
    Dynamic,
}

impl PartitionKind {
    /// Canonical order, also the order reported over the command channel
    pub const ALL: [PartitionKind; 4] = [Self::Static, Self::Images, Self::Fonts, Self::Dynamic];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Images => "images",
            Self::Fonts => "fonts",
            Self::Dynamic => "dynamic",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Partition names for one version, `<kind>-<version>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    version: VersionTag,
    names: [String; 4],
}

impl PartitionNames {
    pub fn new(version: &VersionTag) -> Self {
        let names = PartitionKind::ALL.map(|kind| format!("{}-{}", kind.prefix(), version));
        Self {
            version: version.clone(),
            names,
        }
    }

    pub fn version(&self) -> &VersionTag {
        &self.version
    }

    pub fn name(&self, kind: PartitionKind) -> &str {
        &self.names[kind.index()]
    }

    /// All four names in canonical order
    pub fn all(&self) -> Vec<String> {
        self.names.to_vec()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Whether a partition name follows this application's naming scheme
    pub fn is_owned(name: &str) -> bool {
        PartitionKind::ALL.iter().any(|kind| {
            name.strip_prefix(kind.prefix())
                .is_some_and(|rest| rest.starts_with('-'))
        })
    }

    /// Owned partitions from any other version; these are evicted on activation
    pub fn is_stale(&self, name: &str) -> bool {
        Self::is_owned(name) && !name.contains(self.version.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tag: &str) -> PartitionNames {
        PartitionNames::new(&VersionTag::new(tag).unwrap())
    }

    #[test]
    fn every_name_contains_the_version() {
        let names = names("v20240501-abc");
        for name in names.all() {
            assert!(name.contains("v20240501-abc"), "{name}");
        }
        assert_eq!(
            names.all(),
            vec![
                "static-v20240501-abc",
                "images-v20240501-abc",
                "fonts-v20240501-abc",
                "dynamic-v20240501-abc",
            ]
        );
        assert_eq!(names.name(PartitionKind::Fonts), "fonts-v20240501-abc");
    }

    #[test]
    fn stale_detection() {
        let names = names("v2");
        assert!(names.is_stale("static-v1"));
        assert!(names.is_stale("dynamic-v1"));
        assert!(!names.is_stale("static-v2"));
        assert!(!names.is_stale("images-v2"));
        // Foreign partitions are never ours to delete
        assert!(!names.is_stale("workbox-precache-v1"));
        assert!(!names.is_stale("staticfiles"));
    }
}
