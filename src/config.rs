//! Storage configuration.
//!
//! Every field has a default, so an empty YAML document is a valid
//! configuration.

use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};

/// How a commit decides which parts to rehash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStrategy {
    /// Hash every part on every commit. Cost is O(total content size).
    #[default]
    FullRehash,
    /// Hash only parts whose buffer was mutated since it was last hashed.
    /// Cost is O(edited content size).
    DirtyOnly,
}

/// Tunables for an [`ExpandedStorage`](crate::storage::ExpandedStorage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Attach the sibling `.rels` relationships to streams opened without
    /// an explicit choice.
    pub load_relationships_on_open: bool,

    /// Rehash policy used by `commit()`.
    pub commit_strategy: CommitStrategy,

    /// Minimum number of parts to hash before commit fans out to the
    /// rayon pool. Ignored without the `parallel` feature.
    pub parallel_hash_threshold: usize,

    /// Fail storage construction on a malformed `.rels` part. When false
    /// the part is skipped with a warning.
    pub strict_relationship_preload: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            load_relationships_on_open: true,
            commit_strategy: CommitStrategy::FullRehash,
            parallel_hash_threshold: 16,
            strict_relationship_preload: true,
        }
    }
}

impl StorageConfig {
    /// Create a new config builder
    pub fn builder() -> StorageConfigBuilder {
        StorageConfigBuilder::default()
    }

    /// Parse a configuration from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_saphyr::from_str(yaml)
            .map_err(|e| StorageError::Config(format!("Failed to parse storage config: {}", e)))
    }

    /// Serialize the configuration to YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_saphyr::to_string(self)
            .map_err(|e| StorageError::Config(format!("Failed to serialize storage config: {}", e)))
    }
}

/// Builder for StorageConfig
#[derive(Default)]
pub struct StorageConfigBuilder {
    config: StorageConfig,
}

impl StorageConfigBuilder {
    pub fn load_relationships_on_open(mut self, load: bool) -> Self {
        self.config.load_relationships_on_open = load;
        self
    }

    pub fn commit_strategy(mut self, strategy: CommitStrategy) -> Self {
        self.config.commit_strategy = strategy;
        self
    }

    pub fn parallel_hash_threshold(mut self, threshold: usize) -> Self {
        self.config.parallel_hash_threshold = threshold;
        self
    }

    pub fn strict_relationship_preload(mut self, strict: bool) -> Self {
        self.config.strict_relationship_preload = strict;
        self
    }

    pub fn build(self) -> StorageConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert!(config.load_relationships_on_open);
        assert_eq!(config.commit_strategy, CommitStrategy::FullRehash);
        assert!(config.strict_relationship_preload);
    }

    #[test]
    fn test_builder() {
        let config = StorageConfig::builder()
            .commit_strategy(CommitStrategy::DirtyOnly)
            .load_relationships_on_open(false)
            .build();
        assert_eq!(config.commit_strategy, CommitStrategy::DirtyOnly);
        assert!(!config.load_relationships_on_open);
        assert_eq!(config.parallel_hash_threshold, 16);
    }

    #[test]
    fn test_yaml_partial() {
        let config = StorageConfig::from_yaml_str("commit_strategy: dirty_only\n").unwrap();
        assert_eq!(config.commit_strategy, CommitStrategy::DirtyOnly);
        assert!(config.load_relationships_on_open);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = StorageConfig::builder().parallel_hash_threshold(4).build();
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(StorageConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_yaml_invalid() {
        let err = StorageConfig::from_yaml_str("commit_strategy: sometimes\n").unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }
}
