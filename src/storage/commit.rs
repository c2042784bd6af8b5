//! Commit records and the change tracker.

use crate::config::CommitStrategy;
use crate::storage::part::Part;
use crate::storage::part_map::PartMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of one commit: the parts whose content hash changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// `(path, sha256 hex)` in path order.
    pub changed: Vec<(String, String)>,
    pub timestamp: DateTime<Utc>,
}

impl Commit {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.changed.iter().any(|(p, _)| p == path)
    }
}

/// Hashes every part on commit and remembers the latest result.
///
/// One tracker is shared by a storage and all of its sub-storages.
/// Concurrent commits are serialized; each commit replaces the previous
/// record rather than accumulating history.
#[derive(Debug, Default)]
pub struct CommitTracker {
    last: Mutex<Option<Arc<Commit>>>,
    running: Mutex<()>,
}

impl CommitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash the parts of `map`, record the ones that changed and make the
    /// result the current commit. Never fails; a commit without changes is
    /// valid.
    pub fn commit(
        &self,
        map: &PartMap,
        strategy: CommitStrategy,
        parallel_threshold: usize,
    ) -> Arc<Commit> {
        let _running = self.running.lock();
        let parts = map.snapshot();
        let changed = hash_parts(&parts, strategy, parallel_threshold);

        let commit = Arc::new(Commit {
            changed,
            timestamp: Utc::now(),
        });
        tracing::debug!(
            parts = parts.len(),
            changed = commit.len(),
            ?strategy,
            "commit"
        );
        *self.last.lock() = Some(Arc::clone(&commit));
        commit
    }

    /// The latest commit, if any commit ran yet.
    pub fn last_commit(&self) -> Option<Arc<Commit>> {
        self.last.lock().clone()
    }

    /// Changed parts of the latest commit; empty before the first commit.
    pub fn recently_changed_files(&self) -> Vec<(String, String)> {
        self.last
            .lock()
            .as_ref()
            .map(|c| c.changed.clone())
            .unwrap_or_default()
    }
}

fn hash_one(entry: &(String, Arc<Part>), strategy: CommitStrategy) -> Option<(String, String)> {
    let (path, part) = entry;
    part.rehash(strategy).map(|hash| (path.clone(), hash.to_hex()))
}

#[cfg(feature = "parallel")]
fn hash_parts(
    parts: &[(String, Arc<Part>)],
    strategy: CommitStrategy,
    parallel_threshold: usize,
) -> Vec<(String, String)> {
    if parts.len() >= parallel_threshold {
        parts
            .par_iter()
            .filter_map(|entry| hash_one(entry, strategy))
            .collect()
    } else {
        parts
            .iter()
            .filter_map(|entry| hash_one(entry, strategy))
            .collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn hash_parts(
    parts: &[(String, Arc<Part>)],
    strategy: CommitStrategy,
    _parallel_threshold: usize,
) -> Vec<(String, String)> {
    parts
        .iter()
        .filter_map(|entry| hash_one(entry, strategy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::hash::ContentHash;

    fn map() -> PartMap {
        PartMap::from_parts([
            ("a.xml", b"a".to_vec()),
            ("b.xml", b"b".to_vec()),
            ("c.xml", b"c".to_vec()),
        ])
    }

    #[test]
    fn test_no_changes_is_empty() {
        let tracker = CommitTracker::new();
        assert!(tracker.last_commit().is_none());
        assert!(tracker.recently_changed_files().is_empty());

        let commit = tracker.commit(&map(), CommitStrategy::FullRehash, 16);
        assert!(commit.is_empty());
        assert!(tracker.last_commit().is_some());
    }

    #[test]
    fn test_single_change_reported_once() {
        let tracker = CommitTracker::new();
        let map = map();
        map.insert("b.xml", b"b2".to_vec());

        tracker.commit(&map, CommitStrategy::FullRehash, 16);
        assert_eq!(
            tracker.recently_changed_files(),
            vec![("b.xml".to_string(), ContentHash::of(b"b2").to_hex())]
        );

        // Only the latest commit is kept
        tracker.commit(&map, CommitStrategy::FullRehash, 16);
        assert!(tracker.recently_changed_files().is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = CommitTracker::new();
        let parallel = CommitTracker::new();
        let left = map();
        let right = map();
        for m in [&left, &right] {
            m.insert("a.xml", b"A".to_vec());
            m.insert("c.xml", b"C".to_vec());
            m.get_or_create("d.xml", true).unwrap();
        }

        let s = sequential.commit(&left, CommitStrategy::FullRehash, usize::MAX);
        let p = parallel.commit(&right, CommitStrategy::FullRehash, 0);
        assert_eq!(s.changed, p.changed);
        assert_eq!(
            s.changed.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>(),
            vec!["a.xml", "c.xml", "d.xml"]
        );
    }

    #[test]
    fn test_commit_serializes() {
        let tracker = CommitTracker::new();
        let map = map();
        map.insert("a.xml", b"z".to_vec());
        let commit = tracker.commit(&map, CommitStrategy::DirtyOnly, 16);
        let yaml = serde_saphyr::to_string(commit.as_ref()).unwrap();
        assert!(yaml.contains("a.xml"));
        assert!(yaml.contains("timestamp"));
    }
}
