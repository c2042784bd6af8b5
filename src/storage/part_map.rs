//! The flat, path-keyed map of parts shared by every view of a package.
//!
//! Keys are part paths without a leading slash (`word/document.xml`).
//! Directories are not stored; a directory exists while at least one key
//! lies beneath it, which a range scan over the sorted keys answers.

use crate::error::{Result, StorageError};
use crate::storage::part::Part;
use crate::stream::buffer::SharedBuffer;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// Parts of one package.
///
/// A single lock guards structural changes (insert, remove, rename).
/// Content is locked per part buffer, so writing two different parts does
/// not contend on the map.
#[derive(Debug, Default)]
pub struct PartMap {
    parts: RwLock<BTreeMap<String, Arc<Part>>>,
}

impl PartMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map of already loaded parts. Every part starts hashed.
    pub fn from_parts<I, K>(parts: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        let map = parts
            .into_iter()
            .map(|(path, content)| (path.into(), Arc::new(Part::new(content))))
            .collect();
        Self {
            parts: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.parts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.read().is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.parts.read().contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<Arc<Part>> {
        self.parts.read().get(path).cloned()
    }

    /// Like [`PartMap::get`] but failing with `PartNotFound`.
    pub fn require(&self, path: &str) -> Result<Arc<Part>> {
        self.get(path)
            .ok_or_else(|| StorageError::PartNotFound(path.to_string()))
    }

    /// Store `content` at `path`.
    ///
    /// A new part is hashed on insertion. An existing part keeps its
    /// identity and recorded hash and only has its content replaced, so
    /// the next commit reports the change.
    pub fn insert(&self, path: &str, content: Vec<u8>) -> Arc<Part> {
        let mut parts = self.parts.write();
        match parts.get(path) {
            Some(part) => {
                part.content().replace(content);
                Arc::clone(part)
            },
            None => {
                let part = Arc::new(Part::new(content));
                parts.insert(path.to_string(), Arc::clone(&part));
                part
            },
        }
    }

    /// Get the part at `path`, creating an empty unhashed one when missing
    /// and `create` is set.
    pub fn get_or_create(&self, path: &str, create: bool) -> Result<Arc<Part>> {
        if let Some(part) = self.get(path) {
            return Ok(part);
        }
        if !create {
            return Err(StorageError::PartNotFound(path.to_string()));
        }

        let mut parts = self.parts.write();
        // Another thread may have created it between the two locks
        let part = parts
            .entry(path.to_string())
            .or_insert_with(|| {
                tracing::debug!(path, "creating part on open");
                Arc::new(Part::unhashed(Vec::new()))
            });
        Ok(Arc::clone(part))
    }

    /// Copy of the content at `path`.
    pub fn get_content(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.require(path)?.content().to_vec())
    }

    /// Content buffer at `path`, shared rather than copied.
    pub fn buffer(&self, path: &str) -> Option<SharedBuffer> {
        self.parts.read().get(path).map(|p| p.content().clone())
    }

    pub fn remove(&self, path: &str) -> Result<Arc<Part>> {
        let removed = self
            .parts
            .write()
            .remove(path)
            .ok_or_else(|| StorageError::PartNotFound(path.to_string()))?;
        tracing::debug!(path, "removed part");
        Ok(removed)
    }

    /// Move the entry at `from` to `to`, keeping the same buffer.
    ///
    /// The recorded hash is dropped so the next commit reports the part
    /// under its new path.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return if self.contains(from) {
                Ok(())
            } else {
                Err(StorageError::PartNotFound(from.to_string()))
            };
        }

        let mut parts = self.parts.write();
        if !parts.contains_key(from) {
            return Err(StorageError::PartNotFound(from.to_string()));
        }
        if parts.contains_key(to) {
            return Err(StorageError::AlreadyExists(to.to_string()));
        }
        if let Some(part) = parts.remove(from) {
            part.invalidate_hash();
            parts.insert(to.to_string(), part);
        }
        tracing::debug!(from, to, "renamed part");
        Ok(())
    }

    /// `(path, hash hex)` for every part in key order. Parts never hashed
    /// report an empty hash.
    pub fn list(&self) -> Vec<(String, String)> {
        self.parts
            .read()
            .iter()
            .map(|(path, part)| {
                let hash = part
                    .content_hash()
                    .map(|h| h.to_hex())
                    .unwrap_or_default();
                (path.clone(), hash)
            })
            .collect()
    }

    /// Every entry, in key order.
    pub fn snapshot(&self) -> Vec<(String, Arc<Part>)> {
        self.parts
            .read()
            .iter()
            .map(|(path, part)| (path.clone(), Arc::clone(part)))
            .collect()
    }

    /// Entries whose key starts with `prefix`, in key order.
    pub fn entries_under(&self, prefix: &str) -> Vec<(String, Arc<Part>)> {
        self.parts
            .read()
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, part)| (path.clone(), Arc::clone(part)))
            .collect()
    }

    /// Keys that start with `prefix`, in key order.
    pub fn paths_under(&self, prefix: &str) -> Vec<String> {
        self.parts
            .read()
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Whether any part lies beneath directory `dir` (no trailing slash,
    /// empty for the root).
    pub fn is_directory(&self, dir: &str) -> bool {
        let parts = self.parts.read();
        if dir.is_empty() {
            return !parts.is_empty();
        }
        let prefix = format!("{dir}/");
        parts
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .next()
            .is_some_and(|(path, _)| path.starts_with(&prefix))
    }

    pub fn open_write_count(&self, path: &str) -> Result<usize> {
        Ok(self.require(path)?.open_write_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::hash::ContentHash;

    fn sample() -> PartMap {
        PartMap::from_parts([
            ("[Content_Types].xml", b"<Types/>".to_vec()),
            ("_rels/.rels", b"<Relationships/>".to_vec()),
            ("word/document.xml", b"<w:document/>".to_vec()),
            ("word/media/image1.png", vec![0x89, 0x50]),
            ("word/styles.xml", b"<w:styles/>".to_vec()),
            ("wordy.xml", Vec::new()),
        ])
    }

    #[test]
    fn test_list_sorted_with_hashes() {
        let map = sample();
        let list = map.list();
        assert_eq!(list.len(), 6);
        assert_eq!(list[0].0, "[Content_Types].xml");
        assert_eq!(list[0].1, ContentHash::of(b"<Types/>").to_hex());
    }

    #[test]
    fn test_directory_by_prefix() {
        let map = sample();
        assert!(map.is_directory(""));
        assert!(map.is_directory("word"));
        assert!(map.is_directory("word/media"));
        assert!(!map.is_directory("wor"));
        assert!(!map.is_directory("word/document.xml"));
        assert!(!map.is_directory("ppt"));
    }

    #[test]
    fn test_paths_under() {
        let map = sample();
        assert_eq!(
            map.paths_under("word/"),
            vec!["word/document.xml", "word/media/image1.png", "word/styles.xml"]
        );
        assert!(map.paths_under("xl/").is_empty());
    }

    #[test]
    fn test_insert_existing_keeps_hash() {
        let map = sample();
        let before = map.require("word/document.xml").unwrap();
        let after = map.insert("word/document.xml", b"<v2/>".to_vec());
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.content_hash(), Some(ContentHash::of(b"<w:document/>")));
        assert_eq!(map.get_content("word/document.xml").unwrap(), b"<v2/>");
    }

    #[test]
    fn test_get_or_create() {
        let map = PartMap::new();
        assert!(map.get_or_create("a.xml", false).unwrap_err().is_not_found());
        let part = map.get_or_create("a.xml", true).unwrap();
        assert!(part.content().is_empty());
        assert_eq!(part.content_hash(), None);
        assert_eq!(map.list(), vec![("a.xml".to_string(), String::new())]);
    }

    #[test]
    fn test_rename() {
        let map = sample();
        let buffer = map.buffer("word/styles.xml").unwrap();
        map.rename("word/styles.xml", "word/theme.xml").unwrap();
        assert!(!map.contains("word/styles.xml"));
        assert!(map.buffer("word/theme.xml").unwrap().ptr_eq(&buffer));

        assert!(map.rename("nope.xml", "x.xml").unwrap_err().is_not_found());
        let err = map.rename("word/theme.xml", "word/document.xml").unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn test_remove_missing() {
        let map = sample();
        map.remove("wordy.xml").unwrap();
        assert!(map.remove("wordy.xml").unwrap_err().is_not_found());
    }
}
