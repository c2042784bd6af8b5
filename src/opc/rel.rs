/// Relationship records and the per-part relationship table.
///
/// A relationship file allows arbitrary extra attributes on each
/// `<Relationship>`, so a record is an ordered list of key/value pairs
/// rather than a fixed struct. `Id` is kept as the first pair.
use crate::error::{Result, StorageError};
use crate::opc::constants::{attr, target_mode};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::HashSet;

/// Ordered key/value pairs of one relationship.
pub type RelationshipFields = SmallVec<[(String, String); 4]>;

/// A single OPC relationship entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationshipRecord {
    fields: RelationshipFields,
}

impl RelationshipRecord {
    /// Build a record from pairs, moving the `Id` pair (if any) to the front
    /// while keeping the order of the others.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: RelationshipFields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if let Some(idx) = fields.iter().position(|(k, _)| k == attr::ID) {
            fields[..=idx].rotate_right(1);
        }
        Self { fields }
    }

    /// Build a record whose `Id` is `id`, dropping any `Id` in `pairs`.
    pub fn with_id<I, K, V>(id: &str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = RelationshipFields::new();
        fields.push((attr::ID.to_string(), id.to_string()));
        fields.extend(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .filter(|(k, _)| k != attr::ID),
        );
        Self { fields }
    }

    /// Value of the first pair named `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.get(attr::ID)
    }

    #[inline]
    pub fn rel_type(&self) -> Option<&str> {
        self.get(attr::TYPE)
    }

    #[inline]
    pub fn target(&self) -> Option<&str> {
        self.get(attr::TARGET)
    }

    /// `TargetMode`, defaulting to `Internal`.
    #[inline]
    pub fn target_mode(&self) -> &str {
        self.get(attr::TARGET_MODE).unwrap_or(target_mode::INTERNAL)
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode() == target_mode::EXTERNAL
    }

    /// All pairs in order.
    #[inline]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.fields
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the record carries exactly the pair `("Id", id)`.
    #[inline]
    fn has_id(&self, id: &str) -> bool {
        self.fields.iter().any(|(k, v)| k == attr::ID && v == id)
    }
}

#[derive(Debug, Default)]
struct TableState {
    records: Vec<RelationshipRecord>,
    /// Set by every mutation, cleared when the table is loaded from or
    /// written back to its relationship part.
    modified: bool,
}

/// Relationships of one part.
///
/// All access goes through one exclusive lock; mutation is last writer
/// wins. Contention is rare since a table belongs to a single part.
#[derive(Debug, Default)]
pub struct RelationshipTable {
    state: Mutex<TableState>,
}

impl RelationshipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding `records`, as loaded from a relationship part.
    ///
    /// A repeated `Id` keeps its first record.
    pub fn from_records(records: Vec<RelationshipRecord>) -> Self {
        Self {
            state: Mutex::new(TableState {
                records: dedup_by_id(records),
                modified: false,
            }),
        }
    }

    /// Copy of every record, in order.
    pub fn get_all(&self) -> Vec<RelationshipRecord> {
        self.state.lock().records.clone()
    }

    /// Get the record with the given id.
    pub fn get_by_id(&self, id: &str) -> Result<RelationshipRecord> {
        self.state
            .lock()
            .records
            .iter()
            .find(|rec| rec.id() == Some(id))
            .cloned()
            .ok_or_else(|| StorageError::RelationshipNotFound(id.to_string()))
    }

    pub fn has_by_id(&self, id: &str) -> bool {
        self.state
            .lock()
            .records
            .iter()
            .any(|rec| rec.id() == Some(id))
    }

    /// `Type` of the record with the given id, empty if the record has none.
    pub fn get_type_by_id(&self, id: &str) -> Result<String> {
        let rec = self.get_by_id(id)?;
        Ok(rec.rel_type().unwrap_or_default().to_string())
    }

    /// `Target` of the record with the given id, empty if the record has none.
    pub fn get_target_by_id(&self, id: &str) -> Result<String> {
        let rec = self.get_by_id(id)?;
        Ok(rec.target().unwrap_or_default().to_string())
    }

    /// Records whose `Type` matches `rel_type`, ignoring ASCII case.
    ///
    /// Types are URLs and producers disagree on their casing.
    pub fn get_by_type(&self, rel_type: &str) -> Vec<RelationshipRecord> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|rec| {
                rec.rel_type()
                    .is_some_and(|t| t.eq_ignore_ascii_case(rel_type))
            })
            .cloned()
            .collect()
    }

    /// Insert or overwrite the record with the given id.
    ///
    /// The stored record starts with `Id` followed by `fields` minus any
    /// `Id` they contain. An existing record keeps its position.
    ///
    /// Always an upsert; `replace` is accepted for interface parity and
    /// does not change the outcome.
    pub fn insert_by_id<I, K, V>(&self, id: &str, fields: I, _replace: bool) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let record = RelationshipRecord::with_id(id, fields);
        let mut state = self.state.lock();
        match state.records.iter().position(|rec| rec.has_id(id)) {
            Some(idx) => state.records[idx] = record,
            None => state.records.push(record),
        }
        state.modified = true;
        Ok(())
    }

    /// Bulk upsert keyed on each record's own `Id`.
    ///
    /// Existing records sharing an `Id` with any incoming record are dropped
    /// and the incoming records are appended, so a re-import replaces whole
    /// records rather than merging fields. Within `records` a later entry
    /// wins over an earlier one with the same `Id`. Every incoming record
    /// must carry an `Id`. Like [`insert_by_id`](Self::insert_by_id) this
    /// upserts whatever `replace` says.
    pub fn insert_many(&self, records: Vec<RelationshipRecord>, _replace: bool) -> Result<()> {
        let mut incoming: Vec<RelationshipRecord> = Vec::with_capacity(records.len());
        for rec in records {
            let rec = RelationshipRecord::from_pairs(rec.fields);
            let Some(id) = rec.id() else {
                return Err(StorageError::InvalidArgument(
                    "relationship record without an Id".to_string(),
                ));
            };
            match incoming.iter().position(|prev| prev.id() == Some(id)) {
                Some(idx) => incoming[idx] = rec,
                None => incoming.push(rec),
            }
        }

        let mut state = self.state.lock();
        let clashes = |old: &RelationshipRecord| {
            old.id()
                .is_some_and(|id| incoming.iter().any(|new| new.has_id(id)))
        };
        state.records.retain(|old| !clashes(old));
        state.records.extend(incoming);
        state.modified = true;
        Ok(())
    }

    /// Remove the record with the given id.
    pub fn remove_by_id(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let idx = state
            .records
            .iter()
            .position(|rec| rec.has_id(id))
            .ok_or_else(|| StorageError::RelationshipNotFound(id.to_string()))?;
        state.records.remove(idx);
        state.modified = true;
        Ok(())
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.records.clear();
        state.modified = true;
    }

    /// Replace every record. A repeated `Id` keeps its first record.
    pub fn set_relationships(&self, records: Vec<RelationshipRecord>) {
        let records = dedup_by_id(records);
        let mut state = self.state.lock();
        state.records = records;
        state.modified = true;
    }

    /// Replace every record with freshly loaded ones and clear the
    /// modified flag.
    pub(crate) fn load(&self, records: Vec<RelationshipRecord>) {
        let records = dedup_by_id(records);
        let mut state = self.state.lock();
        state.records = records;
        state.modified = false;
    }

    /// Take a copy of the records if the table changed since it was loaded,
    /// clearing the flag.
    pub(crate) fn take_modified(&self) -> Option<Vec<RelationshipRecord>> {
        let mut state = self.state.lock();
        if !state.modified {
            return None;
        }
        state.modified = false;
        Some(state.records.clone())
    }

    pub fn is_modified(&self) -> bool {
        self.state.lock().modified
    }

    /// A new, independent table with the same records.
    pub fn detached_copy(&self) -> Self {
        let state = self.state.lock();
        Self {
            state: Mutex::new(TableState {
                records: state.records.clone(),
                modified: state.modified,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    /// Get the next available relationship id.
    ///
    /// Generates ids in the format "rId1", "rId2", etc., filling in the
    /// lowest gap if any exists.
    pub fn next_free_id(&self) -> String {
        let mut used_numbers: Vec<u32> = self
            .state
            .lock()
            .records
            .iter()
            .filter_map(|rec| {
                let id = rec.id()?;
                let digits = id.strip_prefix("rId")?;
                atoi_simd::parse::<u32, false, false>(digits.as_bytes()).ok()
            })
            .collect();
        used_numbers.sort_unstable();

        let mut next_num = 1u32;
        for &num in &used_numbers {
            match num.cmp(&next_num) {
                std::cmp::Ordering::Equal => next_num += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }

        let mut buf = itoa::Buffer::new();
        let mut id = String::with_capacity(8);
        id.push_str("rId");
        id.push_str(buf.format(next_num));
        id
    }
}

/// Drop every record whose `Id` already appeared earlier in `records`.
fn dedup_by_id(mut records: Vec<RelationshipRecord>) -> Vec<RelationshipRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    records.retain(|rec| match rec.id() {
        Some(id) => seen.insert(id.to_string()),
        None => true,
    });
    records
}
