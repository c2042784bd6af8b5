//! A single part of the package.

use crate::config::CommitStrategy;
use crate::error::Result;
use crate::opc::rel::RelationshipTable;
use crate::opc::rels_xml::parse_relationships;
use crate::storage::hash::ContentHash;
use crate::stream::buffer::SharedBuffer;
use crate::stream::input::VecInputStream;
use crate::stream::output::VecOutputStream;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct HashState {
    /// `None` until the part is hashed for the first time.
    hash: Option<ContentHash>,
    /// Buffer generation `hash` was computed at.
    generation: Option<u64>,
}

/// Relationship table of a part plus the `.rels` content it was parsed from.
#[derive(Debug)]
struct RelsCache {
    table: Arc<RelationshipTable>,
    source: Option<(SharedBuffer, u64)>,
}

impl RelsCache {
    fn is_current(&self, rels: Option<&SharedBuffer>) -> bool {
        match (&self.source, rels) {
            (None, None) => true,
            (Some((buf, generation)), Some(current)) => {
                buf.ptr_eq(current) && *generation == current.generation()
            },
            _ => false,
        }
    }
}

/// One entry of the part map.
///
/// The key of the entry is the part's path; the part itself carries the
/// content, its last committed hash, a count of open writers and the
/// lazily created relationship table.
#[derive(Debug)]
pub struct Part {
    content: SharedBuffer,
    hash_state: Mutex<HashState>,
    open_writes: Arc<AtomicUsize>,
    rels: Mutex<Option<RelsCache>>,
}

impl Part {
    /// Part holding `content`, hashed right away.
    pub fn new(content: Vec<u8>) -> Self {
        let hash = ContentHash::of(&content);
        Self {
            content: SharedBuffer::from_vec(content),
            hash_state: Mutex::new(HashState {
                hash: Some(hash),
                generation: Some(0),
            }),
            open_writes: Arc::new(AtomicUsize::new(0)),
            rels: Mutex::new(None),
        }
    }

    /// Part that the next commit reports as changed.
    pub fn unhashed(content: Vec<u8>) -> Self {
        Self {
            content: SharedBuffer::from_vec(content),
            hash_state: Mutex::new(HashState::default()),
            open_writes: Arc::new(AtomicUsize::new(0)),
            rels: Mutex::new(None),
        }
    }

    #[inline]
    pub fn content(&self) -> &SharedBuffer {
        &self.content
    }

    /// Hash recorded by the last commit (or at insertion).
    pub fn content_hash(&self) -> Option<ContentHash> {
        self.hash_state.lock().hash
    }

    /// Number of output streams currently open on this part.
    pub fn open_write_count(&self) -> usize {
        self.open_writes.load(Ordering::Acquire)
    }

    pub(crate) fn open_input(&self) -> VecInputStream {
        VecInputStream::new(self.content.clone())
    }

    pub(crate) fn open_output(&self) -> VecOutputStream {
        VecOutputStream::tracked(self.content.clone(), &self.open_writes)
    }

    /// Forget the recorded hash so the next commit reports the part.
    pub(crate) fn invalidate_hash(&self) {
        *self.hash_state.lock() = HashState::default();
    }

    /// Hash the content and record it. Returns the new hash if it differs
    /// from the recorded one.
    pub(crate) fn rehash(&self, strategy: CommitStrategy) -> Option<ContentHash> {
        let mut state = self.hash_state.lock();
        if strategy == CommitStrategy::DirtyOnly
            && state.hash.is_some()
            && state.generation == Some(self.content.generation())
        {
            return None;
        }

        // Generation read under the buffer lock so it matches the hashed bytes
        let (generation, hash) = self
            .content
            .with_data(|data| (self.content.generation(), ContentHash::of(data)));
        state.generation = Some(generation);
        if state.hash == Some(hash) {
            return None;
        }
        state.hash = Some(hash);
        Some(hash)
    }

    /// The relationship table of this part, parsed from `rels` (the
    /// content of the sibling relationship part, if one exists).
    ///
    /// The table is created on first request and then shared by every
    /// stream opened on the part. An unmodified table is reparsed when the
    /// relationship part changed since it was loaded; a modified one is
    /// kept until it is written back.
    pub(crate) fn relationships(&self, rels: Option<&SharedBuffer>) -> Result<Arc<RelationshipTable>> {
        let mut cache = self.rels.lock();
        if let Some(cached) = cache.as_ref() {
            if cached.is_current(rels) || cached.table.is_modified() {
                return Ok(Arc::clone(&cached.table));
            }
        }

        let (records, source) = match rels {
            Some(buf) => {
                let (generation, records) =
                    buf.with_data(|data| (buf.generation(), parse_relationships(data)));
                (records?, Some((buf.clone(), generation)))
            },
            None => (Vec::new(), None),
        };

        let table = match cache.take() {
            Some(cached) => {
                cached.table.load(records);
                cached.table
            },
            None => Arc::new(RelationshipTable::from_records(records)),
        };
        tracing::trace!(count = table.len(), "loaded part relationships");
        *cache = Some(RelsCache {
            table: Arc::clone(&table),
            source,
        });
        Ok(table)
    }

    /// The cached table, without loading.
    pub(crate) fn cached_relationships(&self) -> Option<Arc<RelationshipTable>> {
        self.rels.lock().as_ref().map(|c| Arc::clone(&c.table))
    }

    /// Record that the cached table now matches `rels`.
    pub(crate) fn mark_relationships_saved(&self, rels: &SharedBuffer) {
        if let Some(cached) = self.rels.lock().as_mut() {
            cached.source = Some((rels.clone(), rels.generation()));
        }
    }

    /// An independent part with a copy of the content and no recorded hash.
    pub(crate) fn duplicate(&self) -> Part {
        Part::unhashed(self.content.to_vec())
    }
}
