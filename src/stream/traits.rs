//! Capability traits composed by the stream and storage types.

use crate::error::Result;
use crate::opc::rel::{RelationshipRecord, RelationshipTable};
use bytes::Bytes;

/// Read side of a stream.
pub trait Readable {
    /// Read up to `max` bytes from the cursor. Returns fewer bytes, possibly
    /// none, at the end of the content. Never blocks.
    fn read_bytes(&self, max: usize) -> Bytes;

    /// Read into `buf`, returning the number of bytes copied.
    fn read_into(&self, buf: &mut [u8]) -> usize;

    /// Advance the cursor by up to `n` bytes, returning how far it moved.
    fn skip_bytes(&self, n: usize) -> usize;

    /// Bytes between the cursor and the end of the content.
    fn available(&self) -> usize;

    fn close_input(&self) {}
}

/// Write side of a stream.
pub trait Writable {
    /// Write at the cursor, growing the content as needed.
    fn write_bytes(&self, data: &[u8]);

    /// Truncate the content to the cursor position, discarding whatever a
    /// previous, longer content left past it.
    fn flush_output(&self);

    /// Same truncation as [`Writable::flush_output`].
    fn close_output(&self) {
        self.flush_output();
    }
}

/// Cursor positioning.
pub trait Seekable {
    /// Move the cursor to an absolute position in `0..=length`.
    fn seek_to(&self, pos: i64) -> Result<()>;

    fn position(&self) -> Result<u64>;

    fn length(&self) -> Result<u64>;
}

/// Access to the relationships of whatever the implementor represents.
///
/// Implementors only provide [`RelationshipHolder::relationships`]; every
/// other method forwards to the table.
pub trait RelationshipHolder {
    fn relationships(&self) -> &RelationshipTable;

    fn has_by_id(&self, id: &str) -> bool {
        self.relationships().has_by_id(id)
    }

    fn get_relationship_by_id(&self, id: &str) -> Result<RelationshipRecord> {
        self.relationships().get_by_id(id)
    }

    fn get_target_by_id(&self, id: &str) -> Result<String> {
        self.relationships().get_target_by_id(id)
    }

    fn get_type_by_id(&self, id: &str) -> Result<String> {
        self.relationships().get_type_by_id(id)
    }

    fn get_relationships_by_type(&self, rel_type: &str) -> Vec<RelationshipRecord> {
        self.relationships().get_by_type(rel_type)
    }

    fn get_all_relationships(&self) -> Vec<RelationshipRecord> {
        self.relationships().get_all()
    }

    fn insert_relationship_by_id(
        &self,
        id: &str,
        fields: Vec<(String, String)>,
        replace: bool,
    ) -> Result<()> {
        self.relationships().insert_by_id(id, fields, replace)
    }

    fn insert_relationships(&self, records: Vec<RelationshipRecord>, replace: bool) -> Result<()> {
        self.relationships().insert_many(records, replace)
    }

    fn remove_relationship_by_id(&self, id: &str) -> Result<()> {
        self.relationships().remove_by_id(id)
    }

    fn clear_relationships(&self) {
        self.relationships().clear()
    }
}
