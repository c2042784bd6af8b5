//! The stream pair handed out when a part is opened.

use crate::error::{Result, StorageError};
use crate::opc::rel::RelationshipTable;
use crate::stream::input::VecInputStream;
use crate::stream::output::VecOutputStream;
use crate::stream::traits::{RelationshipHolder, Seekable};
use std::sync::Arc;

/// An opened part: an input side, an output side, or both, plus the
/// relationships of the part.
///
/// Seeking and position queries go to the input side when there is one,
/// otherwise to the output side.
#[derive(Debug)]
pub struct StreamSupplier {
    path: String,
    input: Option<Arc<VecInputStream>>,
    output: Option<Arc<VecOutputStream>>,
    relationships: Arc<RelationshipTable>,
}

impl StreamSupplier {
    pub(crate) fn new(
        path: String,
        input: Option<VecInputStream>,
        output: Option<VecOutputStream>,
        relationships: Arc<RelationshipTable>,
    ) -> Self {
        Self {
            path,
            input: input.map(Arc::new),
            output: output.map(Arc::new),
            relationships,
        }
    }

    /// Full key of the opened part.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn input(&self) -> Option<Arc<VecInputStream>> {
        self.input.clone()
    }

    pub fn output(&self) -> Option<Arc<VecOutputStream>> {
        self.output.clone()
    }

    /// The input side, or `NotConnected` if the part was opened write-only.
    pub fn input_stream(&self) -> Result<Arc<VecInputStream>> {
        self.input
            .clone()
            .ok_or_else(|| StorageError::NotConnected(format!("{} has no input side", self.path)))
    }

    /// The output side, or `NotConnected` if the part was opened read-only.
    pub fn output_stream(&self) -> Result<Arc<VecOutputStream>> {
        self.output
            .clone()
            .ok_or_else(|| StorageError::NotConnected(format!("{} has no output side", self.path)))
    }

    /// Shared handle to the relationship table of the part.
    pub fn relationship_table(&self) -> Arc<RelationshipTable> {
        Arc::clone(&self.relationships)
    }

    fn seekable(&self) -> Result<&dyn Seekable> {
        if let Some(input) = &self.input {
            Ok(&**input)
        } else if let Some(output) = &self.output {
            Ok(&**output)
        } else {
            Err(StorageError::NotConnected(self.path.clone()))
        }
    }
}

impl Seekable for StreamSupplier {
    fn seek_to(&self, pos: i64) -> Result<()> {
        self.seekable()?.seek_to(pos)
    }

    fn position(&self) -> Result<u64> {
        self.seekable()?.position()
    }

    fn length(&self) -> Result<u64> {
        self.seekable()?.length()
    }
}

impl RelationshipHolder for StreamSupplier {
    fn relationships(&self) -> &RelationshipTable {
        &self.relationships
    }
}
