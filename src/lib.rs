//! opc-memstore - An in-memory storage engine for OOXML packages
//!
//! This library keeps an Office Open XML package (.docx, .xlsx, .pptx)
//! entirely in memory as a flat map of parts and exposes it through a
//! storage facade with streams, per-part relationships, scoped
//! sub-storages and a commit tracker that reports which parts changed.
//!
//! # Features
//!
//! - **Flat part map**: one shared map, many thin views scoped by base path
//! - **Streams**: independent read and write cursors over shared part bytes
//! - **Relationships**: `.rels` parts parsed and attached to streams on open
//! - **Change tracking**: SHA-256 per part, only changed parts reported
//! - **Parallel hashing**: commits fan out over `rayon` for large packages
//!
//! # Example - Editing a part and committing
//!
//! ```
//! use opc_memstore::{ElementModes, ExpandedStorage, Readable, StorageConfig, Writable};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = ExpandedStorage::from_parts(
//!     [("word/document.xml", b"<w:document/>".to_vec())],
//!     StorageConfig::default(),
//! )?;
//!
//! let stream = storage.open_stream_element("word/document.xml", ElementModes::READWRITE)?;
//! let output = stream.output_stream()?;
//! output.write_bytes(b"<w:document>edited</w:document>");
//! output.close_output();
//!
//! let input = stream.input_stream()?;
//! assert_eq!(&input.read_bytes(1024)[..], b"<w:document>edited</w:document>");
//!
//! for (path, hash) in storage.commit().changed.iter() {
//!     println!("changed: {} {}", path, hash);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Relationships
//!
//! ```
//! use opc_memstore::{ElementModes, ExpandedStorage, RelationshipHolder, StorageConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rels = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
//!   <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
//! </Relationships>"#;
//!
//! let storage = ExpandedStorage::from_parts(
//!     [
//!         ("word/document.xml", b"<w:document/>".to_vec()),
//!         ("word/_rels/document.xml.rels", rels.to_vec()),
//!     ],
//!     StorageConfig::default(),
//! )?;
//!
//! let stream = storage.open_stream_element("word/document.xml", ElementModes::READ)?;
//! assert_eq!(stream.get_target_by_id("rId1")?, "styles.xml");
//! # Ok(())
//! # }
//! ```

/// Configuration of a storage instance
pub mod config;

/// Error types shared by every module
pub mod error;

/// Open Packaging Conventions building blocks
///
/// Part paths, relationship records and the `.rels` XML format.
pub mod opc;

/// Part map, storage views and change tracking
pub mod storage;

/// Streams over in-memory part content
pub mod stream;

// Re-export commonly used types for convenience
pub use config::{CommitStrategy, StorageConfig};
pub use error::{Result, StorageError};
pub use opc::{RelationshipRecord, RelationshipTable};
pub use storage::{Commit, ContentHash, ElementModes, ExpandedStorage, PropertyValue};
pub use stream::{
    Readable, RelationshipHolder, Seekable, SharedBuffer, StreamSupplier, VecInputStream,
    VecOutputStream, Writable,
};
