/// Open Packaging Conventions (OPC) building blocks.
///
/// This module holds the pieces of the OPC standard the in-memory
/// storage relies on:
///
/// - Part path handling and relationship part derivation
/// - Relationship records and per-part relationship tables
/// - Parsing and writing of `.rels` relationship parts
pub mod constants;
pub mod escape;
pub mod packuri;
pub mod rel;
pub mod rels_xml;

// Re-export commonly used types
pub use packuri::{PACKAGE_RELS_PATH, PartPath};
pub use rel::{RelationshipFields, RelationshipRecord, RelationshipTable};
pub use rels_xml::{parse_relationships, write_relationships};
