/// In-memory package storage.
///
/// A package is a flat [`PartMap`] keyed by part path. [`ExpandedStorage`]
/// views scope that map to a base path and hand out streams over its
/// parts; the [`CommitTracker`] hashes the parts to find what changed
/// between saves.
pub mod commit;
pub mod expanded;
pub mod hash;
pub mod mode;
pub mod part;
pub mod part_map;
pub mod property;

pub use commit::{Commit, CommitTracker};
pub use expanded::ExpandedStorage;
pub use hash::ContentHash;
pub use mode::ElementModes;
pub use part::Part;
pub use part_map::PartMap;
pub use property::{PropertyBag, PropertyValue};
