/// Streams over in-memory part content.
///
/// A part's bytes live in a [`SharedBuffer`]. Opening the part hands out a
/// [`StreamSupplier`] whose input and output sides each keep their own
/// cursor over those same bytes.
pub mod buffer;
pub mod input;
pub mod output;
pub mod supplier;
pub mod traits;

pub use buffer::SharedBuffer;
pub use input::VecInputStream;
pub use output::VecOutputStream;
pub use supplier::StreamSupplier;
pub use traits::{Readable, RelationshipHolder, Seekable, Writable};
