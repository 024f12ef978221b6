//! C4A mesh container: a little-endian, versioned binary format.
//!
//! Version 1 stores every submesh inline with its attribute
//! dictionaries. Version 2 keeps a patched directory up front so a
//! consumer can seek straight to the geometry block or to any single
//! attribute without scanning the file.

pub mod format;
mod reader;
mod stream;
mod writer;

pub use reader::read_mesh;
pub use stream::{IStream, OStream, OffsetSlot};
pub use writer::write_mesh;
