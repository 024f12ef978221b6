//! On-disk constants for the mesh container.

/// Flat layout: submesh blocks followed by inline attribute series.
pub const VERSION_1: u32 = 1;
/// Indexed layout with a patched attribute directory, seekable per key.
pub const VERSION_2: u32 = 2;

/// Attribute kind tags stored in the V2 directory.
pub const DATA_KIND_SCALAR: u32 = 0;
pub const DATA_KIND_VECTOR: u32 = 1;

/// Element type tag for attribute payloads. Only f32 today.
pub const ELEM_TYPE_F32: u32 = 0;

/// Value written into reserved offset slots before they are patched.
pub const OFFSET_PLACEHOLDER: u32 = u32::MAX;

pub const DEFAULT_EXTENSION: &str = "c4a";
