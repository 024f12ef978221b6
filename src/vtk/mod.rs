//! Legacy VTK dataset format support.
//!
//! The legacy format is a token-based container: a 3-line ASCII preamble,
//! then keyword-introduced sections whose payload is either whitespace
//! separated text or raw big-endian binary. Both encodings interleave
//! ASCII header lines with their payload, so a single cursor serves line,
//! token and binary reads.
//!
//! - [`TokenReader`] - format-aware cursor over one file
//! - [`Dataset`] - parsed intermediate model, one per source file
//! - [`Attribute`] - closed set of point/cell attribute kinds

mod model;
mod parser;
mod scalar_type;
mod token;

pub use model::*;
pub use scalar_type::ScalarType;
pub use token::{FileFormat, TokenReader};
