//! Declared numeric types of the legacy VTK format.

use std::fmt;

/// Numeric storage type named in a section header (`POINTS n float` etc.).
///
/// Whatever the declared width and signedness, decoded values are always
/// normalized to `f32` by the token reader.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bit,
    UnsignedChar,
    Char,
    UnsignedShort,
    Short,
    UnsignedInt,
    #[default]
    Int,
    UnsignedLong,
    Long,
    Float,
    Double,
}

impl ScalarType {
    /// Size in bytes of one binary-encoded value of this type.
    ///
    /// `bit` values are stored one per byte in the files this loader
    /// actually sees, matching the original toolkit.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Bit => 1,
            Self::UnsignedChar => 1,
            Self::Char => 1,
            Self::UnsignedShort => 2,
            Self::Short => 2,
            Self::UnsignedInt => 4,
            Self::Int => 4,
            Self::UnsignedLong => 8,
            Self::Long => 8,
            Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// Returns the format keyword for this type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bit => "bit",
            Self::UnsignedChar => "unsigned_char",
            Self::Char => "char",
            Self::UnsignedShort => "unsigned_short",
            Self::Short => "short",
            Self::UnsignedInt => "unsigned_int",
            Self::Int => "int",
            Self::UnsignedLong => "unsigned_long",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Parse a format keyword, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        let t = token.to_ascii_lowercase();
        Some(match t.as_str() {
            "bit" => Self::Bit,
            "unsigned_char" => Self::UnsignedChar,
            "char" => Self::Char,
            "unsigned_short" => Self::UnsignedShort,
            "short" => Self::Short,
            "unsigned_int" => Self::UnsignedInt,
            "int" => Self::Int,
            "unsigned_long" => Self::UnsignedLong,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            _ => return None,
        })
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
