//! Format-aware token cursor for legacy VTK files.

use byteorder::{BigEndian, ByteOrder};

use super::scalar_type::ScalarType;
use crate::util::{Error, Result};

/// Encoding of a legacy VTK file, declared on the third preamble line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Ascii,
    Binary,
}

/// Cursor over one in-memory VTK file.
///
/// Lines, whitespace tokens and binary numeric reads all advance the same
/// cursor, so a binary payload read never desyncs the token state. Counts
/// and keywords always come from ASCII lines, even in binary files; only
/// section payloads switch representation.
pub struct TokenReader {
    buf: Vec<u8>,
    pos: usize,
    format: FileFormat,
    line_tokens: Vec<String>,
    token_idx: usize,
}

impl TokenReader {
    pub fn new(buf: Vec<u8>, format: FileFormat) -> Self {
        Self {
            buf,
            pos: 0,
            format,
            line_tokens: Vec::new(),
            token_idx: 0,
        }
    }

    /// Declared encoding of this file.
    #[inline]
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// True once the underlying buffer is exhausted.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Peek the next unread byte without consuming it.
    #[inline]
    pub fn peek_byte(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Read the next raw line, scanning to CR, LF or CRLF.
    ///
    /// Works in binary mode too: binary files interleave ASCII header
    /// lines with raw payload bytes.
    pub fn read_line(&mut self) -> Result<String> {
        if self.is_eof() {
            return Err(Error::Truncated { offset: self.pos as u64 });
        }
        let start = self.pos;
        while self.pos < self.buf.len() {
            match self.buf[self.pos] {
                b'\n' => {
                    let line = self.buf[start..self.pos].to_vec();
                    self.pos += 1;
                    return Ok(String::from_utf8(line)?);
                }
                b'\r' => {
                    let line = self.buf[start..self.pos].to_vec();
                    self.pos += 1;
                    if self.peek_byte() == Some(b'\n') {
                        self.pos += 1;
                    }
                    return Ok(String::from_utf8(line)?);
                }
                _ => self.pos += 1,
            }
        }
        Ok(String::from_utf8(self.buf[start..].to_vec())?)
    }

    /// Next whitespace-delimited token, advancing lines as they run out.
    /// Returns `Ok(None)` at a clean end of input.
    pub fn try_next_token(&mut self) -> Result<Option<String>> {
        loop {
            if self.token_idx < self.line_tokens.len() {
                let tok = self.line_tokens[self.token_idx].clone();
                self.token_idx += 1;
                return Ok(Some(tok));
            }
            if self.is_eof() {
                return Ok(None);
            }
            let line = self.read_line()?;
            self.line_tokens = line.split_whitespace().map(str::to_string).collect();
            self.token_idx = 0;
        }
    }

    /// Next token, treating end of input as truncation.
    pub fn next_token(&mut self) -> Result<String> {
        let offset = self.pos as u64;
        self.try_next_token()?
            .ok_or(Error::Truncated { offset })
    }

    /// Whether unconsumed tokens remain on the current line.
    ///
    /// Optional trailing header fields (SCALARS component count,
    /// TEXTURE_COORDINATES data type) hinge on this.
    #[inline]
    pub fn line_has_more(&self) -> bool {
        self.token_idx < self.line_tokens.len()
    }

    /// Discard the rest of the current line's tokens.
    #[inline]
    pub fn skip_line_rest(&mut self) {
        self.token_idx = self.line_tokens.len();
    }

    /// Parse the next token as a base-10 count.
    pub fn read_count(&mut self) -> Result<usize> {
        let tok = self.next_token()?;
        tok.parse::<usize>()
            .map_err(|_| Error::format(format!("invalid count token: {tok:?}")))
    }

    /// Parse the next token as a declared scalar type keyword.
    pub fn read_scalar_type(&mut self) -> Result<ScalarType> {
        let tok = self.next_token()?;
        ScalarType::parse(&tok)
            .ok_or_else(|| Error::format(format!("invalid data type token: {tok:?}")))
    }

    /// One topology index: 4-byte big-endian in binary, base-10 in text.
    pub fn read_index(&mut self) -> Result<i32> {
        match self.format {
            FileFormat::Ascii => {
                let tok = self.next_token()?;
                tok.parse::<i32>()
                    .map_err(|_| Error::format(format!("invalid index token: {tok:?}")))
            }
            FileFormat::Binary => {
                let raw = self.take_bytes(4)?;
                Ok(BigEndian::read_i32(raw))
            }
        }
    }

    /// One numeric value of the declared type, normalized to f32.
    ///
    /// Binary payloads are big-endian on disk; byteorder corrects for the
    /// host. Text tokens are parsed per the declared type so width and
    /// signedness violations surface as format errors.
    pub fn read_value(&mut self, ty: ScalarType) -> Result<f32> {
        match self.format {
            FileFormat::Ascii => self.read_text_value(ty),
            FileFormat::Binary => self.read_binary_value(ty),
        }
    }

    fn read_text_value(&mut self, ty: ScalarType) -> Result<f32> {
        let tok = self.next_token()?;
        let parsed = match ty {
            ScalarType::Bit => tok.parse::<i32>().map(|v| v as f32).ok(),
            ScalarType::UnsignedChar => tok.parse::<u8>().map(f32::from).ok(),
            ScalarType::Char => tok.parse::<i8>().map(f32::from).ok(),
            ScalarType::UnsignedShort => tok.parse::<u16>().map(f32::from).ok(),
            ScalarType::Short => tok.parse::<i16>().map(f32::from).ok(),
            ScalarType::UnsignedInt => tok.parse::<u32>().map(|v| v as f32).ok(),
            ScalarType::Int => tok.parse::<i32>().map(|v| v as f32).ok(),
            ScalarType::UnsignedLong => tok.parse::<u64>().map(|v| v as f32).ok(),
            ScalarType::Long => tok.parse::<i64>().map(|v| v as f32).ok(),
            ScalarType::Float => tok.parse::<f32>().ok(),
            ScalarType::Double => tok.parse::<f64>().map(|v| v as f32).ok(),
        };
        parsed.ok_or_else(|| Error::format(format!("invalid {} token: {tok:?}", ty.name())))
    }

    fn read_binary_value(&mut self, ty: ScalarType) -> Result<f32> {
        let raw = self.take_bytes(ty.num_bytes())?;
        Ok(match ty {
            ScalarType::Bit => raw[0] as f32,
            ScalarType::UnsignedChar => raw[0] as f32,
            ScalarType::Char => raw[0] as i8 as f32,
            ScalarType::UnsignedShort => BigEndian::read_u16(raw) as f32,
            ScalarType::Short => BigEndian::read_i16(raw) as f32,
            ScalarType::UnsignedInt => BigEndian::read_u32(raw) as f32,
            ScalarType::Int => BigEndian::read_i32(raw) as f32,
            ScalarType::UnsignedLong => BigEndian::read_u64(raw) as f32,
            ScalarType::Long => BigEndian::read_i64(raw) as f32,
            ScalarType::Float => BigEndian::read_f32(raw),
            ScalarType::Double => BigEndian::read_f64(raw) as f32,
        })
    }

    fn take_bytes(&mut self, n: usize) -> Result<&[u8]> {
        if self.pos + n > self.buf.len() {
            return Err(Error::Truncated { offset: self.pos as u64 });
        }
        let raw = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii_reader(text: &str) -> TokenReader {
        TokenReader::new(text.as_bytes().to_vec(), FileFormat::Ascii)
    }

    #[test]
    fn test_tokens_cross_lines() {
        let mut r = ascii_reader("POINTS 3 float\n0 1 2\n\n3 4 5\n");
        assert_eq!(r.next_token().unwrap(), "POINTS");
        assert_eq!(r.read_count().unwrap(), 3);
        assert!(r.line_has_more());
        assert_eq!(r.read_scalar_type().unwrap(), ScalarType::Float);
        assert!(!r.line_has_more());
        // blank line is transparent
        for expected in [0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0] {
            assert_eq!(r.read_value(ScalarType::Float).unwrap(), expected);
        }
        assert_eq!(r.try_next_token().unwrap(), None);
    }

    #[test]
    fn test_crlf_lines() {
        let mut r = ascii_reader("a b\r\nc\rd\n");
        assert_eq!(r.read_line().unwrap(), "a b");
        assert_eq!(r.read_line().unwrap(), "c");
        assert_eq!(r.read_line().unwrap(), "d");
    }

    #[test]
    fn test_skip_line_rest() {
        let mut r = ascii_reader("METADATA junk junk\nNEXT\n");
        assert_eq!(r.next_token().unwrap(), "METADATA");
        r.skip_line_rest();
        assert_eq!(r.next_token().unwrap(), "NEXT");
    }

    #[test]
    fn test_binary_big_endian_values() {
        let mut buf = b"header line\n".to_vec();
        buf.extend_from_slice(&1.5f32.to_be_bytes());
        buf.extend_from_slice(&(-2i16).to_be_bytes());
        buf.extend_from_slice(&[200u8]);
        buf.extend_from_slice(&0.25f64.to_be_bytes());
        let mut r = TokenReader::new(buf, FileFormat::Binary);
        assert_eq!(r.read_line().unwrap(), "header line");
        assert_eq!(r.read_value(ScalarType::Float).unwrap(), 1.5);
        assert_eq!(r.read_value(ScalarType::Short).unwrap(), -2.0);
        assert_eq!(r.read_value(ScalarType::UnsignedChar).unwrap(), 200.0);
        assert_eq!(r.read_value(ScalarType::Double).unwrap(), 0.25);
        assert!(r.is_eof());
    }

    #[test]
    fn test_binary_index() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&7i32.to_be_bytes());
        buf.extend_from_slice(&(-1i32).to_be_bytes());
        let mut r = TokenReader::new(buf, FileFormat::Binary);
        assert_eq!(r.read_index().unwrap(), 7);
        assert_eq!(r.read_index().unwrap(), -1);
    }

    #[test]
    fn test_truncated_binary_read() {
        let mut r = TokenReader::new(vec![0u8, 1], FileFormat::Binary);
        assert!(matches!(
            r.read_value(ScalarType::Float),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_truncated_token_stream() {
        let mut r = ascii_reader("1 2\n");
        r.next_token().unwrap();
        r.next_token().unwrap();
        assert!(matches!(r.next_token(), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_malformed_numeric_token() {
        let mut r = ascii_reader("abc\n");
        assert!(matches!(
            r.read_value(ScalarType::Float),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut r = ascii_reader("x\n");
        assert_eq!(r.peek_byte(), Some(b'x'));
        assert_eq!(r.peek_byte(), Some(b'x'));
        assert_eq!(r.next_token().unwrap(), "x");
    }
}
