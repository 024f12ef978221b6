//! Buffered little-endian streams for the mesh container.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::format::OFFSET_PLACEHOLDER;
use crate::util::{Error, Result, Vec3, Vec4};

/// A reserved u32 slot in the output stream, patched after its value
/// becomes known.
#[derive(Clone, Copy, Debug)]
pub struct OffsetSlot(u64);

/// Output stream for writing container data.
pub struct OStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OStream {
    /// Create a new output stream for the given file path.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(2 * 1024 * 1024, file), // 2MB buffer
            pos: 0,
        })
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Write an i32 value (little-endian).
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Write an f32 value (little-endian).
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.writer.write_f32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_u32(value.len() as u32)?;
        self.writer.write_all(value.as_bytes())?;
        self.pos += value.len() as u64;
        Ok(())
    }

    pub fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        self.write_f32(v.x)?;
        self.write_f32(v.y)?;
        self.write_f32(v.z)
    }

    pub fn write_vec4(&mut self, v: Vec4) -> Result<()> {
        self.write_f32(v.x)?;
        self.write_f32(v.y)?;
        self.write_f32(v.z)?;
        self.write_f32(v.w)
    }

    /// Reserve a u32 slot at the current position. The placeholder is
    /// written now and must be patched before the stream is dropped.
    pub fn reserve_u32(&mut self) -> Result<OffsetSlot> {
        let slot = OffsetSlot(self.pos);
        self.write_u32(OFFSET_PLACEHOLDER)?;
        Ok(slot)
    }

    /// Patch a previously reserved slot, then return to the end of the
    /// stream.
    pub fn patch_u32(&mut self, slot: OffsetSlot, value: u32) -> Result<()> {
        self.writer.flush()?;
        self.writer.seek(SeekFrom::Start(slot.0))?;
        self.writer.write_u32::<LittleEndian>(value)?;
        self.writer.flush()?;
        self.pos = self.writer.seek(SeekFrom::End(0))?;
        Ok(())
    }

    /// Flush the buffer to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Input stream for reading container data.
pub struct IStream {
    reader: BufReader<File>,
    pos: u64,
}

impl IStream {
    /// Open a file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Ok(Self {
            reader: BufReader::with_capacity(2 * 1024 * 1024, file),
            pos: 0,
        })
    }

    /// Get the current read position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Seek to an absolute position.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.pos = self.reader.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let v = self.reader.read_u32::<LittleEndian>().map_err(|e| self.eof(e))?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let v = self.reader.read_i32::<LittleEndian>().map_err(|e| self.eof(e))?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let v = self.reader.read_f32::<LittleEndian>().map_err(|e| self.eof(e))?;
        self.pos += 4;
        Ok(v)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).map_err(|e| self.eof(e))?;
        self.pos += len as u64;
        Ok(String::from_utf8(buf)?)
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec4(&mut self) -> Result<Vec4> {
        Ok(Vec4::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    fn eof(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Truncated { offset: self.pos }
        } else {
            Error::Io(e)
        }
    }
}
