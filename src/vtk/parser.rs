//! Keyword-driven recursive-descent parser for legacy VTK files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use smallvec::SmallVec;
use tracing::debug;

use super::model::*;
use super::scalar_type::ScalarType;
use super::token::{FileFormat, TokenReader};
use crate::util::{Error, Result, Vec3, Vec4};

impl Dataset {
    /// Parse one VTK file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let buf = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Self::parse(buf)
    }

    /// Parse one VTK file from an in-memory buffer.
    pub fn parse(buf: Vec<u8>) -> Result<Self> {
        DatasetParser::new(buf)?.parse()
    }
}

/// Determine the encoding from the third preamble line without touching
/// the main cursor. Scans the borrowed buffer directly; CR, LF and CRLF
/// line endings are accepted like the main line reader.
fn sniff_format(buf: &[u8]) -> Result<FileFormat> {
    let mut pos = 0usize;
    let mut tag: &[u8] = &[];
    for _ in 0..3 {
        if pos >= buf.len() {
            return Err(Error::Truncated { offset: pos as u64 });
        }
        let start = pos;
        while pos < buf.len() && buf[pos] != b'\n' && buf[pos] != b'\r' {
            pos += 1;
        }
        tag = &buf[start..pos];
        if buf.get(pos) == Some(&b'\r') {
            pos += 1;
            if buf.get(pos) == Some(&b'\n') {
                pos += 1;
            }
        } else if pos < buf.len() {
            pos += 1;
        }
    }
    match tag.trim_ascii() {
        b"ASCII" => Ok(FileFormat::Ascii),
        b"BINARY" => Ok(FileFormat::Binary),
        other => Err(Error::format(format!(
            "invalid format tag: {:?}",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Parser state: the shared cursor plus the one-token lookahead slot.
///
/// A section loop that meets a keyword it does not own leaves it in
/// `pending` instead of consuming it; the enclosing loop dispatches on it
/// next.
struct DatasetParser {
    reader: TokenReader,
    pending: Option<String>,
}

impl DatasetParser {
    fn new(buf: Vec<u8>) -> Result<Self> {
        let format = sniff_format(&buf)?;
        Ok(Self {
            reader: TokenReader::new(buf, format),
            pending: None,
        })
    }

    fn is_binary(&self) -> bool {
        self.reader.format() == FileFormat::Binary
    }

    /// Next keyword or record token, honoring the lookahead slot.
    fn token(&mut self) -> Result<String> {
        match self.pending.take() {
            Some(tok) => Ok(tok),
            None => self.reader.next_token(),
        }
    }

    /// Like [`Self::token`] but `None` at a clean end of input.
    fn try_token(&mut self) -> Result<Option<String>> {
        match self.pending.take() {
            Some(tok) => Ok(Some(tok)),
            None => self.reader.try_next_token(),
        }
    }

    fn parse(mut self) -> Result<Dataset> {
        let (major_version, minor_version, description) = self.parse_preamble()?;

        let mut geometry: Option<Geometry> = None;
        let mut point_data = BTreeMap::new();
        let mut cell_data = BTreeMap::new();

        while let Some(tok) = self.try_token()? {
            match tok.as_str() {
                "DATASET" => geometry = self.parse_dataset()?,
                "POINT_DATA" => self.parse_data_attribs(&mut point_data)?,
                "CELL_DATA" => self.parse_data_attribs(&mut cell_data)?,
                "METADATA" => self.skip_metadata()?,
                other => return Err(Error::unsupported(other)),
            }
        }

        let geometry =
            geometry.ok_or_else(|| Error::format("file has no DATASET section"))?;

        Ok(Dataset {
            major_version,
            minor_version,
            description,
            geometry,
            point_data,
            cell_data,
        })
    }

    /// First line carries the version, second a free-text description,
    /// third the already-sniffed format tag.
    fn parse_preamble(&mut self) -> Result<(u32, u32, String)> {
        let line = self.reader.read_line()?;
        let version = line
            .split_whitespace()
            .last()
            .ok_or_else(|| Error::format("empty version line"))?;
        let (major, minor) = version
            .split_once('.')
            .ok_or_else(|| Error::format(format!("invalid version: {version:?}")))?;
        let major = major
            .parse::<u32>()
            .map_err(|_| Error::format(format!("invalid major version: {major:?}")))?;
        let minor = minor
            .parse::<u32>()
            .map_err(|_| Error::format(format!("invalid minor version: {minor:?}")))?;

        let description = self.reader.read_line()?;
        if description.len() > 255 {
            return Err(Error::format("description line longer than 255 chars"));
        }
        debug!("file version {}.{}: {}", major, minor, description);

        // Format tag, validated by the sniff pass.
        self.reader.read_line()?;
        Ok((major, minor, description))
    }

    fn parse_dataset(&mut self) -> Result<Option<Geometry>> {
        let kind = self.token()?;
        match kind.as_str() {
            "UNSTRUCTURED_GRID" => Ok(Some(self.parse_unstructured_grid()?)),
            "POLYDATA" => Ok(Some(self.parse_polydata()?)),
            "METADATA" => {
                self.skip_metadata()?;
                Ok(None)
            }
            other => Err(Error::unsupported(other)),
        }
    }

    fn parse_unstructured_grid(&mut self) -> Result<Geometry> {
        let mut points = Vec::new();
        let mut cells = Vec::new();
        while let Some(tok) = self.try_token()? {
            match tok.as_str() {
                "POINTS" => points = self.parse_points()?,
                "CELLS" => cells = self.parse_cells()?,
                "CELL_TYPES" => self.parse_cell_types(&mut cells)?,
                "METADATA" => self.skip_metadata()?,
                _ => {
                    self.pending = Some(tok);
                    break;
                }
            }
        }
        Ok(Geometry::UnstructuredGrid { points, cells })
    }

    fn parse_polydata(&mut self) -> Result<Geometry> {
        let mut points = Vec::new();
        let mut items: Vec<PolyItem> = Vec::new();
        while let Some(tok) = self.try_token()? {
            match tok.as_str() {
                "POINTS" => points = self.parse_points()?,
                "VERTICES" | "LINES" | "POLYGONS" | "TRIANGLE_STRIPS" => {
                    let indices = self.parse_index_lists()?;
                    items.push(PolyItem { name: tok, indices });
                }
                "METADATA" => self.skip_metadata()?,
                _ => {
                    self.pending = Some(tok);
                    break;
                }
            }
        }
        Ok(Geometry::PolyData { points, items })
    }

    fn parse_points(&mut self) -> Result<Vec<Vec3>> {
        let n = self.reader.read_count()?;
        let ty = self.reader.read_scalar_type()?;
        debug!("POINTS n={} type={}", n, ty);
        let mut points = Vec::with_capacity(n);
        for _ in 0..n {
            points.push(Vec3::new(
                self.reader.read_value(ty)?,
                self.reader.read_value(ty)?,
                self.reader.read_value(ty)?,
            ));
        }
        Ok(points)
    }

    /// Read one topology index, rejecting negative values.
    fn read_u32_index(&mut self) -> Result<u32> {
        let idx = self.reader.read_index()?;
        u32::try_from(idx)
            .map_err(|_| Error::format(format!("negative index: {idx}")))
    }

    /// `CELLS n size`: n count-prefixed index lists, bounded by both n
    /// and the total value count.
    fn parse_cells(&mut self) -> Result<Vec<Cell>> {
        let n = self.reader.read_count()?;
        let size = self.reader.read_count()?;
        debug!("CELLS n={} size={}", n, size);
        let mut cells = Vec::with_capacity(n);
        let mut consumed = 0usize;
        while cells.len() < n && consumed < size {
            let count = self.read_u32_index()? as usize;
            consumed += 1;
            let mut indices = SmallVec::with_capacity(count);
            for _ in 0..count {
                indices.push(self.read_u32_index()?);
                consumed += 1;
            }
            cells.push(Cell {
                kind: CellKind::default(),
                indices,
            });
        }
        Ok(cells)
    }

    /// `CELL_TYPES n`: assigns kinds positionally onto the CELLS list.
    fn parse_cell_types(&mut self, cells: &mut [Cell]) -> Result<()> {
        let n = self.reader.read_count()?;
        debug!("CELL_TYPES n={}", n);
        if n != cells.len() {
            return Err(Error::format(format!(
                "CELL_TYPES count {n} does not match {} cells",
                cells.len()
            )));
        }
        for cell in cells.iter_mut() {
            let id = self.read_u32_index()?;
            cell.kind = CellKind::from_id(id)
                .ok_or_else(|| Error::unsupported(format!("cell type {id}")))?;
        }
        Ok(())
    }

    /// Shared body of VERTICES/LINES/POLYGONS/TRIANGLE_STRIPS sections.
    fn parse_index_lists(&mut self) -> Result<Vec<SmallVec<[u32; 8]>>> {
        let n = self.reader.read_count()?;
        let size = self.reader.read_count()?;
        debug!("polydata item n={} size={}", n, size);
        let mut lists = Vec::with_capacity(n);
        let mut consumed = 0usize;
        while lists.len() < n && consumed < size {
            let count = self.read_u32_index()? as usize;
            consumed += 1;
            let mut indices = SmallVec::with_capacity(count);
            for _ in 0..count {
                indices.push(self.read_u32_index()?);
                consumed += 1;
            }
            lists.push(indices);
        }
        Ok(lists)
    }

    /// `POINT_DATA n` / `CELL_DATA n` followed by attribute records.
    fn parse_data_attribs(
        &mut self,
        attribs: &mut BTreeMap<String, Attribute>,
    ) -> Result<()> {
        let n = self.reader.read_count()?;
        while let Some(tok) = self.try_token()? {
            match tok.as_str() {
                "SCALARS" | "COLOR_SCALARS" => {
                    let (name, attr) = self.parse_scalars(&tok, n)?;
                    attribs.insert(name, attr);
                }
                "LOOKUP_TABLE" => {
                    let (name, attr) = self.parse_lookup_table()?;
                    attribs.insert(name, attr);
                }
                "VECTORS" | "NORMALS" => {
                    let (name, attr) = self.parse_vectors_or_normals(&tok, n)?;
                    attribs.insert(name, attr);
                }
                "TEXTURE_COORDINATES" => {
                    let (name, attr) = self.parse_texture_coordinates(n)?;
                    attribs.insert(name, attr);
                }
                "FIELD" => {
                    let (name, attr) = self.parse_field()?;
                    attribs.insert(name, attr);
                }
                "TENSORS" => return Err(Error::unsupported("TENSORS")),
                "METADATA" => self.skip_metadata()?,
                _ => {
                    self.pending = Some(tok);
                    break;
                }
            }
        }
        Ok(())
    }

    /// SCALARS and COLOR_SCALARS records.
    ///
    /// The normalization asymmetry is deliberate and load-bearing for
    /// existing files: binary component values are divided by 255 after
    /// decode (colors are unsigned bytes on disk), ASCII values are used
    /// as written.
    fn parse_scalars(&mut self, keyword: &str, n: usize) -> Result<(String, Attribute)> {
        let name = self.token()?;
        let color = keyword == "COLOR_SCALARS";
        let (components, ty, lookup_table) = if color {
            // Header carries a value count we do not honor: stored colors
            // always have 4 components.
            if self.reader.line_has_more() {
                self.reader.read_count()?;
            }
            let ty = if self.is_binary() {
                ScalarType::UnsignedChar
            } else {
                ScalarType::Float
            };
            (4, ty, String::new())
        } else {
            let ty = self.reader.read_scalar_type()?;
            let components = if self.reader.line_has_more() {
                self.reader.read_count()?
            } else {
                1
            };
            let kw = self.token()?;
            if kw != "LOOKUP_TABLE" {
                return Err(Error::format(format!(
                    "SCALARS {name}: expected LOOKUP_TABLE, found {kw:?}"
                )));
            }
            let table = self.token()?;
            (components, ty, table)
        };
        debug!("{} name={} type={} comps={}", keyword, name, ty, components);

        let binary = self.is_binary();
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            let mut row = Vec::with_capacity(components);
            for _ in 0..components {
                let mut v = self.reader.read_value(ty)?;
                if binary {
                    v /= 255.0;
                }
                row.push(v);
            }
            values.push(row);
        }

        let attr = if color {
            Attribute::ColorScalars { values }
        } else {
            Attribute::Scalars {
                components,
                lookup_table,
                values,
            }
        };
        Ok((name, attr))
    }

    /// Standalone `LOOKUP_TABLE name size` palette record.
    fn parse_lookup_table(&mut self) -> Result<(String, Attribute)> {
        let name = self.token()?;
        let size = self.reader.read_count()?;
        debug!("LOOKUP_TABLE name={} size={}", name, size);
        let mut rgbas = Vec::with_capacity(size);
        if self.is_binary() {
            for _ in 0..size {
                let mut c = [0.0f32; 4];
                for v in &mut c {
                    *v = self.reader.read_value(ScalarType::UnsignedChar)? / 255.0;
                }
                rgbas.push(Vec4::from_array(c));
            }
        } else {
            for _ in 0..size {
                let mut c = [0.0f32; 4];
                for v in &mut c {
                    *v = self.reader.read_value(ScalarType::Float)?;
                }
                rgbas.push(Vec4::from_array(c));
            }
        }
        Ok((name, Attribute::LookupTable(rgbas)))
    }

    fn parse_vectors_or_normals(
        &mut self,
        keyword: &str,
        n: usize,
    ) -> Result<(String, Attribute)> {
        let name = self.token()?;
        let ty = self.reader.read_scalar_type()?;
        debug!("{} name={} type={}", keyword, name, ty);
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(Vec3::new(
                self.reader.read_value(ty)?,
                self.reader.read_value(ty)?,
                self.reader.read_value(ty)?,
            ));
        }
        let attr = if keyword == "VECTORS" {
            Attribute::Vectors(values)
        } else {
            Attribute::Normals(values)
        };
        Ok((name, attr))
    }

    /// `TEXTURE_COORDINATES name dim [type]`; type defaults to float.
    fn parse_texture_coordinates(&mut self, n: usize) -> Result<(String, Attribute)> {
        let name = self.token()?;
        let dim = self.reader.read_count()?;
        let ty = if self.reader.line_has_more() {
            self.reader.read_scalar_type()?
        } else {
            ScalarType::Float
        };
        debug!("TEXTURE_COORDINATES name={} dim={} type={}", name, dim, ty);
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            let mut row = Vec::with_capacity(dim);
            for _ in 0..dim {
                row.push(self.reader.read_value(ty)?);
            }
            values.push(row);
        }
        Ok((name, Attribute::TextureCoordinates { dim, values }))
    }

    /// `FIELD name numArrays` with per-array headers and tuple payloads.
    fn parse_field(&mut self) -> Result<(String, Attribute)> {
        let name = self.token()?;
        let num_arrays = self.reader.read_count()?;
        debug!("FIELD name={} arrays={}", name, num_arrays);
        let mut arrays = BTreeMap::new();
        for _ in 0..num_arrays {
            let arr_name = self.token()?;
            let components = self.reader.read_count()?;
            let num_tuples = self.reader.read_count()?;
            let ty = self.reader.read_scalar_type()?;
            debug!(
                "field array name={} comps={} tuples={} type={}",
                arr_name, components, num_tuples, ty
            );
            let mut tuples = Vec::with_capacity(num_tuples);
            for _ in 0..num_tuples {
                let mut row = Vec::with_capacity(components);
                for _ in 0..components {
                    row.push(self.reader.read_value(ty)?);
                }
                tuples.push(row);
            }
            arrays.insert(arr_name, FieldArray { components, tuples });

            self.skip_field_trailer()?;
        }
        Ok((name, Attribute::FieldData(arrays)))
    }

    /// Arrays may be followed by blank/NUL lines and an inline METADATA
    /// block before the next array header.
    fn skip_field_trailer(&mut self) -> Result<()> {
        loop {
            match self.reader.peek_byte() {
                Some(b'\0') | Some(b'\r') | Some(b'\n') => {
                    self.reader.read_line()?;
                }
                _ => break,
            }
        }
        if self.reader.peek_byte() == Some(b'M') && !self.reader.line_has_more() {
            let tok = self.reader.next_token()?;
            if tok == "METADATA" {
                self.skip_metadata()?;
            } else {
                self.pending = Some(tok);
            }
        }
        Ok(())
    }

    /// Discard a METADATA block: the rest of its line, then whole lines
    /// for the keywords the block is known to contain. The first foreign
    /// keyword goes back into the lookahead slot.
    fn skip_metadata(&mut self) -> Result<()> {
        self.reader.skip_line_rest();
        while let Some(tok) = self.try_token()? {
            match tok.as_str() {
                "INFORMATION" | "NAME" | "DATA" => self.reader.skip_line_rest(),
                _ => {
                    self.pending = Some(tok);
                    break;
                }
            }
        }
        Ok(())
    }
}
