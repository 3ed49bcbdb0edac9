//! Low-level decoding of the EVCF (event columnar format) container.
//!
//! ```text
//! File      := Header Block*
//! Header    := "EVCF" version:u16 field_count:u32 FieldDecl* comment_count:u32 Str*
//! FieldDecl := name:Str parent:Str type:u8
//! Str       := len:u32 utf8-bytes
//! Block     := record_count:u32 FieldColumn*
//! ```
//!
//! A field column holds, for every record of the block, that field's values
//! as 8-byte little-endian words: one for a scalar, parent-value many for an
//! array field. All integers are little-endian.

use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::Cursor;

use crate::error::{Error, Result};
use crate::models::{FieldDescriptor, FieldValues, TypeTag};

pub const MAGIC: &[u8; 4] = b"EVCF";
pub const MIN_VERSION: u16 = 0x0100;

const VALUE_WIDTH: usize = 8;

/// Parsed EVCF file header.
#[derive(Debug, Clone)]
pub struct EventLogHeader {
    pub version: u16,
    pub fields: Vec<FieldDescriptor>,
    pub comments: Vec<String>,
    /// Index of each field's parent within `fields`, `None` for scalars
    pub parents: Vec<Option<usize>>,
    /// Byte offset of the first block
    pub data_offset: usize,
}

impl EventLogHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 6 || &data[0..4] != MAGIC {
            return Err(Error::InvalidFormat("missing EVCF magic".to_string()));
        }

        let mut cursor = Cursor::new(data);
        cursor.set_position(4);

        let version = cursor.read_u16::<LittleEndian>()?;
        if version < MIN_VERSION {
            return Err(Error::InvalidFormat(format!(
                "unsupported version {:#06x}",
                version
            )));
        }

        let field_count = read_count(&mut cursor, "field count")?;
        let mut fields = Vec::with_capacity(field_count.min(1024));
        for _ in 0..field_count {
            let name = read_string(&mut cursor)?;
            let parent_name = read_string(&mut cursor)?;
            let code = read_u8(&mut cursor, "field type")?;
            let type_tag = TypeTag::from_code(code).ok_or_else(|| {
                Error::InvalidFormat(format!("field '{}' has unknown type code {}", name, code))
            })?;
            fields.push(FieldDescriptor::new(name, parent_name, type_tag));
        }

        let comment_count = read_count(&mut cursor, "comment count")?;
        let mut comments = Vec::with_capacity(comment_count.min(1024));
        for _ in 0..comment_count {
            comments.push(read_string(&mut cursor)?);
        }

        let parents = resolve_parents(&fields)?;

        Ok(Self {
            version,
            fields,
            comments,
            parents,
            data_offset: cursor.position() as usize,
        })
    }
}

/// Resolve parent names to field indices.
///
/// A parent must be declared before its child, be unsigned and be a scalar.
fn resolve_parents(fields: &[FieldDescriptor]) -> Result<Vec<Option<usize>>> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut parents = Vec::with_capacity(fields.len());

    for (idx, field) in fields.iter().enumerate() {
        if field.name.is_empty() {
            return Err(Error::InvalidFormat(format!("field #{} has an empty name", idx)));
        }
        if seen.contains_key(field.name.as_str()) {
            return Err(Error::InvalidFormat(format!(
                "field '{}' declared twice",
                field.name
            )));
        }

        let parent = if field.is_array() {
            let parent_idx = *seen.get(field.parent_name.as_str()).ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "field '{}' refers to undeclared parent '{}'",
                    field.name, field.parent_name
                ))
            })?;
            let parent = &fields[parent_idx];
            if parent.type_tag != TypeTag::UnsignedInteger || parent.is_array() {
                return Err(Error::InvalidFormat(format!(
                    "parent '{}' of field '{}' must be an unsigned scalar",
                    parent.name, field.name
                )));
            }
            Some(parent_idx)
        } else {
            None
        };

        seen.insert(field.name.as_str(), idx);
        parents.push(parent);
    }

    Ok(parents)
}

fn read_u8(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<u8> {
    cursor
        .read_u8()
        .map_err(|_| Error::InvalidFormat(format!("truncated header reading {}", what)))
}

fn read_count(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<usize> {
    cursor
        .read_u32::<LittleEndian>()
        .map(|n| n as usize)
        .map_err(|_| Error::InvalidFormat(format!("truncated header reading {}", what)))
}

fn read_string(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let size = read_count(cursor, "string size")?;
    let start = cursor.position() as usize;
    let data = *cursor.get_ref();
    let end = start
        .checked_add(size)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| Error::InvalidFormat("invalid string size".to_string()))?;

    let s = String::from_utf8(data[start..end].to_vec())?;
    cursor.set_position(end as u64);
    Ok(s)
}

/// Decoded values of one field across all records of a block.
#[derive(Debug, Clone)]
enum ColumnValues {
    Unsigned(Vec<u64>),
    Signed(Vec<i64>),
    Float(Vec<f64>),
}

impl ColumnValues {
    fn for_type(tag: TypeTag) -> Self {
        match tag {
            TypeTag::UnsignedInteger => ColumnValues::Unsigned(Vec::new()),
            TypeTag::SignedInteger => ColumnValues::Signed(Vec::new()),
            TypeTag::FloatingPoint => ColumnValues::Float(Vec::new()),
        }
    }

    fn clear(&mut self) {
        match self {
            ColumnValues::Unsigned(v) => v.clear(),
            ColumnValues::Signed(v) => v.clear(),
            ColumnValues::Float(v) => v.clear(),
        }
    }

    fn push_from(&mut self, cursor: &mut Cursor<&[u8]>) -> Result<()> {
        match self {
            ColumnValues::Unsigned(v) => v.push(cursor.read_u64::<LittleEndian>()?),
            ColumnValues::Signed(v) => v.push(cursor.read_i64::<LittleEndian>()?),
            ColumnValues::Float(v) => v.push(cursor.read_f64::<LittleEndian>()?),
        }
        Ok(())
    }

    fn slice(&self, start: usize, end: usize) -> FieldValues<'_> {
        match self {
            ColumnValues::Unsigned(v) => FieldValues::Unsigned(&v[start..end]),
            ColumnValues::Signed(v) => FieldValues::Signed(&v[start..end]),
            ColumnValues::Float(v) => FieldValues::Float(&v[start..end]),
        }
    }
}

#[derive(Debug, Clone)]
struct BlockColumn {
    values: ColumnValues,
    /// `offsets[r]..offsets[r + 1]` are the values of record `r`
    offsets: Vec<usize>,
}

/// Decode buffer for one block of records.
///
/// The buffer is reused from block to block: decoding the next block
/// overwrites the previous contents in place.
#[derive(Debug, Clone)]
pub struct Block {
    record_count: usize,
    columns: Vec<BlockColumn>,
}

impl Block {
    pub fn new(fields: &[FieldDescriptor]) -> Self {
        Self {
            record_count: 0,
            columns: fields
                .iter()
                .map(|f| BlockColumn {
                    values: ColumnValues::for_type(f.type_tag),
                    offsets: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        (index < self.record_count).then_some(Record { block: self, index })
    }

    /// Decode the block starting at `pos`, returning the offset just past it.
    pub fn decode(&mut self, data: &[u8], pos: usize, parents: &[Option<usize>]) -> Result<usize> {
        if pos + 4 > data.len() {
            return Err(Error::Parse(format!(
                "truncated block header at offset {}",
                pos
            )));
        }

        let mut cursor = Cursor::new(data);
        cursor.set_position(pos as u64);
        let record_count = cursor.read_u32::<LittleEndian>()? as usize;

        for column in &mut self.columns {
            column.values.clear();
            column.offsets.clear();
            column.offsets.push(0);
        }
        self.record_count = 0;

        for field_idx in 0..self.columns.len() {
            for record in 0..record_count {
                let count = match parents[field_idx] {
                    Some(parent_idx) => self.parent_value(parent_idx, record)?,
                    None => 1,
                };

                let needed = count
                    .checked_mul(VALUE_WIDTH)
                    .ok_or_else(|| Error::Parse(format!("array length {} overflows", count)))?;
                let remaining = data.len() - cursor.position() as usize;
                if needed > remaining {
                    return Err(Error::Parse(format!(
                        "truncated block at offset {}: field #{} record {} needs {} bytes, {} left",
                        pos, field_idx, record, needed, remaining
                    )));
                }

                let column = &mut self.columns[field_idx];
                for _ in 0..count {
                    column.values.push_from(&mut cursor)?;
                }
                let end = column.offsets[record] + count;
                column.offsets.push(end);
            }
        }

        self.record_count = record_count;
        Ok(cursor.position() as usize)
    }

    fn parent_value(&self, parent_idx: usize, record: usize) -> Result<usize> {
        match &self.columns[parent_idx].values {
            ColumnValues::Unsigned(v) => {
                let value = v[record];
                usize::try_from(value)
                    .map_err(|_| Error::Parse(format!("array length {} out of range", value)))
            }
            _ => Err(Error::Schema(format!(
                "parent field #{} is not unsigned",
                parent_idx
            ))),
        }
    }
}

/// A view of one decoded record, valid until the owning block is decoded again.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    block: &'a Block,
    index: usize,
}

impl<'a> Record<'a> {
    pub fn field_count(&self) -> usize {
        self.block.columns.len()
    }

    /// Values of field `field_idx` in this record.
    pub fn field(&self, field_idx: usize) -> Option<FieldValues<'a>> {
        let column = self.block.columns.get(field_idx)?;
        let start = column.offsets[self.index];
        let end = column.offsets[self.index + 1];
        Some(column.values.slice(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(fields: &[(&str, &str, u8)]) -> Vec<u8> {
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&MIN_VERSION.to_le_bytes());
        data.extend_from_slice(&(fields.len() as u32).to_le_bytes());
        for (name, parent, code) in fields {
            data.extend_from_slice(&(name.len() as u32).to_le_bytes());
            data.extend_from_slice(name.as_bytes());
            data.extend_from_slice(&(parent.len() as u32).to_le_bytes());
            data.extend_from_slice(parent.as_bytes());
            data.push(*code);
        }
        data.extend_from_slice(&0u32.to_le_bytes());
        data
    }

    #[test]
    fn test_parent_resolution() {
        let data = header_bytes(&[("nhit", "", 0), ("pe", "nhit", 2)]);
        let header = EventLogHeader::parse(&data).unwrap();
        assert_eq!(header.parents, vec![None, Some(0)]);
        assert_eq!(header.data_offset, data.len());
    }

    #[test]
    fn test_parent_must_be_declared_first() {
        let data = header_bytes(&[("pe", "nhit", 2), ("nhit", "", 0)]);
        assert!(matches!(
            EventLogHeader::parse(&data),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parent_must_be_unsigned() {
        let data = header_bytes(&[("nhit", "", 1), ("pe", "nhit", 2)]);
        assert!(matches!(
            EventLogHeader::parse(&data),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_decode_block_with_array() {
        let mut data = header_bytes(&[("nhit", "", 0), ("pe", "nhit", 2)]);
        let header = EventLogHeader::parse(&data).unwrap();

        // two records: nhit = [2, 0], pe = [[1.5, 2.5], []]
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&2u64.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(&1.5f64.to_le_bytes());
        data.extend_from_slice(&2.5f64.to_le_bytes());

        let mut block = Block::new(&header.fields);
        let end = block
            .decode(&data, header.data_offset, &header.parents)
            .unwrap();
        assert_eq!(end, data.len());
        assert_eq!(block.record_count(), 2);

        let first = block.record(0).unwrap();
        assert_eq!(first.field(0), Some(FieldValues::Unsigned(&[2])));
        assert_eq!(first.field(1), Some(FieldValues::Float(&[1.5, 2.5])));

        let second = block.record(1).unwrap();
        assert_eq!(second.field(1), Some(FieldValues::Float(&[])));
        assert!(block.record(2).is_none());
    }
}
