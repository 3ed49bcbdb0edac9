//! Test utilities for building EVCF files and reading back Parquet output
#![allow(dead_code)]

use arrow::array::RecordBatch;
use byteorder::{LittleEndian, WriteBytesExt};
use evcf_merge::TypeTag;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One field's values in one record
#[derive(Debug, Clone)]
pub enum Value {
    U(u64),
    S(i64),
    F(f64),
    UArr(Vec<u64>),
    SArr(Vec<i64>),
    FArr(Vec<f64>),
}

impl Value {
    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Value::U(v) => out.write_u64::<LittleEndian>(*v).unwrap(),
            Value::S(v) => out.write_i64::<LittleEndian>(*v).unwrap(),
            Value::F(v) => out.write_f64::<LittleEndian>(*v).unwrap(),
            Value::UArr(vs) => {
                for v in vs {
                    out.write_u64::<LittleEndian>(*v).unwrap();
                }
            }
            Value::SArr(vs) => {
                for v in vs {
                    out.write_i64::<LittleEndian>(*v).unwrap();
                }
            }
            Value::FArr(vs) => {
                for v in vs {
                    out.write_f64::<LittleEndian>(*v).unwrap();
                }
            }
        }
    }
}

/// Builder for creating EVCF test files
pub struct EvcfBuilder {
    version: u16,
    fields: Vec<(String, String, u8)>,
    comments: Vec<String>,
    blocks: Vec<Vec<u8>>,
}

impl EvcfBuilder {
    /// Create a new EVCF builder (version 1.0, no fields)
    pub fn new() -> Self {
        Self::with_version(0x0100)
    }

    pub fn with_version(version: u16) -> Self {
        Self {
            version,
            fields: Vec::new(),
            comments: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Declare a field
    pub fn field(mut self, name: &str, parent: &str, type_tag: TypeTag) -> Self {
        self.fields
            .push((name.to_string(), parent.to_string(), type_tag.code()));
        self
    }

    /// Declare a field with a raw type code
    pub fn raw_field(mut self, name: &str, parent: &str, code: u8) -> Self {
        self.fields.push((name.to_string(), parent.to_string(), code));
        self
    }

    pub fn comment(mut self, text: &str) -> Self {
        self.comments.push(text.to_string());
        self
    }

    /// Add a block; each record lists one value per declared field
    pub fn block(mut self, records: &[Vec<Value>]) -> Self {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(records.len() as u32).unwrap();
        for field in 0..self.fields.len() {
            for record in records {
                record[field].write(&mut data);
            }
        }
        self.blocks.push(data);
        self
    }

    /// Add a block of a single unsigned field
    pub fn unsigned_block(self, values: &[u64]) -> Self {
        let records: Vec<Vec<Value>> = values.iter().map(|&v| vec![Value::U(v)]).collect();
        self.block(&records)
    }

    fn write_string(data: &mut Vec<u8>, s: &str) {
        data.write_u32::<LittleEndian>(s.len() as u32).unwrap();
        data.extend_from_slice(s.as_bytes());
    }

    /// Build and return the final EVCF data
    pub fn build(self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"EVCF");
        data.write_u16::<LittleEndian>(self.version).unwrap();

        data.write_u32::<LittleEndian>(self.fields.len() as u32)
            .unwrap();
        for (name, parent, code) in &self.fields {
            Self::write_string(&mut data, name);
            Self::write_string(&mut data, parent);
            data.push(*code);
        }

        data.write_u32::<LittleEndian>(self.comments.len() as u32)
            .unwrap();
        for comment in &self.comments {
            Self::write_string(&mut data, comment);
        }

        for block in &self.blocks {
            data.extend_from_slice(block);
        }
        data
    }

    /// Build and write the file to `path`
    pub fn write_to(self, path: &Path) {
        File::create(path)
            .unwrap()
            .write_all(&self.build())
            .unwrap();
    }
}

impl Default for EvcfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-field `energy` (unsigned) file with the given values
pub fn energy_file(values: &[u64]) -> EvcfBuilder {
    EvcfBuilder::new()
        .field("energy", "", TypeTag::UnsignedInteger)
        .unsigned_block(values)
}

/// Read every record batch of a finalized Parquet file
pub fn read_parquet(path: &Path) -> Vec<RecordBatch> {
    let file = File::open(path).unwrap();
    ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creates_valid_header() {
        let data = EvcfBuilder::new().build();
        assert_eq!(&data[0..4], b"EVCF");
        assert_eq!(data[4], 0x00); // Minor version
        assert_eq!(data[5], 0x01); // Major version
        assert_eq!(data[6..10], [0, 0, 0, 0]); // Field count
        assert_eq!(data[10..14], [0, 0, 0, 0]); // Comment count
    }

    #[test]
    fn test_block_is_columnar() {
        let data = EvcfBuilder::new()
            .field("a", "", TypeTag::UnsignedInteger)
            .field("b", "", TypeTag::UnsignedInteger)
            .block(&[vec![Value::U(1), Value::U(2)], vec![Value::U(3), Value::U(4)]])
            .build();
        let block = &data[data.len() - 36..];
        assert_eq!(block[0], 2); // Record count
        assert_eq!(block[4], 1);
        assert_eq!(block[12], 3);
        assert_eq!(block[20], 2);
        assert_eq!(block[28], 4);
    }
}
