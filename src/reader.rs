//! High-level API for reading EVCF files record by record.

use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::eventlog::{Block, EventLogHeader, Record};
use crate::models::FieldDescriptor;

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Backing {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Backing::Mapped(mmap) => &mmap[..],
            Backing::Owned(data) => data.as_slice(),
        }
    }
}

/// A reader over one open EVCF file.
///
/// Records are returned as borrowed [`Record`] views into the reader's decode
/// buffer, so a record cannot outlive the next read or the reader itself.
/// Dropping the reader closes the file.
///
/// # Examples
///
/// ```no_run
/// use evcf_merge::EventReader;
///
/// let mut reader = EventReader::open("run_0001.evcf")?;
/// println!("{} fields", reader.field_descriptors().len());
///
/// let mut count = 0;
/// while let Some(_record) = reader.next_record()? {
///     count += 1;
/// }
/// println!("{} records", count);
/// # Ok::<(), evcf_merge::Error>(())
/// ```
pub struct EventReader {
    path: Option<PathBuf>,
    data: Backing,
    header: EventLogHeader,
    block: Block,
    pos: usize,
    next_in_block: usize,
}

impl EventReader {
    /// Open and memory-map an EVCF file, parsing its header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its header is invalid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        // SAFETY: the mapping is read-only and inputs are not modified while a run is in progress.
        let mmap = unsafe { Mmap::map(&file)? };
        let mut reader = Self::with_backing(Backing::Mapped(mmap))?;
        reader.path = Some(path.as_ref().to_path_buf());
        Ok(reader)
    }

    /// Create a reader over raw bytes of an EVCF file.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::with_backing(Backing::Owned(data))
    }

    fn with_backing(data: Backing) -> Result<Self> {
        let header = EventLogHeader::parse(&data)?;
        let block = Block::new(&header.fields);
        let pos = header.data_offset;
        Ok(Self {
            path: None,
            data,
            header,
            block,
            pos,
            next_in_block: 0,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn version(&self) -> u16 {
        self.header.version
    }

    /// Field descriptors in declaration order.
    pub fn field_descriptors(&self) -> &[FieldDescriptor] {
        &self.header.fields
    }

    /// Free-text comments stored in the file header.
    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.header.comments.iter().map(String::as_str)
    }

    /// Advance to the next record.
    ///
    /// Returns `Ok(None)` at the end of the input. Decoding a new block
    /// overwrites the buffer the previous record pointed into.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`](crate::Error::Parse) if a block is truncated.
    pub fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        while self.next_in_block >= self.block.record_count() {
            if self.pos >= self.data.len() {
                return Ok(None);
            }
            self.pos = self.block.decode(&self.data, self.pos, &self.header.parents)?;
            self.next_in_block = 0;
            debug!(
                "Decoded block of {} records, next block at offset {}",
                self.block.record_count(),
                self.pos
            );
        }

        let index = self.next_in_block;
        self.next_in_block += 1;
        Ok(self.block.record(index))
    }
}
