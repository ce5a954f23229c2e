//! Archive indexing.
//!
//! A sabs archive has no header and no offset table. Entries are found by
//! their leading [`MARKER`](super::MARKER) and the file ends with one
//! 128-byte path slot per entry, in the same order as the entries:
//!
//! ```text
//! [fLaC ....][fLaC ....]...[fLaC ....][path 0][path 1]...[path R-1]
//! ```
//!
//! Indexing is therefore three steps: scan for markers, slice the last
//! `R * 128` bytes into path slots, and zip the two positionally.

use tracing::debug;

use crate::error::{Error, Result};

use super::scanner::find_markers;
use super::structures::{ArchiveIndex, PATH_BLOCK_SIZE, PathBlock, Record};

/// Indexes an in-memory archive buffer.
pub struct SabsParser<'a> {
    data: &'a [u8],
}

impl<'a> SabsParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Run the full indexing pipeline.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyArchive`] when no marker is found, and
    /// [`Error::CorruptArchive`] / [`Error::MarkerInPathTable`] when the
    /// marker count does not fit the file layout. Both are raised before
    /// anything is extracted.
    pub fn index(&self, progress: impl FnMut(f64)) -> Result<ArchiveIndex> {
        let offsets = find_markers(self.data, progress);
        if offsets.is_empty() {
            return Err(Error::EmptyArchive);
        }

        let (table_start, blocks) = self.read_path_table(offsets.len())?;

        if let Some(&last) = offsets.last().filter(|&&last| last >= table_start) {
            return Err(Error::MarkerInPathTable {
                offset: last,
                table_start,
            });
        }

        debug!(
            "Indexed {} entries, path table at {:#x}",
            offsets.len(),
            table_start
        );

        Ok(ArchiveIndex {
            records: assemble(offsets, blocks),
            table_start,
        })
    }

    /// Slice the trailing path table into `count` slots.
    ///
    /// Returns the table start offset and the slots in table order.
    pub fn read_path_table(&self, count: usize) -> Result<(usize, Vec<PathBlock>)> {
        let table_len = count
            .checked_mul(PATH_BLOCK_SIZE)
            .filter(|len| *len <= self.data.len())
            .ok_or_else(|| Error::CorruptArchive {
                markers: count,
                table_len: count.saturating_mul(PATH_BLOCK_SIZE),
                archive_len: self.data.len(),
            })?;

        let table_start = self.data.len() - table_len;
        let blocks = self.data[table_start..]
            .chunks_exact(PATH_BLOCK_SIZE)
            .map(|chunk| {
                let mut block = [0u8; PATH_BLOCK_SIZE];
                block.copy_from_slice(chunk);
                block
            })
            .collect();

        Ok((table_start, blocks))
    }
}

/// Pair marker offsets with path slots by position.
pub fn assemble(offsets: Vec<usize>, blocks: Vec<PathBlock>) -> Vec<Record> {
    offsets
        .into_iter()
        .zip(blocks)
        .enumerate()
        .map(|(index, (offset, path_block))| Record {
            index,
            offset,
            path_block,
        })
        .collect()
}
