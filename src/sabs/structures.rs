use std::ops::Range;

/// Signature at the start of every packed stream.
pub const MARKER: &[u8; 4] = b"fLaC";

/// Size of one slot in the trailing path table.
pub const PATH_BLOCK_SIZE: usize = 128;

/// Extension given to every extracted entry.
pub const ENTRY_EXTENSION: &str = "flac";

/// Directory that holds entries without a stored path.
pub const UNNAMED_DIR: &str = "not-named";

/// Progress value reported once the marker scan has finished.
pub const SCAN_COMPLETE: f64 = f64::INFINITY;

/// One raw, null-padded path slot from the path table
pub type PathBlock = [u8; PATH_BLOCK_SIZE];

/// A single entry located in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Position in marker order, which is also the position in the path table
    pub index: usize,
    /// Byte offset of the entry's marker
    pub offset: usize,
    /// Raw path slot belonging to this entry
    pub path_block: PathBlock,
}

/// The indexed layout of a loaded archive.
///
/// Records are in ascending offset order; `table_start` is where the path
/// table begins and doubles as the end of the last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveIndex {
    pub records: Vec<Record>,
    pub table_start: usize,
}

impl ArchiveIndex {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Byte range of entry `index`.
    ///
    /// An entry runs up to the next marker (or the path table for the last
    /// entry), so any padding after the real payload is included.
    pub fn entry_range(&self, index: usize) -> Option<Range<usize>> {
        let record = self.records.get(index)?;
        let end = self
            .records
            .get(index + 1)
            .map_or(self.table_start, |next| next.offset);
        Some(record.offset..end)
    }
}
