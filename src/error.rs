//! Error types for archive loading, indexing and extraction.

use std::path::PathBuf;
use std::str::Utf8Error;

use thiserror::Error;

/// Result type for sabs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading, indexing or extracting an archive
#[derive(Error, Debug)]
pub enum Error {
    /// File open/read/write failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure while fetching a remote archive
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote server answered, but not in a usable way
    #[error("Remote source error: {0}")]
    Remote(String),

    /// No entry marker was found anywhere in the archive
    #[error("Archive appears to be empty: no entry markers found")]
    EmptyArchive,

    /// The path table would start before the beginning of the archive
    #[error(
        "Corrupt archive: {markers} markers need a {table_len}-byte path table, \
         but the archive is only {archive_len} bytes"
    )]
    CorruptArchive {
        markers: usize,
        table_len: usize,
        archive_len: usize,
    },

    /// A marker was found inside the path table region
    #[error("Corrupt archive: marker at {offset:#x} lies inside the path table at {table_start:#x}")]
    MarkerInPathTable { offset: usize, table_start: usize },

    /// An entry's stored path could not be turned into a file name
    #[error(transparent)]
    Name(#[from] NameError),

    /// No record with this index exists
    #[error("Entry index {index} out of range (archive has {count} entries)")]
    IndexOutOfRange { index: usize, count: usize },

    /// A batch extraction stopped at this entry
    #[error("Failed to extract entry {index} ({name}): {source}")]
    Entry {
        index: usize,
        name: String,
        /// Files the batch wrote before it stopped
        written: Vec<PathBuf>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// True for errors that concern a single record's name and leave
    /// the rest of the archive extractable.
    pub fn is_per_record(&self) -> bool {
        matches!(self, Error::Name(_))
    }
}

/// Failure to resolve one entry's name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// A path block is not valid UTF-8
    #[error("Entry {index}: path is not valid UTF-8: {source}")]
    Decode {
        index: usize,
        #[source]
        source: Utf8Error,
    },

    /// A path would escape the output directory
    #[error("Entry {index}: refusing unsafe path {path:?}")]
    UnsafePath { index: usize, path: String },
}
