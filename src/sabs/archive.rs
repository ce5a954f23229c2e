use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::io::{HttpReader, LocalFileReader, ReadAt};

/// Read size used when materializing a source.
const LOAD_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// A fully loaded archive.
///
/// Indexing needs the tail of the file and random access to every entry,
/// so the whole source is read into memory up front and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    data: Vec<u8>,
}

impl Archive {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Load a local archive file.
    pub async fn open(path: &Path) -> Result<Self> {
        let reader = LocalFileReader::new(path)?;
        Self::load(&reader).await
    }

    /// Load a remote archive, with range requests when the server
    /// supports them and a plain download otherwise.
    pub async fn fetch(reader: &HttpReader) -> Result<Self> {
        if reader.supports_ranges() {
            Self::load(reader).await
        } else {
            Ok(Self::from_bytes(reader.download().await?))
        }
    }

    /// Read the whole source into memory.
    ///
    /// # Errors
    ///
    /// Any read error, or `UnexpectedEof` if the source ends before its
    /// reported size.
    pub async fn load<R: ReadAt + ?Sized>(reader: &R) -> Result<Self> {
        let size = usize::try_from(reader.size()).map_err(|_| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                "archive does not fit in memory",
            ))
        })?;

        let mut data = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            let end = (filled + LOAD_CHUNK_SIZE).min(size);
            let n = reader.read_at(filled as u64, &mut data[filled..end]).await?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("archive source ended at {filled} of {size} bytes"),
                )));
            }
            filled += n;
        }

        debug!("Loaded archive: {} bytes", size);
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
