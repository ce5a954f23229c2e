//! # sabs-unpack
//!
//! Index and extract the FLAC streams packed into `.sabs` sound archives.
//!
//! The archive is loaded whole, scanned for stream markers, and matched
//! against the path table at its end. Each entry can then be read back as
//! raw bytes or written to disk under its stored path.
//!
//! ## Features
//!
//! - Load archives from the local filesystem or an HTTP/HTTPS URL
//! - Progress reporting while the archive is scanned
//! - Stable, collision-free names for unnamed and duplicate entries
//! - Name tree for browsing, bulk and selective extraction
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use sabs_unpack::{Archive, SabsExtractor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let archive = Archive::open(Path::new("zm_asylum.all.sabs")).await?;
//!     let extractor = SabsExtractor::new(archive, |_| {})?;
//!
//!     print!("{}", extractor.name_tree().render());
//!     extractor.extract_all(Path::new("unarchived")).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod sabs;

pub use cli::Cli;
pub use error::{Error, NameError, Result};
pub use io::{HttpReader, LocalFileReader, ReadAt};
pub use sabs::{Archive, ArchiveIndex, EntryName, NameTree, Record, SabsExtractor};
