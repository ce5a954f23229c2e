//! Sabs sound archive indexing and extraction.
//!
//! A `.sabs` archive is a plain concatenation of FLAC streams followed by a
//! table of 128-byte path slots, one per stream. There is no header and no
//! length or offset field anywhere, so the layout is inferred:
//!
//! - [`scanner`]: finds every `fLaC` marker, left to right
//! - [`parser`]: slices the path table and pairs each slot with a marker
//! - [`names`]: turns path slots into unique relative file names
//! - [`tree`]: groups entries by path segment for display
//! - [`extractor`]: returns or writes the bytes of each entry
//!
//! An entry spans from its marker to the next marker, or to the start of the
//! path table for the last entry. Padding between a stream's real end and
//! the next marker is therefore part of the extracted bytes.
//!
//! ## Limitations
//!
//! - Only FLAC entries are recognised; any other file type packed in the
//!   archive is absorbed into the preceding entry or breaks the path table
//! - Extracted streams are not validated

mod archive;
mod extractor;
pub mod names;
mod parser;
mod scanner;
mod structures;
pub mod tree;

pub use archive::Archive;
pub use extractor::{ExtractReport, SabsExtractor, WriteOutcome};
pub use names::{EntryName, NameResolver, decode_path_text};
pub use parser::{SabsParser, assemble};
pub use scanner::find_markers;
pub use structures::*;
pub use tree::{NameTree, Node};
