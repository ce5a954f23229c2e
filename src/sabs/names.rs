//! Entry naming.
//!
//! Every entry gets one resolved name that is used both for the name tree
//! and for the file written to disk. Entries without a stored path are
//! numbered `not-named/file 0001`, `not-named/file 0002`, ... in index
//! order. A name whose output file is already taken, or that would need a
//! directory where a file was already written, gets ` (2)`, ` (3)`, ...
//! appended to the clashing segment.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::error::NameError;

use super::structures::{ENTRY_EXTENSION, PathBlock, Record, UNNAMED_DIR};

/// The slot contents with NUL padding removed from both ends.
fn trim_nul(block: &PathBlock) -> &[u8] {
    let start = block.iter().position(|&b| b != 0).unwrap_or(block.len());
    let end = block.iter().rposition(|&b| b != 0).map_or(start, |p| p + 1);
    &block[start..end]
}

/// Decode a path slot: drop surrounding NULs and decode as UTF-8.
pub fn decode_path_text(block: &PathBlock) -> Result<&str, std::str::Utf8Error> {
    std::str::from_utf8(trim_nul(block))
}

/// Split a stored path into its non-empty segments.
fn split_segments(text: &str) -> Vec<&str> {
    text.split(['\\', '/']).filter(|s| !s.is_empty()).collect()
}

/// A segment that joins below the output root as exactly one file name.
fn is_plain_segment(segment: &str) -> bool {
    !segment.contains('\0')
        && matches!(
            Path::new(segment).components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        )
}

fn file_name(segment: &str) -> String {
    format!("{segment}.{ENTRY_EXTENSION}")
}

/// The resolved, collision-free name of one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryName {
    segments: Vec<String>,
    unnamed: bool,
}

impl EntryName {
    /// Path segments, without extension.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the entry had no stored path.
    pub fn is_unnamed(&self) -> bool {
        self.unnamed
    }

    /// Relative output path, e.g. `songs/one.flac`.
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.segments.iter().collect();
        path.set_file_name(file_name(self.segments.last().map_or("", String::as_str)));
        path
    }

    /// The name with `/` separators and no extension, for display.
    pub fn display_path(&self) -> String {
        self.segments.join("/")
    }
}

/// Assigns names to records in index order.
///
/// The resolver is stateful: the unnamed counter and the output paths
/// already handed out carry over from one record to the next, so records
/// must be fed in index order.
#[derive(Debug, Default)]
pub struct NameResolver {
    unnamed: usize,
    /// Output files, as segments with the extension on the last one
    files: HashSet<Vec<String>>,
    /// Every directory some output file lives in
    dirs: HashSet<Vec<String>>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the name of the next record.
    ///
    /// # Errors
    ///
    /// [`NameError::Decode`] when the slot is not UTF-8,
    /// [`NameError::UnsafePath`] when a segment is `.`, `..`, a drive or
    /// root prefix, or contains a NUL. Neither consumes a name.
    pub fn resolve(&mut self, record: &Record) -> Result<EntryName, NameError> {
        let text = decode_path_text(&record.path_block).map_err(|source| NameError::Decode {
            index: record.index,
            source,
        })?;

        let segments = split_segments(text);
        if !segments.iter().all(|s| is_plain_segment(s)) {
            return Err(NameError::UnsafePath {
                index: record.index,
                path: text.to_string(),
            });
        }

        Ok(self.claim_or_number(segments.into_iter().map(str::to_string).collect()))
    }

    /// Name for a record whose path could not be resolved, so that it can
    /// still be shown. Never fails.
    pub fn resolve_lossy(&mut self, record: &Record) -> EntryName {
        let text = String::from_utf8_lossy(trim_nul(&record.path_block));
        let segments = split_segments(&text)
            .into_iter()
            .map(str::to_string)
            .collect();
        self.claim_or_number(segments)
    }

    fn claim_or_number(&mut self, segments: Vec<String>) -> EntryName {
        if segments.is_empty() {
            self.unnamed += 1;
            let segments = vec![UNNAMED_DIR.to_string(), format!("file {:04}", self.unnamed)];
            self.claim(segments, true)
        } else {
            self.claim(segments, false)
        }
    }

    fn claim(&mut self, mut segments: Vec<String>, unnamed: bool) -> EntryName {
        let Some(last) = segments.len().checked_sub(1) else {
            return EntryName { segments, unnamed };
        };

        // A directory cannot take the place of a file written earlier.
        for depth in 0..last {
            let base = segments[depth].clone();
            let mut n = 1;
            while self.files.contains(&segments[..=depth]) {
                n += 1;
                segments[depth] = format!("{base} ({n})");
            }
        }

        let base = segments[last].clone();
        let mut n = 1;
        loop {
            let mut file = segments.clone();
            file[last] = file_name(&segments[last]);
            if !self.files.contains(&file) && !self.dirs.contains(&file) {
                self.files.insert(file);
                break;
            }
            n += 1;
            segments[last] = format!("{base} ({n})");
        }

        for depth in 0..last {
            self.dirs.insert(segments[..=depth].to_vec());
        }
        EntryName { segments, unnamed }
    }
}

/// Resolve names for all records, in index order.
pub fn resolve_all(records: &[Record]) -> Vec<Result<EntryName, NameError>> {
    resolve_all_with_display(records).0
}

/// Like [`resolve_all`], but also returns a display name for every record.
///
/// Display names equal the resolved names where resolution succeeded;
/// failed records get a lossy name claimed after all others, so they
/// never displace a resolvable entry.
pub fn resolve_all_with_display(
    records: &[Record],
) -> (Vec<Result<EntryName, NameError>>, Vec<EntryName>) {
    let mut resolver = NameResolver::new();
    let resolved: Vec<_> = records.iter().map(|r| resolver.resolve(r)).collect();

    let mut lossy: Vec<_> = records
        .iter()
        .zip(&resolved)
        .map(|(record, name)| name.is_err().then(|| resolver.resolve_lossy(record)))
        .collect();

    let display = resolved
        .iter()
        .zip(lossy.iter_mut())
        .map(|(name, fallback)| match name {
            Ok(name) => name.clone(),
            Err(_) => fallback.take().unwrap_or_default(),
        })
        .collect();

    (resolved, display)
}
