use std::ops::Range;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{Error, NameError, Result};

use super::archive::Archive;
use super::names::{EntryName, resolve_all_with_display};
use super::parser::SabsParser;
use super::structures::{ArchiveIndex, Record};
use super::tree::NameTree;

/// Outcome of a batch extraction.
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Files written, in extraction order
    pub written: Vec<PathBuf>,
    /// Existing files left alone because overwriting was disabled
    pub kept: Vec<PathBuf>,
    /// Entries skipped because their name could not be resolved
    pub skipped: Vec<(usize, Error)>,
}

/// Result of writing a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    Kept(PathBuf),
}

/// A loaded and indexed archive, ready for extraction.
///
/// Owns the archive buffer for as long as the session lasts; load a new
/// archive by building a new extractor.
pub struct SabsExtractor {
    archive: Archive,
    index: ArchiveIndex,
    names: Vec<std::result::Result<EntryName, NameError>>,
    display_names: Vec<EntryName>,
    overwrite: bool,
}

impl SabsExtractor {
    /// Index `archive`, reporting scan progress to `progress`.
    pub fn new(archive: Archive, progress: impl FnMut(f64)) -> Result<Self> {
        let index = SabsParser::new(archive.as_bytes()).index(progress)?;
        let (names, display_names) = resolve_all_with_display(&index.records);

        for name in names.iter().filter_map(|n| n.as_ref().err()) {
            warn!("{}", name);
        }

        Ok(Self {
            archive,
            index,
            names,
            display_names,
            overwrite: true,
        })
    }

    /// Whether existing files are replaced. Defaults to `true`.
    pub fn set_overwrite(&mut self, overwrite: bool) {
        self.overwrite = overwrite;
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn records(&self) -> &[Record] {
        &self.index.records
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Byte range of entry `index` within the archive.
    pub fn entry_range(&self, index: usize) -> Result<Range<usize>> {
        self.index
            .entry_range(index)
            .ok_or(Error::IndexOutOfRange {
                index,
                count: self.len(),
            })
    }

    /// Raw bytes of entry `index`, marker included.
    pub fn extract(&self, index: usize) -> Result<&[u8]> {
        let range = self.entry_range(index)?;
        Ok(&self.archive.as_bytes()[range])
    }

    /// Resolved name of entry `index`.
    pub fn entry_name(&self, index: usize) -> Result<&EntryName> {
        match self.names.get(index) {
            Some(Ok(name)) => Ok(name),
            Some(Err(e)) => Err(e.clone().into()),
            None => Err(Error::IndexOutOfRange {
                index,
                count: self.len(),
            }),
        }
    }

    /// Name shown for entry `index`, even when it cannot be extracted.
    pub fn display_name(&self, index: usize) -> Option<&EntryName> {
        self.display_names.get(index)
    }

    /// Tree of all entries by path segment.
    pub fn name_tree(&self) -> NameTree {
        NameTree::build(&self.display_names)
    }

    /// Write entry `index` below `root`, creating directories as needed.
    pub async fn write_entry(&self, index: usize, root: &Path) -> Result<WriteOutcome> {
        let output_path = root.join(self.entry_name(index)?.relative_path());
        let data = self.extract(index)?;

        if !self.overwrite && fs::try_exists(&output_path).await? {
            debug!("Keeping existing {}", output_path.display());
            return Ok(WriteOutcome::Kept(output_path));
        }

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(&output_path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        debug!("Wrote {} ({} bytes)", output_path.display(), data.len());
        Ok(WriteOutcome::Written(output_path))
    }

    /// Write every entry below `root`, in index order.
    pub async fn extract_all(&self, root: &Path) -> Result<ExtractReport> {
        let indices: Vec<usize> = (0..self.len()).collect();
        self.extract_selected(root, &indices).await
    }

    /// Write the given entries below `root`, in the order given.
    ///
    /// Entries whose name cannot be resolved are skipped and listed in the
    /// report. Any other failure stops the batch with [`Error::Entry`],
    /// which lists the files written before it; they stay on disk.
    pub async fn extract_selected(&self, root: &Path, indices: &[usize]) -> Result<ExtractReport> {
        let mut report = ExtractReport::default();

        for &index in indices {
            match self.write_entry(index, root).await {
                Ok(WriteOutcome::Written(path)) => report.written.push(path),
                Ok(WriteOutcome::Kept(path)) => report.kept.push(path),
                Err(e) if e.is_per_record() => {
                    warn!("Skipping entry {}: {}", index, e);
                    report.skipped.push((index, e));
                }
                Err(e) => {
                    let name = self
                        .display_name(index)
                        .map(EntryName::display_path)
                        .unwrap_or_else(|| format!("#{index}"));
                    return Err(Error::Entry {
                        index,
                        name,
                        written: report.written,
                        source: Box::new(e),
                    });
                }
            }
        }

        info!(
            "Extracted {} entries to {} ({} kept, {} skipped)",
            report.written.len(),
            root.display(),
            report.kept.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Write entry `index` to stdout.
    pub async fn extract_to_stdout(&self, index: usize) -> Result<()> {
        let data = self.extract(index)?;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(data).await?;
        stdout.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sabs::structures::PATH_BLOCK_SIZE;
    use pretty_assertions::assert_eq;

    fn path_block(text: &[u8]) -> Vec<u8> {
        let mut block = text.to_vec();
        block.resize(PATH_BLOCK_SIZE, 0);
        block
    }

    fn build(entries: &[(&[u8], &[u8])]) -> Vec<u8> {
        let mut data = b"HEAD".to_vec();
        for (payload, _) in entries {
            data.extend_from_slice(b"fLaC");
            data.extend_from_slice(payload);
        }
        for (_, path) in entries {
            data.extend(path_block(path));
        }
        data
    }

    fn extractor(entries: &[(&[u8], &[u8])]) -> SabsExtractor {
        SabsExtractor::new(Archive::from_bytes(build(entries)), |_| {}).unwrap()
    }

    #[test]
    fn extract_returns_marker_through_next_marker() {
        let ex = extractor(&[(b"AAAA", b"songs\\one"), (b"BB", b"")]);

        assert_eq!(ex.entry_range(0).unwrap(), 4..12);
        assert_eq!(ex.entry_range(1).unwrap(), 12..18);
        assert_eq!(ex.extract(0).unwrap(), b"fLaCAAAA");
        assert_eq!(ex.extract(1).unwrap(), b"fLaCBB");
    }

    #[test]
    fn out_of_range_index() {
        let ex = extractor(&[(b"AAAA", b"x")]);
        assert!(matches!(
            ex.extract(1),
            Err(Error::IndexOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn failed_name_is_reported_per_entry() {
        let ex = extractor(&[(b"AAAA", &[0xff]), (b"BBBB", b"ok")]);

        assert!(matches!(ex.entry_name(0), Err(Error::Name(NameError::Decode { index: 0, .. }))));
        assert_eq!(ex.entry_name(1).unwrap().display_path(), "ok");
        assert_eq!(ex.name_tree().leaf_count(), 2);
    }

    #[tokio::test]
    async fn write_entry_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(&[(b"AAAA", b"music\\zone\\theme")]);

        let outcome = ex.write_entry(0, dir.path()).await.unwrap();
        let expected = dir.path().join("music/zone/theme.flac");

        assert_eq!(outcome, WriteOutcome::Written(expected.clone()));
        assert_eq!(std::fs::read(expected).unwrap(), b"fLaCAAAA");
    }

    #[tokio::test]
    async fn write_entry_overwrites_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("one.flac");
        std::fs::write(&target, b"stale").unwrap();

        let ex = extractor(&[(b"AAAA", b"one")]);
        ex.write_entry(0, dir.path()).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"fLaCAAAA");
    }

    #[tokio::test]
    async fn keeps_existing_file_when_overwrite_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("one.flac");
        std::fs::write(&target, b"stale").unwrap();

        let mut ex = extractor(&[(b"AAAA", b"one")]);
        ex.set_overwrite(false);
        let outcome = ex.write_entry(0, dir.path()).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Kept(target.clone()));
        assert_eq!(std::fs::read(&target).unwrap(), b"stale");
    }

    #[tokio::test]
    async fn extract_all_names_unnamed_entries_uniquely() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(&[(b"AA", b""), (b"BB", b"x"), (b"CC", b"")]);

        let report = ex.extract_all(dir.path()).await.unwrap();

        assert_eq!(report.written.len(), 3);
        assert_eq!(
            std::fs::read(dir.path().join("not-named/file 0001.flac")).unwrap(),
            b"fLaCAA"
        );
        assert_eq!(
            std::fs::read(dir.path().join("not-named/file 0002.flac")).unwrap(),
            b"fLaCCC"
        );
    }

    #[tokio::test]
    async fn extract_selected_follows_given_order_and_skips_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(&[(b"AA", b"a"), (b"BB", b"..\\b"), (b"CC", b"c")]);

        let report = ex.extract_selected(dir.path(), &[2, 1, 0]).await.unwrap();

        assert_eq!(
            report.written,
            vec![dir.path().join("c.flac"), dir.path().join("a.flac")]
        );
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, 1);
    }

    #[tokio::test]
    async fn batch_stops_at_failing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(&[(b"AA", b"a"), (b"BB", b"b")]);

        let err = ex.extract_selected(dir.path(), &[0, 7, 1]).await.unwrap_err();

        match err {
            Error::Entry {
                index,
                written,
                source,
                ..
            } => {
                assert_eq!(index, 7);
                assert_eq!(written, vec![dir.path().join("a.flac")]);
                assert!(matches!(*source, Error::IndexOutOfRange { index: 7, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(dir.path().join("a.flac").exists());
        assert!(!dir.path().join("b.flac").exists());
    }

    #[tokio::test]
    async fn nul_in_path_skips_only_that_entry() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(&[
            (b"AA", b"\0\0songs\\one"),
            (b"BB", b"two\0stale"),
            (b"CC", b"ok"),
        ]);

        let report = ex.extract_all(dir.path()).await.unwrap();

        assert_eq!(
            report.written,
            vec![dir.path().join("songs/one.flac"), dir.path().join("ok.flac")]
        );
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, 1);
        assert_eq!(std::fs::read(dir.path().join("ok.flac")).unwrap(), b"fLaCCC");
    }

    #[tokio::test]
    async fn file_and_directory_names_do_not_clash_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let ex = extractor(&[(b"AA", b"a"), (b"BB", b"a.flac\\x"), (b"CC", b"ok")]);

        let report = ex.extract_all(dir.path()).await.unwrap();

        assert_eq!(report.written.len(), 3);
        assert!(report.skipped.is_empty());
        assert_eq!(std::fs::read(dir.path().join("a.flac")).unwrap(), b"fLaCAA");
        assert_eq!(
            std::fs::read(dir.path().join("a.flac (2)/x.flac")).unwrap(),
            b"fLaCBB"
        );
        assert_eq!(std::fs::read(dir.path().join("ok.flac")).unwrap(), b"fLaCCC");
    }
}
