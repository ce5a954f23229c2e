//! Marker scan over the loaded archive.

use tracing::debug;

use super::structures::{MARKER, SCAN_COMPLETE};

/// Find every non-overlapping occurrence of [`MARKER`], left to right.
///
/// `progress` receives the position of each match as a percentage of the
/// buffer, then [`SCAN_COMPLETE`] exactly once when the scan is done (also
/// when nothing was found).
pub fn find_markers(data: &[u8], mut progress: impl FnMut(f64)) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut pos = 0;

    while let Some(found) = find_from(data, pos) {
        offsets.push(found);
        progress(found as f64 / data.len() as f64 * 100.0);
        pos = found + MARKER.len();
    }

    progress(SCAN_COMPLETE);
    debug!("Found {} markers in {} bytes", offsets.len(), data.len());
    offsets
}

fn find_from(data: &[u8], start: usize) -> Option<usize> {
    data.get(start..)?
        .windows(MARKER.len())
        .position(|window| window == MARKER)
        .map(|p| start + p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_markers_in_order() {
        let data = b"JUNKfLaCAAAAfLaCBBBB";
        let offsets = find_markers(data, |_| {});
        assert_eq!(offsets, vec![4, 12]);
    }

    #[test]
    fn marker_at_very_start_and_end() {
        let data = b"fLaCxxfLaC";
        assert_eq!(find_markers(data, |_| {}), vec![0, 6]);
    }

    #[test]
    fn partial_marker_is_ignored() {
        assert!(find_markers(b"xxfLa", |_| {}).is_empty());
        assert!(find_markers(b"", |_| {}).is_empty());
    }

    #[test]
    fn progress_reports_each_match_then_completion() {
        let data = b"fLaC____fLaC____fLaC____";
        let mut seen = Vec::new();
        find_markers(data, |p| seen.push(p));

        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], 0.0);
        assert!((seen[1] - 8.0 / 24.0 * 100.0).abs() < 1e-9);
        assert!(seen[..3].iter().all(|p| (0.0..=100.0).contains(p)));
        assert_eq!(seen[3], SCAN_COMPLETE);
    }

    #[test]
    fn completion_is_reported_without_matches() {
        let mut seen = Vec::new();
        find_markers(b"no markers here", |p| seen.push(p));
        assert_eq!(seen, vec![SCAN_COMPLETE]);
    }
}
