//! Directory segment splitting
//!
//! When an allocation cannot be recorded in its segment, the segment is cut
//! in two: a suffix of its entries moves to an unused segment number which
//! is spliced into the chain right after it. No entry is created or lost.

use super::VolumeGeometry;
use super::reader::walk_chain;
use super::writer::commit_split;
use crate::layout::{DirEntry, MAX_SEGMENTS, SegmentBuf, SegmentHeader, status};
use crate::raw_io::BlockStore;
use rt11_common::{Error, Result};
use serde::Serialize;
use tracing::info;

/// What a split changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SplitOutcome {
    /// Segment that was split
    pub segment: u16,
    /// Segment number that received the moved entries
    pub new_segment: u16,
    /// Word index in the old segment that now holds the sentinel
    pub split_index: usize,
    /// Entries moved to the new segment
    pub moved: usize,
    /// Entries left in the old segment
    pub kept: usize,
    /// `highest_in_use` in segment 1 after the split
    pub highest_in_use: u16,
}

/// Pick the first entry that moves to the new segment
///
/// Prefers the middle file entry (permanent or tentative), falling back to
/// the middle of all entries. Both halves keep at least one entry.
pub fn choose_split_point(segment: u16, entries: &[(usize, DirEntry)]) -> Result<usize> {
    let n = entries.len();
    if n == 0 {
        return Err(Error::EmptySegment { segment });
    }
    if n < 2 {
        return Err(Error::UnsplittableSegment {
            segment,
            entries: n,
        });
    }

    let files: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, (_, e))| e.kind.is_file())
        .map(|(i, _)| i)
        .collect();

    let mut point = if files.is_empty() {
        n / 2
    } else {
        files[files.len() / 2]
    };
    if point >= n - 1 {
        point = n - 2;
    }
    Ok(point.max(1))
}

/// Split `segment` into itself and a new segment spliced in after it
///
/// The chain must be intact and contain `segment`. The caller re-reads the
/// directory afterwards; the split itself allocates nothing.
pub fn split_segment<S: BlockStore + ?Sized>(
    store: &mut S,
    geometry: &VolumeGeometry,
    segment: u16,
) -> Result<SplitOutcome> {
    let head = geometry.read_segment(store, 1)?;
    let head_header = head.header();
    if head_header.total_segments == 0 || head_header.total_segments > MAX_SEGMENTS {
        return Err(Error::InvalidSegmentCount {
            count: head_header.total_segments,
        });
    }

    let chain = walk_chain(store, geometry)?;
    if !chain.contains(&segment) {
        return Err(Error::SegmentNotInChain { segment });
    }
    let new_number = (1..=head_header.total_segments)
        .find(|n| !chain.contains(n))
        .ok_or(Error::DirectoryFull {
            total_segments: head_header.total_segments,
        })?;
    if !geometry.segment_in_bounds(new_number) {
        return Err(Error::SegmentOutOfBounds {
            segment: new_number,
            block: geometry.segment_block(new_number),
            total_blocks: geometry.total_blocks,
        });
    }

    let mut old = if segment == 1 {
        head.clone()
    } else {
        geometry.read_segment(store, segment)?
    };
    let old_header = old.header();
    let scan = old.scan();
    let point = choose_split_point(segment, &scan.entries)?;
    let split_index = scan.entries[point].0;

    let mut new = SegmentBuf::zeroed(new_number);
    new.set_header(&SegmentHeader {
        next_segment: old_header.next_segment,
        ..old_header
    });
    let entry_words = new.entry_words();
    let mut dst = new.slot_index(0);
    for (src, _) in &scan.entries[point..] {
        new.put_raw_slot(dst, old.raw_slot(*src)?)?;
        dst += entry_words;
    }
    new.put_sentinel(dst)?;

    old.set_status(split_index, status::END_OF_SEGMENT)?;
    old.set_next_segment(new_number);

    let highest_in_use = head_header.highest_in_use.max(new_number);
    let head = if segment == 1 {
        old.set_highest_in_use(highest_in_use);
        None
    } else if highest_in_use != head_header.highest_in_use {
        let mut head = head;
        head.set_highest_in_use(highest_in_use);
        Some(head)
    } else {
        None
    };

    commit_split(store, geometry, &old, &new, head.as_ref())?;

    let outcome = SplitOutcome {
        segment,
        new_segment: new_number,
        split_index,
        moved: scan.entries.len() - point,
        kept: point,
        highest_in_use,
    };
    info!(
        "split segment {} at word {}: {} entries moved to segment {}",
        segment, split_index, outcome.moved, new_number
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::super::reader::read_directory;
    use super::super::testutil::*;
    use super::*;
    use crate::layout::SegmentEnd;
    use rt11_common::FileName;

    fn files(count: usize) -> Vec<DirEntry> {
        (1..=count)
            .map(|i| DirEntry::permanent(FileName::parse(&format!("E{i}.DAT")).unwrap(), 1, 0))
            .collect()
    }

    fn names(entries: &[(usize, DirEntry)]) -> Vec<String> {
        entries.iter().map(|(_, e)| e.name.to_string()).collect()
    }

    #[test]
    fn test_split_ten_entries() {
        let mut image = image_with(100, &[(header(4, 0, 14), 1, files(10))]);
        let geometry = VolumeGeometry::probe(&image).unwrap();
        let before = read_directory(&image, &geometry).unwrap();

        let outcome = split_segment(&mut image, &geometry, 1).unwrap();
        assert_eq!(outcome.new_segment, 2);
        assert_eq!(outcome.kept, 5);
        assert_eq!(outcome.moved, 5);
        assert_eq!(outcome.split_index, 5 + 5 * 7);
        assert_eq!(outcome.highest_in_use, 2);

        let old = geometry.read_segment(&image, 1).unwrap();
        let old_scan = old.scan();
        assert_eq!(old_scan.end, SegmentEnd::Sentinel);
        assert_eq!(old_scan.end_index, outcome.split_index);
        assert_eq!(names(&old_scan.entries), ["E1.DAT", "E2.DAT", "E3.DAT", "E4.DAT", "E5.DAT"]);
        assert_eq!(old.header().next_segment, 2);
        assert_eq!(old.header().highest_in_use, 2);

        let new = geometry.read_segment(&image, 2).unwrap();
        let new_scan = new.scan();
        assert_eq!(new_scan.end, SegmentEnd::Sentinel);
        assert_eq!(names(&new_scan.entries), ["E6.DAT", "E7.DAT", "E8.DAT", "E9.DAT", "E10.DAT"]);
        assert_eq!(new.header().next_segment, 0);
        assert_eq!(new.header().data_start_block, 14);

        let after = read_directory(&image, &geometry).unwrap();
        let strip = |l: &super::super::DirectoryListing| {
            l.entries
                .iter()
                .map(|e| (e.entry.clone(), e.start_block))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(&before), strip(&after));
        assert_eq!(after.chain(), vec![1, 2]);
    }

    #[test]
    fn test_split_splices_into_middle_of_chain() {
        let mut image = image_with(
            100,
            &[
                (header(4, 3, 14), 1, files(2)),
                (header(4, 0, 14), 3, files(4)),
            ],
        );
        let geometry = VolumeGeometry::probe(&image).unwrap();

        let outcome = split_segment(&mut image, &geometry, 1).unwrap();
        assert_eq!(outcome.new_segment, 2);

        let listing = read_directory(&image, &geometry).unwrap();
        assert_eq!(listing.chain(), vec![1, 2, 3]);
        assert_eq!(listing.highest_in_use, 2);
        assert_eq!(listing.entries.len(), 6);
    }

    #[test]
    fn test_split_non_head_updates_segment_one() {
        let mut image = image_with(
            100,
            &[
                (header(4, 2, 14), 1, files(2)),
                (header(4, 0, 14), 2, files(6)),
            ],
        );
        let geometry = VolumeGeometry::probe(&image).unwrap();

        let outcome = split_segment(&mut image, &geometry, 2).unwrap();
        assert_eq!(outcome.new_segment, 3);
        assert_eq!(outcome.highest_in_use, 3);

        let head = geometry.read_segment(&image, 1).unwrap();
        assert_eq!(head.header().highest_in_use, 3);
        let listing = read_directory(&image, &geometry).unwrap();
        assert_eq!(listing.chain(), vec![1, 2, 3]);
        assert_eq!(listing.entries.len(), 8);
    }

    #[test]
    fn test_split_directory_full() {
        let mut image = image_with(
            100,
            &[
                (header(2, 2, 14), 1, files(3)),
                (header(2, 0, 14), 2, files(3)),
            ],
        );
        let geometry = VolumeGeometry::probe(&image).unwrap();
        let err = split_segment(&mut image, &geometry, 1).unwrap_err();
        assert!(matches!(err, Error::DirectoryFull { total_segments: 2 }));
        assert!(err.is_space_exhausted());
    }

    #[test]
    fn test_split_preconditions() {
        let mut image = image_with(100, &[(header(4, 0, 14), 1, vec![])]);
        let geometry = VolumeGeometry::probe(&image).unwrap();
        assert!(matches!(
            split_segment(&mut image, &geometry, 1),
            Err(Error::EmptySegment { segment: 1 })
        ));
        assert!(matches!(
            split_segment(&mut image, &geometry, 3),
            Err(Error::SegmentNotInChain { segment: 3 })
        ));

        let mut image = image_with(100, &[(header(4, 1, 14), 1, files(4))]);
        assert!(matches!(
            split_segment(&mut image, &geometry, 1),
            Err(Error::DirectoryLoopDetected { segment: 1 })
        ));

        let mut image = image_with(100, &[(header(32, 0, 14), 1, files(4))]);
        assert!(matches!(
            split_segment(&mut image, &geometry, 1),
            Err(Error::InvalidSegmentCount { count: 32 })
        ));
    }

    #[test]
    fn test_choose_split_point() {
        let empty = DirEntry::empty(1);
        let file = DirEntry::permanent(FileName::parse("F").unwrap(), 1, 0);
        let at = |kinds: &[&DirEntry]| -> Vec<(usize, DirEntry)> {
            kinds
                .iter()
                .enumerate()
                .map(|(i, e)| (5 + i * 7, (*e).clone()))
                .collect()
        };

        // middle of the file entries, not of all entries
        let entries = at(&[&empty, &file, &file, &file, &empty, &empty, &empty]);
        assert_eq!(choose_split_point(1, &entries).unwrap(), 2);

        // no files: raw midpoint
        let entries = at(&[&empty, &empty, &empty, &empty]);
        assert_eq!(choose_split_point(1, &entries).unwrap(), 2);

        // a split on the last entry moves left
        let entries = at(&[&empty, &empty, &file]);
        assert_eq!(choose_split_point(1, &entries).unwrap(), 1);

        // never leaves the old segment empty
        let entries = at(&[&file, &empty]);
        assert_eq!(choose_split_point(1, &entries).unwrap(), 1);
        let entries = at(&[&file, &empty, &empty]);
        assert_eq!(choose_split_point(1, &entries).unwrap(), 1);

        assert!(matches!(
            choose_split_point(4, &at(&[&file])),
            Err(Error::UnsplittableSegment { segment: 4, entries: 1 })
        ));
        assert!(matches!(
            choose_split_point(4, &[]),
            Err(Error::EmptySegment { segment: 4 })
        ));
    }
}
