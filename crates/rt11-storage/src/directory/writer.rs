//! Directory updates and commits
//!
//! Every mutation is prepared in memory on a [`SegmentBuf`] and then written
//! back whole. A split touches up to three segments, which are committed in
//! an order that never leaves a link pointing at an unwritten segment.

use super::VolumeGeometry;
use super::allocator::Allocation;
use crate::layout::{DirEntry, EntryKind, SEGMENT_WORDS, SegmentBuf};
use crate::raw_io::BlockStore;
use rt11_common::{Error, Result};
use tracing::debug;

/// Result of trying to record an allocation in its segment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The segment now holds the new entry
    Recorded,
    /// The remainder entry and sentinel do not fit; the segment is untouched
    NeedsSplit,
}

/// Turn the allocation's empty entry into `file` and insert the remainder
///
/// Entries after the allocated slot move one entry width toward the end of
/// the segment so the remainder can sit right behind the new file. The
/// sentinel is rewritten after the last shifted entry.
pub fn record_allocation(
    segment: &mut SegmentBuf,
    allocation: &Allocation,
    file: &DirEntry,
) -> Result<RecordOutcome> {
    let stale = || Error::StaleEntry {
        segment: segment.number(),
        word_index: allocation.word_index,
    };

    if segment.number() != allocation.segment {
        return Err(Error::internal(format!(
            "allocation for segment {} applied to segment {}",
            allocation.segment,
            segment.number()
        )));
    }
    if u32::from(file.length) != allocation.extent.length {
        return Err(Error::internal(format!(
            "entry length {} does not match allocated {} blocks",
            file.length, allocation.extent.length
        )));
    }

    let scan = segment.scan();
    let target = scan
        .entries
        .iter()
        .find(|(idx, _)| *idx == allocation.word_index)
        .map(|(_, entry)| entry)
        .ok_or_else(stale)?;
    if target.kind != EntryKind::Empty || u32::from(target.length) != allocation.found_length() {
        return Err(stale());
    }

    if allocation.remainder == 0 {
        segment.put_entry(allocation.word_index, file)?;
        return Ok(RecordOutcome::Recorded);
    }

    let entry_words = segment.entry_words();
    let end = scan.end_index;
    // shifted entries plus a full sentinel slot
    if end + 2 * entry_words > SEGMENT_WORDS {
        debug!(
            "segment {}: no room for remainder entry (end at word {})",
            segment.number(),
            end
        );
        return Ok(RecordOutcome::NeedsSplit);
    }

    let insert = allocation.word_index + entry_words;
    segment.shift_entries_up(insert, end)?;
    segment.put_entry(allocation.word_index, file)?;
    segment.put_entry(insert, &DirEntry::empty(allocation.remainder))?;
    segment.put_sentinel(end + entry_words)?;

    Ok(RecordOutcome::Recorded)
}

/// Write one segment back to its block pair
pub fn commit_segment<S: BlockStore + ?Sized>(
    store: &mut S,
    geometry: &VolumeGeometry,
    segment: &SegmentBuf,
) -> Result<()> {
    geometry.write_segment(store, segment)?;
    debug!(
        "committed segment {} at block {}",
        segment.number(),
        geometry.segment_block(segment.number())
    );
    Ok(())
}

/// Commit the segments touched by a split
///
/// The new segment goes first since nothing links to it yet. Segment 1's
/// raised `highest_in_use` follows, then the split segment with its link to
/// the new one. This departs from the classic RT-11 order, which writes the
/// split segment first: an interruption there leaves a link to a segment
/// that was never written. Stops at the first failed write.
pub fn commit_split<S: BlockStore + ?Sized>(
    store: &mut S,
    geometry: &VolumeGeometry,
    split: &SegmentBuf,
    new_segment: &SegmentBuf,
    head: Option<&SegmentBuf>,
) -> Result<()> {
    commit_segment(store, geometry, new_segment)?;
    if let Some(head) = head {
        commit_segment(store, geometry, head)?;
    }
    commit_segment(store, geometry, split)?;
    store.sync()
}
