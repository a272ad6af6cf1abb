//! Directory chain walking
//!
//! [`read_directory`] never fails on a damaged chain: it stops at the first
//! bad link and reports a [`ChainWarning`] with the entries decoded so far.
//! [`walk_chain`] is the strict variant used before any mutation.

use super::{ChainWarning, DirectoryEntry, DirectoryListing, SegmentSummary, VolumeGeometry};
use crate::layout::{HEADER_WORDS, MAX_SEGMENTS, SEGMENT_WORDS, SegmentEnd};
use crate::raw_io::BlockStore;
use rt11_common::{Error, Result};
use tracing::{debug, warn};

/// Walk the chain from segment 1 and decode every entry
///
/// Only I/O failures are errors. Link problems end the walk and are
/// recorded in [`DirectoryListing::warnings`].
pub fn read_directory<S: BlockStore + ?Sized>(
    store: &S,
    geometry: &VolumeGeometry,
) -> Result<DirectoryListing> {
    let first = geometry.read_segment(store, 1)?;
    let header = first.header();
    let total_segments = header.effective_total_segments();
    if total_segments != header.total_segments {
        warn!(
            "segment 1 declares {} segments, treating directory as a single segment",
            header.total_segments
        );
    }

    let mut listing = DirectoryListing {
        total_segments,
        highest_in_use: header.highest_in_use,
        extra_bytes: header.extra_bytes,
        data_start_block: header.data_start_block,
        ..DirectoryListing::default()
    };

    let data_start = u32::from(header.data_start_block);
    let mut visited = vec![false; usize::from(total_segments) + 1];
    let mut offset: u32 = 0;
    let mut previous = 0u16;
    let mut current = 1u16;
    let mut pending = Some(first);

    while current != 0 {
        let warning = if current > total_segments {
            Some(ChainWarning::SegmentOutOfRange {
                from: previous,
                segment: current,
                total_segments,
            })
        } else if visited[usize::from(current)] {
            Some(ChainWarning::LoopDetected { segment: current })
        } else if !geometry.segment_in_bounds(current) {
            Some(ChainWarning::BeyondVolume {
                segment: current,
                block: geometry.segment_block(current),
                total_blocks: geometry.total_blocks,
            })
        } else {
            None
        };
        if let Some(warning) = warning {
            warn!("directory walk stopped: {}", warning);
            listing.warnings.push(warning);
            break;
        }
        visited[usize::from(current)] = true;

        let segment = match pending.take() {
            Some(segment) => segment,
            None => geometry.read_segment(store, current)?,
        };
        let scan = segment.scan();
        if let SegmentEnd::UnknownStatus(status) = scan.end {
            warn!(
                "segment {} word {}: unrecognised status {:#06x}, rest of segment skipped",
                current, scan.end_index, status
            );
        }

        let entry_words = segment.entry_words();
        let slots = (SEGMENT_WORDS - HEADER_WORDS) / entry_words;
        let next_segment = segment.header().next_segment;
        debug!(
            "segment {}: {} entries, next {}",
            current,
            scan.entries.len(),
            next_segment
        );

        listing.segments.push(SegmentSummary {
            number: current,
            block: geometry.segment_block(current),
            next_segment,
            entries: scan.entries.len(),
            free_slots: slots.saturating_sub(scan.entries.len() + 1),
        });

        for (word_index, entry) in scan.entries {
            let start_block = data_start.saturating_add(offset);
            offset = offset.saturating_add(u32::from(entry.length));
            listing.entries.push(DirectoryEntry {
                segment: current,
                word_index,
                start_block,
                entry,
            });
        }

        previous = current;
        current = next_segment;
    }

    Ok(listing)
}

/// Segment numbers linked from segment 1, in chain order
///
/// Unlike [`read_directory`] this rejects any damage: a bad segment count,
/// an out-of-range link, a loop or a segment past the end of the image.
pub fn walk_chain<S: BlockStore + ?Sized>(
    store: &S,
    geometry: &VolumeGeometry,
) -> Result<Vec<u16>> {
    let first = geometry.read_segment(store, 1)?;
    let total_segments = first.header().total_segments;
    if total_segments == 0 || total_segments > MAX_SEGMENTS {
        return Err(Error::InvalidSegmentCount {
            count: total_segments,
        });
    }

    let mut visited = vec![false; usize::from(total_segments) + 1];
    let mut chain = Vec::new();
    let mut previous = 0u16;
    let mut current = 1u16;
    let mut pending = Some(first);

    while current != 0 {
        if current > total_segments {
            return Err(Error::InvalidSegmentLink {
                from: previous,
                to: current,
                total_segments,
            });
        }
        if visited[usize::from(current)] {
            return Err(Error::DirectoryLoopDetected { segment: current });
        }
        visited[usize::from(current)] = true;
        chain.push(current);

        let segment = match pending.take() {
            Some(segment) => segment,
            None => geometry.read_segment(store, current)?,
        };
        previous = current;
        current = segment.header().next_segment;
    }

    Ok(chain)
}
