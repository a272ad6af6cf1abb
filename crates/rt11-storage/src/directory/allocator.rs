//! Free space allocation
//!
//! Space is described entirely by `Empty` entries in chain order. Allocation
//! is first-fit: the first empty region large enough wins, and any leftover
//! becomes a new, smaller empty region right after the allocated file.

use super::DirectoryEntry;
use crate::layout::EntryKind;
use rt11_common::{Error, Result};
use serde::Serialize;

/// A contiguous range of data blocks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Extent {
    /// First data block
    pub start: u32,
    /// Length in blocks
    pub length: u32,
}

impl Extent {
    #[must_use]
    pub const fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    /// First block past the extent
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.start.saturating_add(self.length)
    }

    /// Check the extent is a usable data range on a volume
    ///
    /// Block 0 is the boot block and can never hold file data.
    pub fn validate(&self, total_blocks: u32) -> Result<()> {
        if self.start == 0 || self.length == 0 || self.end() > total_blocks {
            return Err(Error::InvalidExtent {
                start: self.start,
                length: self.length,
                total_blocks,
            });
        }
        Ok(())
    }
}

impl From<&DirectoryEntry> for Extent {
    fn from(entry: &DirectoryEntry) -> Self {
        Self::new(entry.start_block, u32::from(entry.length()))
    }
}

/// Outcome of a first-fit search
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Allocation {
    /// Segment holding the chosen empty entry
    pub segment: u16,
    /// Word index of the chosen empty entry
    pub word_index: usize,
    /// Blocks handed to the new file
    pub extent: Extent,
    /// Blocks left in a new empty entry (0 = exact fit, no new entry)
    pub remainder: u16,
}

impl Allocation {
    /// Length of the empty entry this allocation was carved from
    #[must_use]
    pub fn found_length(&self) -> u32 {
        self.extent.length + u32::from(self.remainder)
    }
}

/// Find the first empty entry, in chain order, that holds `requested` blocks
pub fn first_fit(entries: &[DirectoryEntry], requested: u16) -> Result<Allocation> {
    if requested == 0 {
        return Err(Error::invalid_argument("cannot allocate zero blocks"));
    }

    entries
        .iter()
        .find(|e| e.kind() == EntryKind::Empty && e.length() >= requested)
        .map(|e| Allocation {
            segment: e.segment,
            word_index: e.word_index,
            extent: Extent::new(e.start_block, u32::from(requested)),
            remainder: e.length() - requested,
        })
        .ok_or_else(|| Error::NoSpace {
            requested: u32::from(requested),
            largest_free: largest_free(entries),
        })
}

fn largest_free(entries: &[DirectoryEntry]) -> u32 {
    entries
        .iter()
        .filter(|e| e.kind() == EntryKind::Empty)
        .map(|e| u32::from(e.length()))
        .max()
        .unwrap_or(0)
}

/// Block accounting over a listing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SpaceSummary {
    /// Permanent files
    pub files: usize,
    /// Blocks held by permanent and tentative entries
    pub used_blocks: u32,
    /// Blocks held by empty entries
    pub free_blocks: u32,
    /// Longest single empty region
    pub largest_free: u32,
    /// Number of empty regions
    pub empty_regions: usize,
}

impl SpaceSummary {
    #[must_use]
    pub fn from_entries(entries: &[DirectoryEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            let length = u32::from(entry.length());
            match entry.kind() {
                EntryKind::Permanent => {
                    summary.files += 1;
                    summary.used_blocks += length;
                }
                EntryKind::Tentative => summary.used_blocks += length,
                EntryKind::Empty => {
                    summary.empty_regions += 1;
                    summary.free_blocks += length;
                    summary.largest_free = summary.largest_free.max(length);
                }
                EntryKind::EndOfSegment => {}
            }
        }
        summary
    }

    /// Blocks referenced by every entry
    #[must_use]
    pub const fn total_blocks(&self) -> u32 {
        self.used_blocks + self.free_blocks
    }
}
