//! Segmented directory engine
//!
//! The directory is a singly linked chain of two-block segments starting at
//! segment 1. This module holds the shared view types; the work is split
//! across:
//! - [`reader`]: tolerant chain walk producing a [`DirectoryListing`]
//! - [`allocator`]: first-fit search over empty regions
//! - [`writer`]: in-segment entry updates and ordered commits
//! - [`grower`]: splitting an overfull segment into two linked segments

pub mod allocator;
pub mod grower;
pub mod reader;
pub mod writer;

use crate::layout::{DirEntry, EntryKind, HOME_BLOCK, HomeBlock, SEGMENT_BLOCKS, SegmentBuf};
use crate::raw_io::BlockStore;
use derive_more::Display;
use rt11_common::{Error, FileName, Result};
use serde::Serialize;

/// Where the directory lives on a particular image
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VolumeGeometry {
    /// Whole blocks in the image
    pub total_blocks: u32,
    /// Block holding segment 1
    pub first_dir_block: u32,
}

impl VolumeGeometry {
    /// Derive the geometry from the image's home block
    pub fn probe<S: BlockStore + ?Sized>(store: &S) -> Result<Self> {
        let home = read_home_block(store)?;
        let geometry = Self {
            total_blocks: store.total_blocks(),
            first_dir_block: home.first_dir_block(),
        };

        if !geometry.segment_in_bounds(1) {
            return Err(Error::FirstDirectoryBlockOutOfRange {
                block: geometry.first_dir_block,
                total_blocks: geometry.total_blocks,
            });
        }
        Ok(geometry)
    }

    /// First block of a segment
    #[must_use]
    pub fn segment_block(&self, segment: u16) -> u32 {
        self.first_dir_block + u32::from(segment.saturating_sub(1)) * SEGMENT_BLOCKS
    }

    /// Whether both blocks of a segment lie inside the image
    #[must_use]
    pub fn segment_in_bounds(&self, segment: u16) -> bool {
        segment >= 1
            && u64::from(self.segment_block(segment)) + u64::from(SEGMENT_BLOCKS)
                <= u64::from(self.total_blocks)
    }

    fn check_segment(&self, segment: u16) -> Result<u32> {
        let block = self.segment_block(segment);
        if !self.segment_in_bounds(segment) {
            return Err(Error::SegmentOutOfBounds {
                segment,
                block,
                total_blocks: self.total_blocks,
            });
        }
        Ok(block)
    }

    /// Read and assemble one segment
    pub fn read_segment<S: BlockStore + ?Sized>(
        &self,
        store: &S,
        segment: u16,
    ) -> Result<SegmentBuf> {
        let block = self.check_segment(segment)?;
        let first = store.read_block(block)?;
        let second = store.read_block(block + 1)?;
        Ok(SegmentBuf::from_blocks(segment, &first, &second))
    }

    /// Write one segment's two blocks
    pub fn write_segment<S: BlockStore + ?Sized>(
        &self,
        store: &mut S,
        segment: &SegmentBuf,
    ) -> Result<()> {
        let block = self.check_segment(segment.number())?;
        let (first, second) = segment.to_blocks();
        store.write_block(block, &first)?;
        store.write_block(block + 1, &second)?;
        Ok(())
    }
}

/// Read and decode block 1
pub fn read_home_block<S: BlockStore + ?Sized>(store: &S) -> Result<HomeBlock> {
    Ok(HomeBlock::from_bytes(&store.read_block(HOME_BLOCK)?))
}

/// A decoded entry together with its position and derived start block
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Logical segment holding the entry
    pub segment: u16,
    /// Word index of the entry inside its segment
    pub word_index: usize,
    /// Absolute first block, derived from the running chain offset
    pub start_block: u32,
    #[serde(flatten)]
    pub entry: DirEntry,
}

impl DirectoryEntry {
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.entry.kind
    }

    #[must_use]
    pub const fn name(&self) -> &FileName {
        &self.entry.name
    }

    #[must_use]
    pub const fn length(&self) -> u16 {
        self.entry.length
    }

    /// One past the last block
    #[must_use]
    pub fn end_block(&self) -> u32 {
        self.start_block + u32::from(self.entry.length)
    }
}

/// A chain problem that truncated a directory walk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display)]
pub enum ChainWarning {
    #[display("segment {from} links to segment {segment}, outside 1..={total_segments}")]
    SegmentOutOfRange {
        from: u16,
        segment: u16,
        total_segments: u16,
    },
    #[display("segment {segment} visited twice, directory links loop")]
    LoopDetected { segment: u16 },
    #[display("segment {segment} at block {block} lies beyond the volume ({total_blocks} blocks)")]
    BeyondVolume {
        segment: u16,
        block: u32,
        total_blocks: u32,
    },
}

impl ChainWarning {
    /// The error a write operation reports when it meets this warning
    #[must_use]
    pub fn into_error(self) -> Error {
        match self {
            Self::SegmentOutOfRange {
                from,
                segment,
                total_segments,
            } => Error::InvalidSegmentLink {
                from,
                to: segment,
                total_segments,
            },
            Self::LoopDetected { segment } => Error::DirectoryLoopDetected { segment },
            Self::BeyondVolume {
                segment,
                block,
                total_blocks,
            } => Error::SegmentOutOfBounds {
                segment,
                block,
                total_blocks,
            },
        }
    }
}

/// Per-segment statistics gathered during a walk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SegmentSummary {
    pub number: u16,
    /// First physical block
    pub block: u32,
    pub next_segment: u16,
    /// Non-sentinel entries
    pub entries: usize,
    /// Whole entry slots still unused after leaving room for the sentinel
    pub free_slots: usize,
}

/// Result of reading the whole chain
#[derive(Clone, Debug, Default, Serialize)]
pub struct DirectoryListing {
    /// Entries in chain order
    pub entries: Vec<DirectoryEntry>,
    /// Segments in chain order
    pub segments: Vec<SegmentSummary>,
    /// Segment count from segment 1, clamped to 1..=31
    pub total_segments: u16,
    pub highest_in_use: u16,
    pub extra_bytes: u16,
    pub data_start_block: u16,
    /// Problems that cut the walk short
    pub warnings: Vec<ChainWarning>,
}

impl DirectoryListing {
    /// Whether the walk reached the end of the chain cleanly
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    /// First permanent entry with the given name
    #[must_use]
    pub fn find(&self, name: &FileName) -> Option<&DirectoryEntry> {
        self.entries
            .iter()
            .find(|e| e.kind() == EntryKind::Permanent && e.name() == name)
    }

    /// Permanent entries only
    pub fn files(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind() == EntryKind::Permanent)
    }

    /// Segment numbers in chain order
    #[must_use]
    pub fn chain(&self) -> Vec<u16> {
        self.segments.iter().map(|s| s.number).collect()
    }

    /// Fail with the first chain warning, if any
    pub fn ensure_complete(&self) -> Result<()> {
        match self.warnings.first() {
            Some(warning) => Err(warning.into_error()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::layout::{Block, DirEntry, HomeBlock, SegmentBuf, SegmentHeader};
    use crate::raw_io::{BlockStore, MemImage};
    use rt11_common::{Error, Result};

    use super::VolumeGeometry;

    pub const FIRST_DIR: u32 = 6;

    /// Store that logs every accepted block write
    ///
    /// A write to `fail_on` returns an I/O error and is not logged. Writes to
    /// `lost` blocks are logged and acknowledged but never reach the image.
    pub struct Recorder {
        pub inner: MemImage,
        pub writes: Vec<u32>,
        pub fail_on: Option<u32>,
        pub lost: Vec<u32>,
    }

    impl Recorder {
        pub fn new(inner: MemImage) -> Self {
            Self {
                inner,
                writes: Vec::new(),
                fail_on: None,
                lost: Vec::new(),
            }
        }
    }

    impl BlockStore for Recorder {
        fn total_blocks(&self) -> u32 {
            self.inner.total_blocks()
        }

        fn read_block(&self, block: u32) -> Result<Block> {
            self.inner.read_block(block)
        }

        fn write_block(&mut self, block: u32, data: &Block) -> Result<()> {
            if self.fail_on == Some(block) {
                return Err(Error::DiskIo(std::io::Error::other(format!(
                    "write to block {block} failed"
                ))));
            }
            self.writes.push(block);
            if self.lost.contains(&block) {
                return Ok(());
            }
            self.inner.write_block(block, data)
        }
    }

    pub fn header(total_segments: u16, next_segment: u16, data_start: u16) -> SegmentHeader {
        SegmentHeader {
            total_segments,
            next_segment,
            highest_in_use: 1,
            extra_bytes: 0,
            data_start_block: data_start,
        }
    }

    /// An image with a home block and the given segments written verbatim
    pub fn image_with(total_blocks: u32, segments: &[(SegmentHeader, u16, Vec<DirEntry>)]) -> MemImage {
        let mut image = MemImage::new(total_blocks);
        image
            .write_block(1, &HomeBlock::new(FIRST_DIR as u16).to_bytes())
            .unwrap();
        let geometry = VolumeGeometry {
            total_blocks,
            first_dir_block: FIRST_DIR,
        };
        for (header, number, entries) in segments {
            let mut seg = SegmentBuf::zeroed(*number);
            seg.set_header(header);
            let mut idx = seg.slot_index(0);
            for entry in entries {
                seg.put_entry(idx, entry).unwrap();
                idx += seg.entry_words();
            }
            seg.put_sentinel(idx).unwrap();
            geometry.write_segment(&mut image, &seg).unwrap();
        }
        image
    }
}
