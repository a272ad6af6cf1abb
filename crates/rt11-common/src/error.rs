//! Error types for rt11dir
//!
//! This module defines the error taxonomy shared by the directory engine
//! and the command-line tool. Chain-integrity problems found while listing
//! are not errors; see `rt11_storage::directory::ChainWarning`.

use crate::types::FileNameError;
use thiserror::Error;

/// Common result type for rt11dir operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for rt11dir
#[derive(Debug, Error)]
pub enum Error {
    // Block I/O errors
    #[error("disk I/O error: {0}")]
    DiskIo(#[from] std::io::Error),

    #[error("block {block} out of range (volume has {total_blocks} blocks)")]
    BlockOutOfRange { block: u32, total_blocks: u32 },

    #[error("short transfer on block {block}: {transferred} of {expected} bytes")]
    ShortTransfer {
        block: u32,
        transferred: usize,
        expected: usize,
    },

    #[error("image is read-only")]
    ReadOnly,

    // Volume structure errors
    #[error("first directory block {block} out of range (volume has {total_blocks} blocks)")]
    FirstDirectoryBlockOutOfRange { block: u32, total_blocks: u32 },

    #[error("segment {segment} at block {block} lies beyond the volume ({total_blocks} blocks)")]
    SegmentOutOfBounds {
        segment: u16,
        block: u32,
        total_blocks: u32,
    },

    #[error(
        "entry at word {word_index} of segment {segment} ({entry_words} words) crosses the segment boundary"
    )]
    EntryOutOfBounds {
        segment: u16,
        word_index: usize,
        entry_words: usize,
    },

    // Allocation errors
    #[error("no empty area large enough: requested {requested} blocks, largest free {largest_free}")]
    NoSpace { requested: u32, largest_free: u32 },

    #[error("entry at word {word_index} of segment {segment} changed since it was read")]
    StaleEntry { segment: u16, word_index: usize },

    #[error("extent {start}+{length} is not a valid data range on a {total_blocks}-block volume")]
    InvalidExtent {
        start: u32,
        length: u32,
        total_blocks: u32,
    },

    #[error("file of {blocks} blocks exceeds the largest recordable entry")]
    FileTooLarge { blocks: u64 },

    // Segment split errors
    #[error("directory full: all {total_segments} segments are in the chain")]
    DirectoryFull { total_segments: u16 },

    #[error("directory link loop detected at segment {segment}")]
    DirectoryLoopDetected { segment: u16 },

    #[error("segment {from} links to segment {to}, outside 1..={total_segments}")]
    InvalidSegmentLink {
        from: u16,
        to: u16,
        total_segments: u16,
    },

    #[error("invalid segment count {count} (expected 1..=31)")]
    InvalidSegmentCount { count: u16 },

    #[error("segment {segment} has no entries to split")]
    EmptySegment { segment: u16 },

    #[error("segment {segment} holds only {entries} entry and cannot be split")]
    UnsplittableSegment { segment: u16, entries: usize },

    #[error("segment {segment} is not in the directory chain")]
    SegmentNotInChain { segment: u16 },

    #[error("segment {segment} still overflows after {attempts} splits")]
    SplitLimitExceeded { segment: u16, attempts: usize },

    // File errors
    #[error("invalid file name: {0}")]
    InvalidFileName(#[from] FileNameError),

    #[error("invalid date {year:04}-{month:02}-{day:02} (valid range 1972-01-01 to 2099-12-31)")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("entry {0} is not a permanent file")]
    NotPermanent(String),

    // Internal errors
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Check if the error reports a damaged directory structure
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::DirectoryLoopDetected { .. }
                | Self::InvalidSegmentLink { .. }
                | Self::InvalidSegmentCount { .. }
                | Self::SegmentOutOfBounds { .. }
                | Self::EntryOutOfBounds { .. }
                | Self::FirstDirectoryBlockOutOfRange { .. }
        )
    }

    /// Check if the error means the volume ran out of data or directory room
    #[must_use]
    pub fn is_space_exhausted(&self) -> bool {
        matches!(
            self,
            Self::NoSpace { .. } | Self::DirectoryFull { .. } | Self::SplitLimitExceeded { .. }
        )
    }
}
