//! rt11dir Storage Engine - Segmented volume directories
//!
//! This crate implements the directory engine for RT-11 style volume images:
//! - Block-addressed image access (host file or memory)
//! - On-disk layout: home block, directory segments, entry codec
//! - Chain walking with loop and bounds detection
//! - First-fit allocation of empty regions
//! - Directory growth by splitting overfull segments
//! - Ordered commits so an interrupted write never leaves a dangling link

pub mod directory;
pub mod layout;
pub mod raw_io;
pub mod volume;

// Re-exports
pub use directory::allocator::{Allocation, Extent, SpaceSummary, first_fit};
pub use directory::grower::{SplitOutcome, split_segment};
pub use directory::reader::{read_directory, walk_chain};
pub use directory::writer::RecordOutcome;
pub use directory::{
    ChainWarning, DirectoryEntry, DirectoryListing, SegmentSummary, VolumeGeometry,
};
pub use layout::{
    BLOCK_SIZE, BadBlockEntry, Block, DirEntry, EntryKind, HomeBlock, SegmentBuf, SegmentHeader,
};
pub use raw_io::{BlockStore, ImageFile, MemImage};
pub use volume::{CreateOptions, CreateOutcome, FormatOptions, Volume};
