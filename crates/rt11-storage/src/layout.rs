//! On-disk layout definitions
//!
//! Volume Layout:
//! ```text
//! +------------------+  Block 0
//! |   Boot block     |
//! +------------------+  Block 1
//! |   Home block     |  bad block table, first directory block (word 234)
//! +------------------+  Blocks 2..first_dir_block
//! |   Reserved       |
//! +------------------+  first_dir_block (default 6)
//! |   Segment 1      |  2 blocks = 512 words
//! |   Segment 2      |  first_dir_block + (n - 1) * 2
//! |   ...            |
//! +------------------+  data_start_block (segment header word 4)
//! |   Data area      |  files and empty regions, in directory order
//! +------------------+
//! ```
//!
//! Segment Layout (16-bit little-endian words):
//! ```text
//! word 0      total segments (1-31)
//! word 1      next segment (0 = end of chain)
//! word 2      highest segment in use (segment 1 only)
//! word 3      extra bytes per entry
//! word 4      data start block
//! word 5..    entries, 7 + extra_bytes / 2 words each:
//!             status, name 1-3, name 4-6, extension, length, job/channel, date, extra...
//! ```

use bytes::{Buf, BufMut, BytesMut};
use derive_more::Display;
use rt11_common::{Error, FileName, Result};
use serde::Serialize;
use std::ops::Range;

/// Bytes per block
pub const BLOCK_SIZE: usize = 512;

/// One raw block
pub type Block = [u8; BLOCK_SIZE];

/// Block holding the home block
pub const HOME_BLOCK: u32 = 1;

/// First directory block used when the home block field is zero
pub const DEFAULT_FIRST_DIR_BLOCK: u32 = 6;

/// Blocks per directory segment
pub const SEGMENT_BLOCKS: u32 = 2;

/// Words per directory segment
pub const SEGMENT_WORDS: usize = 512;

/// Words in a segment header
pub const HEADER_WORDS: usize = 5;

/// Words in an entry with no extra bytes
pub const BASE_ENTRY_WORDS: usize = 7;

/// Largest number of directory segments a volume can declare
pub const MAX_SEGMENTS: u16 = 31;

const HOME_BAD_BLOCK_TABLE: usize = 16;
const HOME_BAD_BLOCK_PAIRS: usize = 33;
const HOME_PACK_CLUSTER: usize = 233;
const HOME_FIRST_DIR_BLOCK: usize = 234;
const HOME_SYSTEM_VERSION: usize = 235;

/// Entry status word bits
pub mod status {
    pub const TENTATIVE: u16 = 0x0100;
    pub const EMPTY: u16 = 0x0200;
    pub const PERMANENT: u16 = 0x0400;
    pub const END_OF_SEGMENT: u16 = 0x0800;
    pub const READ_ONLY: u16 = 0x4000;
    pub const PROTECTED: u16 = 0x8000;

    /// Bits carried through unmodified when an entry is rewritten
    pub const PROTECTION_MASK: u16 = READ_ONLY | PROTECTED;
}

fn words_of(block: &Block) -> [u16; BLOCK_SIZE / 2] {
    let mut words = [0u16; BLOCK_SIZE / 2];
    let mut buf = &block[..];
    for word in &mut words {
        *word = buf.get_u16_le();
    }
    words
}

/// One bad block table record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BadBlockEntry {
    pub block: u16,
    pub count: u16,
}

/// Decoded home block (block 1)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HomeBlock {
    /// Bad block table, up to the first all-zero record
    pub bad_blocks: Vec<BadBlockEntry>,
    /// Pack cluster size
    pub pack_cluster_size: u16,
    /// First directory block as stored (0 = default)
    pub first_dir_block_raw: u16,
    /// System version word
    pub system_version: u16,
}

impl HomeBlock {
    /// Create a home block pointing at the given first directory block
    #[must_use]
    pub fn new(first_dir_block: u16) -> Self {
        Self {
            pack_cluster_size: 1,
            first_dir_block_raw: first_dir_block,
            ..Self::default()
        }
    }

    /// Parse from block 1
    #[must_use]
    pub fn from_bytes(block: &Block) -> Self {
        let words = words_of(block);

        let bad_blocks = words[HOME_BAD_BLOCK_TABLE..HOME_BAD_BLOCK_TABLE + HOME_BAD_BLOCK_PAIRS * 2]
            .chunks_exact(2)
            .map(|pair| BadBlockEntry {
                block: pair[0],
                count: pair[1],
            })
            .take_while(|e| e.block != 0 || e.count != 0)
            .collect();

        Self {
            bad_blocks,
            pack_cluster_size: words[HOME_PACK_CLUSTER],
            first_dir_block_raw: words[HOME_FIRST_DIR_BLOCK],
            system_version: words[HOME_SYSTEM_VERSION],
        }
    }

    /// Serialize into a block; words this type does not model are zero
    #[must_use]
    pub fn to_bytes(&self) -> Block {
        let mut words = [0u16; BLOCK_SIZE / 2];
        for (i, entry) in self
            .bad_blocks
            .iter()
            .take(HOME_BAD_BLOCK_PAIRS)
            .enumerate()
        {
            words[HOME_BAD_BLOCK_TABLE + i * 2] = entry.block;
            words[HOME_BAD_BLOCK_TABLE + i * 2 + 1] = entry.count;
        }
        words[HOME_PACK_CLUSTER] = self.pack_cluster_size;
        words[HOME_FIRST_DIR_BLOCK] = self.first_dir_block_raw;
        words[HOME_SYSTEM_VERSION] = self.system_version;

        let mut buf = BytesMut::with_capacity(BLOCK_SIZE);
        for word in words {
            buf.put_u16_le(word);
        }
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&buf);
        block
    }

    /// Effective first directory block
    #[must_use]
    pub fn first_dir_block(&self) -> u32 {
        match self.first_dir_block_raw {
            0 => DEFAULT_FIRST_DIR_BLOCK,
            n => u32::from(n),
        }
    }
}

/// Directory segment header (first five words of a segment)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SegmentHeader {
    /// Segment slots available on the volume
    pub total_segments: u16,
    /// Next logical segment, 0 at the end of the chain
    pub next_segment: u16,
    /// Highest segment ever linked (meaningful in segment 1 only)
    pub highest_in_use: u16,
    /// Extra bytes per entry, identical in every segment
    pub extra_bytes: u16,
    /// First data block, identical in every segment
    pub data_start_block: u16,
}

impl SegmentHeader {
    fn from_words(words: &[u16]) -> Self {
        Self {
            total_segments: words[0],
            next_segment: words[1],
            highest_in_use: words[2],
            extra_bytes: words[3],
            data_start_block: words[4],
        }
    }

    fn write_words(&self, words: &mut [u16]) {
        words[0] = self.total_segments;
        words[1] = self.next_segment;
        words[2] = self.highest_in_use;
        words[3] = self.extra_bytes;
        words[4] = self.data_start_block;
    }

    /// Words per entry
    #[must_use]
    pub const fn entry_words(&self) -> usize {
        BASE_ENTRY_WORDS + (self.extra_bytes / 2) as usize
    }

    /// Segment count clamped the way readers tolerate it (0 or >31 => 1)
    #[must_use]
    pub const fn effective_total_segments(&self) -> u16 {
        if self.total_segments == 0 || self.total_segments > MAX_SEGMENTS {
            1
        } else {
            self.total_segments
        }
    }
}

/// Kind of directory entry, decoded from the status word
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Display)]
pub enum EntryKind {
    #[display("permanent")]
    Permanent,
    #[display("tentative")]
    Tentative,
    #[display("empty")]
    Empty,
    #[display("end-of-segment")]
    EndOfSegment,
}

impl EntryKind {
    /// Classify a status word; `None` for zero or unrecognized words
    #[must_use]
    pub const fn from_status(word: u16) -> Option<Self> {
        if word & status::END_OF_SEGMENT != 0 {
            Some(Self::EndOfSegment)
        } else if word & status::PERMANENT != 0 {
            Some(Self::Permanent)
        } else if word & status::TENTATIVE != 0 {
            Some(Self::Tentative)
        } else if word & status::EMPTY != 0 {
            Some(Self::Empty)
        } else {
            None
        }
    }

    /// Status bits for this kind
    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Self::Permanent => status::PERMANENT,
            Self::Tentative => status::TENTATIVE,
            Self::Empty => status::EMPTY,
            Self::EndOfSegment => status::END_OF_SEGMENT,
        }
    }

    /// Permanent or tentative, i.e. an entry describing a file
    #[must_use]
    pub const fn is_file(self) -> bool {
        matches!(self, Self::Permanent | Self::Tentative)
    }
}

/// A decoded directory entry, independent of where it sits
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub kind: EntryKind,
    /// Protection bits from the status word, preserved on rewrite
    pub protection: u16,
    pub name: FileName,
    /// Length in blocks
    pub length: u16,
    /// Job/channel word, preserved as-is
    pub job_channel: u16,
    /// Packed date word (0 = no date)
    pub date: u16,
    /// Words beyond the seven standard ones
    pub extra: Vec<u16>,
}

impl DirEntry {
    /// A permanent file entry
    #[must_use]
    pub fn permanent(name: FileName, length: u16, date: u16) -> Self {
        Self {
            kind: EntryKind::Permanent,
            protection: 0,
            name,
            length,
            job_channel: 0,
            date,
            extra: Vec::new(),
        }
    }

    /// An empty region
    #[must_use]
    pub fn empty(length: u16) -> Self {
        Self {
            kind: EntryKind::Empty,
            protection: 0,
            name: FileName::default(),
            length,
            job_channel: 0,
            date: 0,
            extra: Vec::new(),
        }
    }

    /// Full status word including protection bits
    #[must_use]
    pub const fn status_word(&self) -> u16 {
        self.kind.bits() | (self.protection & status::PROTECTION_MASK)
    }

    fn decode(slot: &[u16]) -> Option<Self> {
        let kind = EntryKind::from_status(slot[0])?;
        Some(Self {
            kind,
            protection: slot[0] & status::PROTECTION_MASK,
            name: FileName::from_words([slot[1], slot[2], slot[3]]),
            length: slot[4],
            job_channel: slot[5],
            date: slot[6],
            extra: slot[BASE_ENTRY_WORDS..].to_vec(),
        })
    }

    fn encode(&self, slot: &mut [u16]) {
        let [n1, n2, ext] = self.name.words();
        slot[..BASE_ENTRY_WORDS].copy_from_slice(&[
            self.status_word(),
            n1,
            n2,
            ext,
            self.length,
            self.job_channel,
            self.date,
        ]);
        let tail = &mut slot[BASE_ENTRY_WORDS..];
        tail.fill(0);
        let n = tail.len().min(self.extra.len());
        tail[..n].copy_from_slice(&self.extra[..n]);
    }
}

/// Why decoding of a segment stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SegmentEnd {
    /// An end-of-segment sentinel
    Sentinel,
    /// A zero status word
    ZeroStatus,
    /// A status word with no recognised kind bit
    UnknownStatus(u16),
    /// No further whole entry fits in the segment
    Boundary,
}

/// Entries of one segment in word-index order
#[derive(Clone, Debug)]
pub struct SegmentScan {
    /// `(word_index, entry)` for every non-sentinel entry
    pub entries: Vec<(usize, DirEntry)>,
    /// Word index where decoding stopped (sentinel position or first free slot)
    pub end_index: usize,
    pub end: SegmentEnd,
}

/// A directory segment as 512 words, with bounds-checked entry access
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentBuf {
    number: u16,
    words: Vec<u16>,
}

impl SegmentBuf {
    /// An all-zero segment
    #[must_use]
    pub fn zeroed(number: u16) -> Self {
        Self {
            number,
            words: vec![0u16; SEGMENT_WORDS],
        }
    }

    /// Assemble from the segment's two blocks
    #[must_use]
    pub fn from_blocks(number: u16, first: &Block, second: &Block) -> Self {
        let mut buf = (&first[..]).chain(&second[..]);
        let words = (0..SEGMENT_WORDS).map(|_| buf.get_u16_le()).collect();
        Self { number, words }
    }

    /// Split back into the segment's two blocks
    #[must_use]
    pub fn to_blocks(&self) -> (Block, Block) {
        let mut buf = BytesMut::with_capacity(SEGMENT_WORDS * 2);
        for &word in &self.words {
            buf.put_u16_le(word);
        }
        let mut first = [0u8; BLOCK_SIZE];
        let mut second = [0u8; BLOCK_SIZE];
        first.copy_from_slice(&buf[..BLOCK_SIZE]);
        second.copy_from_slice(&buf[BLOCK_SIZE..]);
        (first, second)
    }

    /// Logical segment number
    #[must_use]
    pub const fn number(&self) -> u16 {
        self.number
    }

    #[must_use]
    pub fn header(&self) -> SegmentHeader {
        SegmentHeader::from_words(&self.words)
    }

    pub fn set_header(&mut self, header: &SegmentHeader) {
        header.write_words(&mut self.words);
    }

    pub fn set_next_segment(&mut self, next: u16) {
        self.words[1] = next;
    }

    pub fn set_highest_in_use(&mut self, highest: u16) {
        self.words[2] = highest;
    }

    /// Words per entry, from this segment's header
    #[must_use]
    pub fn entry_words(&self) -> usize {
        self.header().entry_words()
    }

    /// Word index of the `slot`-th entry
    #[must_use]
    pub fn slot_index(&self, slot: usize) -> usize {
        HEADER_WORDS + slot * self.entry_words()
    }

    /// Whether a whole entry starting at `word_index` fits in the segment
    #[must_use]
    pub fn fits(&self, word_index: usize) -> bool {
        word_index >= HEADER_WORDS && word_index + self.entry_words() <= SEGMENT_WORDS
    }

    fn slot_range(&self, word_index: usize) -> Result<Range<usize>> {
        let entry_words = self.entry_words();
        if !self.fits(word_index) || (word_index - HEADER_WORDS) % entry_words != 0 {
            return Err(Error::EntryOutOfBounds {
                segment: self.number,
                word_index,
                entry_words,
            });
        }
        Ok(word_index..word_index + entry_words)
    }

    /// Raw words of the entry at `word_index`
    pub fn raw_slot(&self, word_index: usize) -> Result<&[u16]> {
        let range = self.slot_range(word_index)?;
        Ok(&self.words[range])
    }

    /// Overwrite the entry at `word_index` with raw words
    pub fn put_raw_slot(&mut self, word_index: usize, slot: &[u16]) -> Result<()> {
        let range = self.slot_range(word_index)?;
        let n = slot.len().min(range.len());
        self.words[range.start..range.start + n].copy_from_slice(&slot[..n]);
        self.words[range.start + n..range.end].fill(0);
        Ok(())
    }

    /// Decode the entry at `word_index`; `None` for a zero or unknown status
    pub fn entry_at(&self, word_index: usize) -> Result<Option<DirEntry>> {
        Ok(DirEntry::decode(self.raw_slot(word_index)?))
    }

    /// Encode `entry` into the slot at `word_index`
    pub fn put_entry(&mut self, word_index: usize, entry: &DirEntry) -> Result<()> {
        let range = self.slot_range(word_index)?;
        entry.encode(&mut self.words[range]);
        Ok(())
    }

    /// Overwrite only the status word of the slot at `word_index`
    ///
    /// Unlike full entry writes this accepts a trailing slot too short for a
    /// whole entry, since a sentinel needs just its status word.
    pub fn set_status(&mut self, word_index: usize, status: u16) -> Result<()> {
        let entry_words = self.entry_words();
        if word_index < HEADER_WORDS
            || word_index >= SEGMENT_WORDS
            || (word_index - HEADER_WORDS) % entry_words != 0
        {
            return Err(Error::EntryOutOfBounds {
                segment: self.number,
                word_index,
                entry_words,
            });
        }
        self.words[word_index] = status;
        Ok(())
    }

    /// Move the entries in `from..to` one entry width toward the end
    ///
    /// The destination range must still lie inside the segment.
    pub fn shift_entries_up(&mut self, from: usize, to: usize) -> Result<()> {
        let entry_words = self.entry_words();
        if from > to || to + entry_words > SEGMENT_WORDS {
            return Err(Error::EntryOutOfBounds {
                segment: self.number,
                word_index: to,
                entry_words,
            });
        }
        self.words.copy_within(from..to, from + entry_words);
        Ok(())
    }

    /// Clear a slot and mark it as the end of the segment
    pub fn put_sentinel(&mut self, word_index: usize) -> Result<()> {
        self.set_status(word_index, status::END_OF_SEGMENT)?;
        let end = (word_index + self.entry_words()).min(SEGMENT_WORDS);
        self.words[word_index + 1..end].fill(0);
        Ok(())
    }

    /// Decode entries in word-index order until a sentinel, a zero or
    /// unknown status, or the segment boundary
    #[must_use]
    pub fn scan(&self) -> SegmentScan {
        let entry_words = self.entry_words();
        let mut entries = Vec::new();
        let mut idx = HEADER_WORDS;

        let end = loop {
            if idx + entry_words > SEGMENT_WORDS {
                break SegmentEnd::Boundary;
            }
            let slot = &self.words[idx..idx + entry_words];
            match EntryKind::from_status(slot[0]) {
                Some(EntryKind::EndOfSegment) => break SegmentEnd::Sentinel,
                Some(_) => {
                    if let Some(entry) = DirEntry::decode(slot) {
                        entries.push((idx, entry));
                    }
                }
                None if slot[0] == 0 => break SegmentEnd::ZeroStatus,
                None => break SegmentEnd::UnknownStatus(slot[0]),
            }
            idx += entry_words;
        };

        SegmentScan {
            entries,
            end_index: idx,
            end,
        }
    }
}
