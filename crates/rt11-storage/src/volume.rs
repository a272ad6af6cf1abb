//! Volume operations
//!
//! Provides the high-level operations on one image:
//! - Volume initialization with home block and empty directory
//! - Directory listing and lookup
//! - File creation (allocate, write data, record entry) and extraction
//! - Manual directory segment splits
//!
//! Geometry is re-derived from the image on every call; nothing read from
//! the directory is cached between operations.

use crate::directory::allocator::{self, Extent};
use crate::directory::grower::{self, SplitOutcome};
use crate::directory::writer::{self, RecordOutcome};
use crate::directory::{
    DirectoryEntry, DirectoryListing, VolumeGeometry, read_home_block, reader,
};
use crate::layout::{
    BLOCK_SIZE, DirEntry, EntryKind, HEADER_WORDS, HOME_BLOCK, HomeBlock, MAX_SEGMENTS,
    SEGMENT_WORDS, SegmentBuf, SegmentHeader,
};
use crate::raw_io::BlockStore;
use rt11_common::config::FormatConfig;
use rt11_common::{Error, FileName, Result, RtDate, encode_rad50};
use tracing::{debug, info, warn};

/// Directory parameters for a new volume
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatOptions {
    /// Segment slots (1-31)
    pub total_segments: u16,
    /// Extra bytes per entry (even)
    pub extra_bytes: u16,
    /// Block holding segment 1
    pub first_dir_block: u16,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::from(&FormatConfig::default())
    }
}

impl From<&FormatConfig> for FormatOptions {
    fn from(config: &FormatConfig) -> Self {
        Self {
            total_segments: config.total_segments,
            extra_bytes: config.extra_bytes,
            first_dir_block: config.first_dir_block,
        }
    }
}

impl FormatOptions {
    /// First data block for these options
    #[must_use]
    pub const fn data_start_block(&self) -> u32 {
        self.first_dir_block as u32 + self.total_segments as u32 * 2
    }

    fn validate(&self, total_blocks: u32) -> Result<()> {
        if self.total_segments == 0 || self.total_segments > MAX_SEGMENTS {
            return Err(Error::InvalidSegmentCount {
                count: self.total_segments,
            });
        }
        if self.extra_bytes % 2 != 0 {
            return Err(Error::invalid_argument(format!(
                "extra bytes per entry must be even, got {}",
                self.extra_bytes
            )));
        }
        let entry_words = SegmentHeader {
            extra_bytes: self.extra_bytes,
            ..SegmentHeader::default()
        }
        .entry_words();
        // room for at least one entry and the sentinel
        if HEADER_WORDS + 2 * entry_words > SEGMENT_WORDS {
            return Err(Error::invalid_argument(format!(
                "extra bytes per entry {} leave too few entries per segment",
                self.extra_bytes
            )));
        }
        if u32::from(self.first_dir_block) <= HOME_BLOCK {
            return Err(Error::invalid_argument(format!(
                "first directory block {} overlaps the boot or home block",
                self.first_dir_block
            )));
        }
        if self.data_start_block() >= total_blocks {
            return Err(Error::FirstDirectoryBlockOutOfRange {
                block: u32::from(self.first_dir_block),
                total_blocks,
            });
        }
        self.data_start_word()?;
        Ok(())
    }

    /// Data start as recorded in the segment header
    fn data_start_word(&self) -> Result<u16> {
        u16::try_from(self.data_start_block()).map_err(|_| {
            Error::invalid_argument(format!(
                "data start block {} does not fit a directory header",
                self.data_start_block()
            ))
        })
    }
}

/// Options for copying a file onto a volume
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Date recorded in the entry; no date when unset
    pub date: Option<RtDate>,
    /// Leave an existing permanent file of the same name alone
    pub no_replace: bool,
}

/// Result of [`Volume::create_file`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new entry was recorded
    Created(DirectoryEntry),
    /// `no_replace` was set and this file already existed
    Skipped(DirectoryEntry),
}

/// Directory engine over one block store
pub struct Volume<S: BlockStore> {
    store: S,
}

impl<S: BlockStore> Volume<S> {
    /// Open an existing volume
    pub fn open(store: S) -> Result<Self> {
        let geometry = VolumeGeometry::probe(&store)?;
        debug!(
            "opened volume: {} blocks, directory at block {}",
            geometry.total_blocks, geometry.first_dir_block
        );
        Ok(Self { store })
    }

    /// Initialize a new volume: home block plus a one-segment directory
    /// whose single empty entry covers the data area
    pub fn format(mut store: S, options: &FormatOptions) -> Result<Self> {
        let total_blocks = store.total_blocks();
        options.validate(total_blocks)?;

        let geometry = VolumeGeometry {
            total_blocks,
            first_dir_block: u32::from(options.first_dir_block),
        };
        let data_start = options.data_start_block();
        let mut free = total_blocks - data_start;
        if free > u32::from(u16::MAX) {
            warn!(
                "volume has {} data blocks, only {} are addressable",
                free,
                u16::MAX
            );
            free = u32::from(u16::MAX);
        }

        let mut segment = SegmentBuf::zeroed(1);
        segment.set_header(&SegmentHeader {
            total_segments: options.total_segments,
            next_segment: 0,
            highest_in_use: 1,
            extra_bytes: options.extra_bytes,
            data_start_block: options.data_start_word()?,
        });
        let first = segment.slot_index(0);
        let empty = DirEntry::empty(u16::try_from(free).unwrap_or(u16::MAX));
        segment.put_entry(first, &empty)?;
        segment.put_sentinel(first + segment.entry_words())?;

        let mut home = HomeBlock::new(options.first_dir_block);
        home.system_version = encode_rad50("V3A");
        store.write_block(HOME_BLOCK, &home.to_bytes())?;
        writer::commit_segment(&mut store, &geometry, &segment)?;
        store.sync()?;

        info!(
            "formatted volume: {} blocks, {} segments, data at block {}, {} free",
            total_blocks, options.total_segments, data_start, free
        );
        Ok(Self { store })
    }

    /// Directory location, read fresh from the home block
    pub fn geometry(&self) -> Result<VolumeGeometry> {
        VolumeGeometry::probe(&self.store)
    }

    /// Decoded home block
    pub fn home_block(&self) -> Result<HomeBlock> {
        read_home_block(&self.store)
    }

    /// Walk the directory chain
    pub fn read_directory(&self) -> Result<DirectoryListing> {
        reader::read_directory(&self.store, &self.geometry()?)
    }

    /// Look up a permanent file by name
    pub fn find(&self, name: &str) -> Result<Option<DirectoryEntry>> {
        let name = FileName::parse(name)?;
        Ok(self.read_directory()?.find(&name).cloned())
    }

    /// Record a permanent entry of `blocks` blocks without writing any data
    pub fn reserve(&mut self, name: FileName, blocks: u16, date: u16) -> Result<DirectoryEntry> {
        self.allocate_with(name, blocks, date, None)
    }

    /// Copy `data` onto the volume as a new permanent file
    pub fn create_file(
        &mut self,
        name: &str,
        data: &[u8],
        options: &CreateOptions,
    ) -> Result<CreateOutcome> {
        let name = FileName::parse(name)?;

        if options.no_replace {
            if let Some(existing) = self.read_directory()?.find(&name) {
                info!("skipping {}: already on volume", name);
                return Ok(CreateOutcome::Skipped(existing.clone()));
            }
        }

        let blocks = (data.len() as u64).div_ceil(BLOCK_SIZE as u64).max(1);
        let blocks = u16::try_from(blocks).map_err(|_| Error::FileTooLarge { blocks })?;
        let date = options.date.map_or(0, |d| d.to_word());

        self.allocate_with(name, blocks, date, Some(data))
            .map(CreateOutcome::Created)
    }

    /// Read the data blocks of a permanent file
    pub fn read_file(&self, entry: &DirectoryEntry) -> Result<Vec<u8>> {
        if entry.kind() != EntryKind::Permanent {
            return Err(Error::NotPermanent(entry.name().to_string()));
        }
        if entry.length() == 0 {
            return Ok(Vec::new());
        }
        let extent = Extent::from(entry);
        extent.validate(self.store.total_blocks())?;

        let mut data = Vec::with_capacity(extent.length as usize * BLOCK_SIZE);
        for block in extent.start..extent.end() {
            data.extend_from_slice(&self.store.read_block(block)?);
        }
        Ok(data)
    }

    /// Split a directory segment by hand
    pub fn split_segment(&mut self, segment: u16) -> Result<SplitOutcome> {
        let geometry = self.geometry()?;
        grower::split_segment(&mut self.store, &geometry, segment)
    }

    /// Get the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Release the underlying store
    pub fn into_inner(self) -> S {
        self.store
    }

    fn write_data(&mut self, extent: Extent, data: &[u8]) -> Result<()> {
        let mut chunks = data.chunks(BLOCK_SIZE);
        for block in extent.start..extent.end() {
            let mut buf = [0u8; BLOCK_SIZE];
            if let Some(chunk) = chunks.next() {
                buf[..chunk.len()].copy_from_slice(chunk);
            }
            self.store.write_block(block, &buf)?;
        }
        self.store.sync()
    }

    /// Allocate, write data, then record the entry, splitting the target
    /// segment and retrying while the entry does not fit
    fn allocate_with(
        &mut self,
        name: FileName,
        blocks: u16,
        date: u16,
        data: Option<&[u8]>,
    ) -> Result<DirectoryEntry> {
        let geometry = self.geometry()?;
        let file = DirEntry::permanent(name, blocks, date);
        let mut written: Option<Extent> = None;
        let mut split_budget: Option<usize> = None;
        let mut splits = 0usize;

        loop {
            let listing = reader::read_directory(&self.store, &geometry)?;
            listing.ensure_complete()?;

            let allocation = allocator::first_fit(&listing.entries, blocks)?;
            allocation.extent.validate(geometry.total_blocks)?;
            let budget = *split_budget.get_or_insert_with(|| {
                usize::from(listing.total_segments)
                    .saturating_sub(listing.segments.len())
                    .max(1)
            });

            if let Some(data) = data {
                if written != Some(allocation.extent) {
                    self.write_data(allocation.extent, data)?;
                    written = Some(allocation.extent);
                }
            }

            let mut segment = geometry.read_segment(&self.store, allocation.segment)?;
            match writer::record_allocation(&mut segment, &allocation, &file)? {
                RecordOutcome::Recorded => {
                    writer::commit_segment(&mut self.store, &geometry, &segment)?;
                    self.store.sync()?;
                    info!(
                        "created {} ({} blocks at block {}) in segment {}",
                        name, blocks, allocation.extent.start, allocation.segment
                    );
                    return Ok(DirectoryEntry {
                        segment: allocation.segment,
                        word_index: allocation.word_index,
                        start_block: allocation.extent.start,
                        entry: file,
                    });
                }
                RecordOutcome::NeedsSplit => {
                    // one split always makes room, so reaching the budget
                    // means split writes are not sticking
                    if splits >= budget {
                        return Err(Error::SplitLimitExceeded {
                            segment: allocation.segment,
                            attempts: splits,
                        });
                    }
                    grower::split_segment(&mut self.store, &geometry, allocation.segment)?;
                    splits += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::testutil::Recorder;
    use crate::raw_io::{ImageFile, MemImage};
    use tempfile::NamedTempFile;

    fn formatted(total_blocks: u32, total_segments: u16) -> Volume<MemImage> {
        let options = FormatOptions {
            total_segments,
            ..FormatOptions::default()
        };
        Volume::format(MemImage::new(total_blocks), &options).unwrap()
    }

    /// A single-segment volume with one empty region, written by hand
    fn single_empty(total_blocks: u32, data_start: u16, free: u16) -> Volume<MemImage> {
        let mut image = MemImage::new(total_blocks);
        image.write_block(1, &HomeBlock::new(6).to_bytes()).unwrap();
        let mut seg = SegmentBuf::zeroed(1);
        seg.set_header(&SegmentHeader {
            total_segments: 1,
            next_segment: 0,
            highest_in_use: 1,
            extra_bytes: 0,
            data_start_block: data_start,
        });
        seg.put_entry(5, &DirEntry::empty(free)).unwrap();
        seg.put_sentinel(12).unwrap();
        let geometry = VolumeGeometry {
            total_blocks,
            first_dir_block: 6,
        };
        geometry.write_segment(&mut image, &seg).unwrap();
        Volume::open(image).unwrap()
    }

    fn name(s: &str) -> FileName {
        FileName::parse(s).unwrap()
    }

    /// A 400-block, 4-segment volume whose segment 1 is one entry short
    /// of overflowing, behind a recording store
    fn nearly_full_segment() -> Volume<Recorder> {
        let mut volume = formatted(400, 4);
        for i in 0..70 {
            volume.reserve(name(&format!("F{i}")), 1, 0).unwrap();
        }
        Volume::open(Recorder::new(volume.into_inner())).unwrap()
    }

    #[test]
    fn test_format_layout() {
        let volume = formatted(500, 4);
        let listing = volume.read_directory().unwrap();

        assert!(listing.is_complete());
        assert_eq!(listing.total_segments, 4);
        assert_eq!(listing.data_start_block, 14);
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].kind(), EntryKind::Empty);
        assert_eq!(listing.entries[0].start_block, 14);
        assert_eq!(listing.entries[0].length(), 486);

        let home = volume.home_block().unwrap();
        assert_eq!(home.first_dir_block(), 6);
        assert!(home.bad_blocks.is_empty());
    }

    #[test]
    fn test_format_rejects_bad_options() {
        let bad = |options: FormatOptions| Volume::format(MemImage::new(100), &options).is_err();
        let ok = FormatOptions::default();

        assert!(bad(FormatOptions {
            total_segments: 0,
            ..ok
        }));
        assert!(bad(FormatOptions {
            total_segments: 32,
            ..ok
        }));
        assert!(bad(FormatOptions {
            extra_bytes: 3,
            ..ok
        }));
        assert!(bad(FormatOptions {
            first_dir_block: 1,
            ..ok
        }));
        assert!(Volume::format(MemImage::new(14), &ok).is_err());
    }

    #[test]
    fn test_allocation_conservation() {
        let mut volume = single_empty(200, 20, 100);

        let entry = volume.reserve(name("A.DAT"), 40, 0).unwrap();
        assert_eq!(entry.start_block, 20);

        let listing = volume.read_directory().unwrap();
        let got: Vec<(EntryKind, u16, u32)> = listing
            .entries
            .iter()
            .map(|e| (e.kind(), e.length(), e.start_block))
            .collect();
        assert_eq!(
            got,
            vec![(EntryKind::Permanent, 40, 20), (EntryKind::Empty, 60, 60)]
        );
        assert_eq!(
            allocator::SpaceSummary::from_entries(&listing.entries).total_blocks(),
            100
        );
    }

    #[test]
    fn test_allocation_exact_fit_adds_no_entry() {
        let mut volume = single_empty(200, 20, 100);
        volume.reserve(name("ALL.DAT"), 100, 0).unwrap();

        let listing = volume.read_directory().unwrap();
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].kind(), EntryKind::Permanent);
        assert_eq!(listing.entries[0].length(), 100);

        let err = volume.reserve(name("MORE.DAT"), 1, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::NoSpace {
                requested: 1,
                largest_free: 0
            }
        ));
    }

    #[test]
    fn test_end_to_end_one_megabyte_image() {
        let mut volume = single_empty(2048, 8, 2000);
        let data = vec![0xA5u8; 3 * BLOCK_SIZE - 100];

        let outcome = volume
            .create_file("hello.txt", &data, &CreateOptions::default())
            .unwrap();
        let CreateOutcome::Created(entry) = outcome else {
            panic!("expected a new file");
        };
        assert_eq!(entry.length(), 3);

        let listing = volume.read_directory().unwrap();
        assert_eq!(listing.entries.len(), 2);
        assert_eq!(listing.entries[0].kind(), EntryKind::Permanent);
        assert_eq!(listing.entries[0].name().to_string(), "HELLO.TXT");
        assert_eq!(listing.entries[0].length(), 3);
        assert_eq!(listing.entries[0].start_block, 8);
        assert_eq!(listing.entries[1].kind(), EntryKind::Empty);
        assert_eq!(listing.entries[1].length(), 1997);
        assert_eq!(listing.entries[1].start_block, 11);

        let read = volume.read_file(&listing.entries[0]).unwrap();
        assert_eq!(read.len(), 3 * BLOCK_SIZE);
        assert_eq!(&read[..data.len()], &data[..]);
        assert!(read[data.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_create_empty_file_takes_one_block() {
        let mut volume = formatted(100, 1);
        let CreateOutcome::Created(entry) = volume
            .create_file("EMPTY", &[], &CreateOptions::default())
            .unwrap()
        else {
            panic!("expected a new file");
        };
        assert_eq!(entry.length(), 1);
    }

    #[test]
    fn test_create_records_date() {
        let mut volume = formatted(100, 1);
        let date = RtDate::new(1997, 1, 15).unwrap();
        let options = CreateOptions {
            date: Some(date),
            no_replace: false,
        };
        volume.create_file("DATED.TXT", b"x", &options).unwrap();

        let entry = volume.find("dated.txt").unwrap().unwrap();
        assert_eq!(RtDate::from_word(entry.entry.date), Some(date));
    }

    #[test]
    fn test_no_replace_skips_existing() {
        let mut volume = formatted(100, 1);
        volume
            .create_file("SAME.DAT", b"first", &CreateOptions::default())
            .unwrap();

        let options = CreateOptions {
            no_replace: true,
            ..CreateOptions::default()
        };
        let outcome = volume.create_file("same.dat", b"second", &options).unwrap();
        assert!(matches!(outcome, CreateOutcome::Skipped(_)));
        assert_eq!(volume.read_directory().unwrap().files().count(), 1);

        // without no_replace a second entry is added
        volume
            .create_file("SAME.DAT", b"second", &CreateOptions::default())
            .unwrap();
        assert_eq!(volume.read_directory().unwrap().files().count(), 2);
    }

    #[test]
    fn test_overflow_splits_segment_and_retries() {
        let mut volume = formatted(400, 4);
        for i in 0..80 {
            let data = vec![u8::try_from(i).unwrap(); 10];
            volume
                .create_file(&format!("F{i}.DAT"), &data, &CreateOptions::default())
                .unwrap();
        }

        let listing = volume.read_directory().unwrap();
        assert!(listing.is_complete());
        assert_eq!(listing.chain(), vec![1, 2]);
        assert_eq!(listing.highest_in_use, 2);
        assert_eq!(listing.files().count(), 80);
        assert_eq!(listing.entries.len(), 81);

        // start blocks stay contiguous across the split
        let mut next = u32::from(listing.data_start_block);
        for entry in &listing.entries {
            assert_eq!(entry.start_block, next);
            next = entry.end_block();
        }
        assert_eq!(next, 400);

        let f42 = volume.find("F42.DAT").unwrap().unwrap();
        assert_eq!(&volume.read_file(&f42).unwrap()[..10], &[42u8; 10]);
    }

    #[test]
    fn test_directory_full_when_no_segment_left() {
        let mut volume = formatted(400, 1);
        let mut result = Ok(());
        for i in 0..80 {
            result = volume
                .reserve(name(&format!("F{i}")), 1, 0)
                .map(|_| ());
            if result.is_err() {
                break;
            }
        }
        let err = result.unwrap_err();
        assert!(matches!(err, Error::DirectoryFull { total_segments: 1 }));

        // the failed allocation left the directory readable and unchanged in size
        let listing = volume.read_directory().unwrap();
        assert!(listing.is_complete());
        assert_eq!(listing.entries.len(), 71);
    }

    #[test]
    fn test_write_refused_on_damaged_chain() {
        let mut volume = formatted(100, 4);
        let geometry = volume.geometry().unwrap();
        let mut head = geometry.read_segment(volume.store(), 1).unwrap();
        head.set_next_segment(1);
        let mut image = volume.into_inner();
        geometry.write_segment(&mut image, &head).unwrap();
        let mut volume = Volume::open(image).unwrap();

        let listing = volume.read_directory().unwrap();
        assert_eq!(listing.entries.len(), 1);
        assert!(!listing.is_complete());

        let err = volume.reserve(name("X"), 1, 0).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_read_file_rejects_non_permanent() {
        let volume = formatted(100, 1);
        let listing = volume.read_directory().unwrap();
        assert!(matches!(
            volume.read_file(&listing.entries[0]),
            Err(Error::NotPermanent(_))
        ));
    }

    #[test]
    fn test_read_file_rejects_extent_past_volume() {
        let volume = formatted(100, 1);
        let entry = DirectoryEntry {
            segment: 1,
            word_index: 5,
            start_block: 95,
            entry: DirEntry::permanent(name("BIG"), 10, 0),
        };
        assert!(matches!(
            volume.read_file(&entry),
            Err(Error::InvalidExtent { start: 95, .. })
        ));
    }

    #[test]
    fn test_file_too_large() {
        let mut volume = formatted(100, 1);
        let data = vec![0u8; 65536 * BLOCK_SIZE];
        assert!(matches!(
            volume.create_file("HUGE", &data, &CreateOptions::default()),
            Err(Error::FileTooLarge { blocks: 65536 })
        ));
    }

    #[test]
    fn test_image_file_volume_persists() {
        let temp = NamedTempFile::new().unwrap();
        {
            let image = ImageFile::create(temp.path(), 256).unwrap();
            let mut volume = Volume::format(image, &FormatOptions::default()).unwrap();
            volume
                .create_file("README.TXT", b"persisted", &CreateOptions::default())
                .unwrap();
        }

        let image = ImageFile::open(temp.path(), true).unwrap();
        let volume = Volume::open(image).unwrap();
        let entry = volume.find("README.TXT").unwrap().unwrap();
        assert!(volume.read_file(&entry).unwrap().starts_with(b"persisted"));
    }

    #[test]
    fn test_format_rejected_leaves_image_untouched() {
        let mut image = MemImage::new(65_600);
        let options = FormatOptions {
            total_segments: 4,
            extra_bytes: 0,
            first_dir_block: 65_530,
        };
        assert!(matches!(
            Volume::format(&mut image, &options),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(image.read_block(HOME_BLOCK).unwrap(), [0u8; BLOCK_SIZE]);
    }

    #[test]
    fn test_create_writes_data_before_directory() {
        let image = formatted(200, 4).into_inner();
        let mut volume = Volume::open(Recorder::new(image)).unwrap();

        volume
            .create_file("A.DAT", &[7u8; 1000], &CreateOptions::default())
            .unwrap();
        // data blocks 14-15, then segment 1 at blocks 6-7
        assert_eq!(volume.store().writes, vec![14, 15, 6, 7]);
    }

    #[test]
    fn test_create_after_split_writes_data_once_and_first() {
        let mut volume = nearly_full_segment();

        let created = volume
            .create_file("LAST.DAT", b"x", &CreateOptions::default())
            .unwrap();
        let CreateOutcome::Created(entry) = created else {
            panic!("expected a new entry");
        };
        assert_eq!(entry.start_block, 84);
        assert_eq!(entry.segment, 2);

        // data, then the split (new segment 2, then segment 1), then the
        // entry recorded in segment 2
        assert_eq!(volume.store().writes, vec![84, 8, 9, 6, 7, 8, 9]);
    }

    #[test]
    fn test_failed_directory_write_leaves_listing_unchanged() {
        let image = formatted(200, 4).into_inner();
        let mut store = Recorder::new(image);
        store.fail_on = Some(6);
        let mut volume = Volume::open(store).unwrap();

        let err = volume
            .create_file("A.DAT", b"data", &CreateOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::DiskIo(_)));
        assert_eq!(volume.store().writes, vec![14]);

        let listing = volume.read_directory().unwrap();
        assert_eq!(listing.files().count(), 0);
        assert_eq!(listing.entries.len(), 1);
    }

    #[test]
    fn test_split_limit_when_split_writes_are_lost() {
        let mut volume = nearly_full_segment();
        volume.store.lost = vec![6, 7];

        let err = volume.reserve(name("LAST"), 1, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::SplitLimitExceeded {
                segment: 1,
                attempts: 3
            }
        ));
        assert!(err.is_space_exhausted());

        let listing = volume.read_directory().unwrap();
        assert_eq!(listing.chain(), vec![1]);
        assert_eq!(listing.entries.len(), 71);
    }
}
