//! Block-addressed image I/O
//!
//! A volume image is a flat sequence of 512-byte blocks. The directory
//! engine only ever talks to a [`BlockStore`]; this module provides one
//! backed by a host file and one backed by memory for tests and tooling.

use crate::layout::{BLOCK_SIZE, Block};
use rt11_common::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Fixed-size block read/write primitive
pub trait BlockStore {
    /// Number of whole blocks in the image
    fn total_blocks(&self) -> u32;

    /// Read one block; fails if `block` is out of range or the transfer is short
    fn read_block(&self, block: u32) -> Result<Block>;

    /// Write one block; fails if `block` is out of range or the transfer is short
    fn write_block(&mut self, block: u32, data: &Block) -> Result<()>;

    /// Flush written blocks to stable storage
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    /// Check that a block number is inside the image
    fn check_block(&self, block: u32) -> Result<()> {
        let total_blocks = self.total_blocks();
        if block >= total_blocks {
            return Err(Error::BlockOutOfRange {
                block,
                total_blocks,
            });
        }
        Ok(())
    }
}

impl<T: BlockStore + ?Sized> BlockStore for &mut T {
    fn total_blocks(&self) -> u32 {
        (**self).total_blocks()
    }

    fn read_block(&self, block: u32) -> Result<Block> {
        (**self).read_block(block)
    }

    fn write_block(&mut self, block: u32, data: &Block) -> Result<()> {
        (**self).write_block(block, data)
    }

    fn sync(&mut self) -> Result<()> {
        (**self).sync()
    }
}

fn blocks_for_len(len: u64) -> u32 {
    u32::try_from(len / BLOCK_SIZE as u64).unwrap_or(u32::MAX)
}

/// Volume image stored in a host file
pub struct ImageFile {
    file: File,
    path: String,
    total_blocks: u32,
    read_only: bool,
}

impl ImageFile {
    /// Open an existing image
    pub fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let mut options = OpenOptions::new();
        options.read(true);
        if !read_only {
            options.write(true);
        }

        let file = options.open(&path).map_err(|e| {
            Error::DiskIo(std::io::Error::new(
                e.kind(),
                format!("failed to open {path_str}: {e}"),
            ))
        })?;
        let len = file.metadata()?.len();

        if len % BLOCK_SIZE as u64 != 0 {
            tracing::warn!(
                "{} is {} bytes, trailing partial block ignored",
                path_str,
                len
            );
        }

        Ok(Self {
            file,
            path: path_str,
            total_blocks: blocks_for_len(len),
            read_only,
        })
    }

    /// Create (or truncate) an image of `total_blocks` zeroed blocks
    pub fn create(path: impl AsRef<Path>, total_blocks: u32) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| {
                Error::DiskIo(std::io::Error::new(
                    e.kind(),
                    format!("failed to create {path_str}: {e}"),
                ))
            })?;
        file.set_len(u64::from(total_blocks) * BLOCK_SIZE as u64)?;

        Ok(Self {
            file,
            path: path_str,
            total_blocks,
            read_only: false,
        })
    }

    fn seek_to(&self, block: u32) -> Result<()> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(u64::from(block) * BLOCK_SIZE as u64))?;
        Ok(())
    }
}

impl BlockStore for ImageFile {
    fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    fn read_block(&self, block: u32) -> Result<Block> {
        self.check_block(block)?;
        self.seek_to(block)?;

        let mut buf = [0u8; BLOCK_SIZE];
        let mut file = &self.file;
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        if filled != BLOCK_SIZE {
            return Err(Error::ShortTransfer {
                block,
                transferred: filled,
                expected: BLOCK_SIZE,
            });
        }
        Ok(buf)
    }

    fn write_block(&mut self, block: u32, data: &Block) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        self.check_block(block)?;
        self.seek_to(block)?;

        let mut file = &self.file;
        let mut written = 0;
        while written < BLOCK_SIZE {
            match file.write(&data[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        if written != BLOCK_SIZE {
            return Err(Error::ShortTransfer {
                block,
                transferred: written,
                expected: BLOCK_SIZE,
            });
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }
        self.file.sync_data()?;
        tracing::debug!("synced {}", self.path);
        Ok(())
    }
}

/// Volume image held in memory
#[derive(Clone, Debug, Default)]
pub struct MemImage {
    data: Vec<u8>,
}

impl MemImage {
    /// Create a zero-filled image
    #[must_use]
    pub fn new(total_blocks: u32) -> Self {
        Self {
            data: vec![0u8; total_blocks as usize * BLOCK_SIZE],
        }
    }

    /// Wrap existing image bytes; a trailing partial block is unreachable
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    fn range(block: u32) -> std::ops::Range<usize> {
        let start = block as usize * BLOCK_SIZE;
        start..start + BLOCK_SIZE
    }
}

impl BlockStore for MemImage {
    fn total_blocks(&self) -> u32 {
        blocks_for_len(self.data.len() as u64)
    }

    fn read_block(&self, block: u32) -> Result<Block> {
        self.check_block(block)?;
        let mut buf = [0u8; BLOCK_SIZE];
        buf.copy_from_slice(&self.data[Self::range(block)]);
        Ok(buf)
    }

    fn write_block(&mut self, block: u32, data: &Block) -> Result<()> {
        self.check_block(block)?;
        self.data[Self::range(block)].copy_from_slice(data);
        Ok(())
    }
}
