//! # Block store
//!
//! Splits the region of a [`BlockDevice`] into [`BLOCK_SIZE`] blocks.
//! Every access is bounds checked here, callers above never index the raw
//! region themselves.

use std::fmt;
use std::io;

use block_dev::BlockDevice;
use vfs::{Error, Result};

use crate::{BLOCK_SIZE, MAX_BLOCK_COUNT};

pub struct BlockStore {
    device: Box<dyn BlockDevice>,
    block_count: u32,
}

/// Number of blocks needed to hold `bytes`. Planning only, never addressing.
#[inline]
pub fn count_blocks(bytes: usize) -> usize {
    bytes.div_ceil(BLOCK_SIZE)
}

impl BlockStore {
    pub fn new(device: Box<dyn BlockDevice>) -> Result<Self> {
        let len = device.len();
        if len % BLOCK_SIZE != 0 {
            return Err(Error::InvalidGeometry(format!(
                "region of {len} bytes is not a whole number of {BLOCK_SIZE} byte blocks"
            )));
        }

        let block_count = len / BLOCK_SIZE;
        if block_count % 8 != 0 || !(8..=MAX_BLOCK_COUNT as usize).contains(&block_count) {
            return Err(Error::InvalidGeometry(format!(
                "{block_count} blocks, expected a multiple of 8 in 8..={MAX_BLOCK_COUNT}"
            )));
        }

        Ok(Self {
            device,
            block_count: block_count as u32,
        })
    }

    #[inline]
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    #[inline]
    pub fn contains(&self, block_id: u32) -> bool {
        block_id < self.block_count
    }

    /// The block `block_id`, exactly [`BLOCK_SIZE`] bytes long.
    pub fn get(&self, block_id: u32) -> Result<&[u8]> {
        let start = self.start_of(block_id)?;
        Ok(&self.device.as_bytes()[start..start + BLOCK_SIZE])
    }

    pub fn get_mut(&mut self, block_id: u32) -> Result<&mut [u8]> {
        let start = self.start_of(block_id)?;
        Ok(&mut self.device.as_bytes_mut()[start..start + BLOCK_SIZE])
    }

    #[inline]
    pub fn map<V>(&self, block_id: u32, f: impl FnOnce(&[u8]) -> V) -> Result<V> {
        self.get(block_id).map(f)
    }

    #[inline]
    pub fn map_mut<V>(&mut self, block_id: u32, f: impl FnOnce(&mut [u8]) -> V) -> Result<V> {
        self.get_mut(block_id).map(f)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.device.flush()
    }

    pub fn into_device(self) -> Box<dyn BlockDevice> {
        self.device
    }

    fn start_of(&self, block_id: u32) -> Result<usize> {
        if !self.contains(block_id) {
            log::error!(
                "block {block_id} is out of the volume ({} blocks)",
                self.block_count
            );
            return Err(Error::ConsistencyFault(format!(
                "block {block_id} out of range"
            )));
        }

        Ok(block_id as usize * BLOCK_SIZE)
    }
}

impl fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockStore")
            .field("block_count", &self.block_count)
            .finish_non_exhaustive()
    }
}
