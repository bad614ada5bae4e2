//! # Block device interface
//!
//! A block device is a fixed-size region of bytes that a file system carves
//! into blocks. [`BlockDevice`] abstracts over where that region lives
//! (a memory-mapped image, plain memory, ...), so that `neat-fs` addresses
//! the volume without caring about the medium behind it.

use std::any::Any;
use std::fmt;
use std::io;

/// Block device driver trait.
///
/// Unlike a sector-oriented driver, the whole region is exposed at once and
/// stays addressable for as long as the device lives.
pub trait BlockDevice: Send + Any {
    fn as_bytes(&self) -> &[u8];

    fn as_bytes_mut(&mut self) -> &mut [u8];

    /// Writes every pending modification back to the medium.
    fn flush(&mut self) -> io::Result<()>;

    #[inline]
    fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A device living purely in memory; nothing survives a drop.
pub struct RamDisk {
    data: Box<[u8]>,
}

impl RamDisk {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0; len].into_boxed_slice(),
        }
    }

    /// Wraps an existing image, e.g. a snapshot taken from another device.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { data: bytes.into() }
    }
}

impl fmt::Debug for RamDisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RamDisk")
            .field("len", &self.data.len())
            .finish()
    }
}

impl BlockDevice for RamDisk {
    #[inline]
    fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
