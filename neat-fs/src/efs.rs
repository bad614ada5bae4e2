//! # Block manager
//!
//! Owns the volume and keeps its two bitmaps and the inode table in shape.

use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use block_dev::{BlockDevice, RamDisk};
use vfs::{Error, Result};

use crate::block_store::BlockStore;
use crate::layout::{Bitmap, DirEntry, DiskInode};
use crate::{BITMAP_BLOCK, BLOCK_DATA_SIZE, BLOCK_SIZE, INODE_TABLE_BLOCK, ROOT_INODE};

/// Handle to an opened volume. Every operation goes through it, there is
/// no global state.
#[derive(Debug)]
pub struct NeatFileSystem {
    pub(crate) store: BlockStore,
    block_bitmap: Bitmap,
    inode_bitmap: Bitmap,
    /// Owner reported for every inode
    uid: u32,
}

impl NeatFileSystem {
    /// Opens the volume held by `device`, laying out a fresh one when the
    /// region is still blank.
    pub fn open(device: Box<dyn BlockDevice>) -> Result<Self> {
        let store = BlockStore::new(device)?;
        let block_count = store.block_count() as usize;

        let block_bitmap = Bitmap::new(0, block_count);
        let inode_bitmap = Bitmap::new(block_bitmap.end(), Self::inode_capacity(block_count));
        debug_assert!(inode_bitmap.end() <= BLOCK_SIZE);

        let mut efs = Self {
            store,
            block_bitmap,
            inode_bitmap,
            uid: unsafe { libc::getuid() },
        };

        // block 0 stores both bitmaps, block 1 the inode table
        efs.store.map_mut(BITMAP_BLOCK, |block| {
            block_bitmap.set(block, BITMAP_BLOCK as usize, true);
            block_bitmap.set(block, INODE_TABLE_BLOCK as usize, true);
        })?;
        efs.init_root()?;

        log::info!(
            "volume opened: {} blocks, {} inode slots",
            efs.block_count(),
            efs.inode_count()
        );
        Ok(efs)
    }

    /// A fresh volume of `block_count` blocks held in memory.
    pub fn in_memory(block_count: u32) -> Result<Self> {
        Self::open(Box::new(RamDisk::new(block_count as usize * BLOCK_SIZE)))
    }

    /// Inode slots of a volume with `block_count` blocks: as many as
    /// directory entries fit in the data payload of every block, clamped to
    /// what the one-block inode table can hold.
    pub fn inode_capacity(block_count: usize) -> usize {
        let derived = BLOCK_DATA_SIZE / DirEntry::SIZE * block_count;
        derived.min(BLOCK_SIZE / DiskInode::SIZE)
    }

    #[inline]
    pub fn block_count(&self) -> u32 {
        self.store.block_count()
    }

    #[inline]
    pub fn inode_count(&self) -> u32 {
        self.inode_bitmap.capacity() as u32
    }

    #[inline]
    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.store.flush()
    }

    /// Gives the device back, e.g. to reopen it later.
    pub fn into_device(self) -> Box<dyn BlockDevice> {
        self.store.into_device()
    }
}

/* bitmap allocation */
impl NeatFileSystem {
    /// Allocates the first free block after block 0 and returns its index.
    /// The new block starts with an empty chain trailer.
    pub fn alloc_block(&mut self) -> Result<u32> {
        let Some(block_id) = self
            .store
            .map(BITMAP_BLOCK, |block| self.block_bitmap.first_free(block, 1))?
        else {
            log::warn!("alloc_block(): no free block left");
            return Err(Error::Exhausted);
        };

        let block_bitmap = self.block_bitmap;
        self.store
            .map_mut(BITMAP_BLOCK, |block| block_bitmap.set(block, block_id, true))?;
        let block_id = block_id as u32;
        self.set_next(block_id, None)?;

        log::debug!("alloc_block() -> {block_id}");
        Ok(block_id)
    }

    /// Clears the bit of `block_id`. Nothing may still reference the block.
    pub fn dealloc_block(&mut self, block_id: u32) -> Result<()> {
        if block_id <= INODE_TABLE_BLOCK || !self.store.contains(block_id) {
            log::error!("dealloc_block({block_id}): not a data block");
            return Err(Error::ConsistencyFault(format!(
                "block {block_id} is not a data block"
            )));
        }

        log::debug!("dealloc_block({block_id})");
        let block_bitmap = self.block_bitmap;
        self.store.map_mut(BITMAP_BLOCK, |block| {
            block_bitmap.set(block, block_id as usize, false)
        })
    }

    pub fn is_block_allocated(&self, block_id: u32) -> bool {
        self.store.contains(block_id)
            && self
                .store
                .map(BITMAP_BLOCK, |block| {
                    self.block_bitmap.get(block, block_id as usize)
                })
                .unwrap_or(false)
    }

    /// Allocated blocks and inode slots, in that order.
    pub(crate) fn used_counts(&self) -> (usize, usize) {
        self.store
            .map(BITMAP_BLOCK, |block| {
                (
                    self.block_bitmap.count_used(block),
                    self.inode_bitmap.count_used(block),
                )
            })
            .unwrap_or_default()
    }

    /// Allocates an inode with one empty data block, a directory mode and
    /// every timestamp set to now.
    pub fn alloc_inode(&mut self) -> Result<u32> {
        let Some(inode_id) = self
            .store
            .map(BITMAP_BLOCK, |block| self.inode_bitmap.first_free(block, 0))?
        else {
            log::warn!("alloc_inode(): no free inode slot left");
            return Err(Error::Exhausted);
        };
        let inode_id = inode_id as u32;

        // without a first block the slot stays free
        let block_id = self.alloc_block()?;
        self.write_inode(&DiskInode::new(inode_id, block_id, now()))?;

        let inode_bitmap = self.inode_bitmap;
        self.store.map_mut(BITMAP_BLOCK, |block| {
            inode_bitmap.set(block, inode_id as usize, true)
        })?;

        log::debug!("alloc_inode() -> {inode_id} (block {block_id})");
        Ok(inode_id)
    }

    /// Releases every block of the inode, then its slot.
    pub fn dealloc_inode(&mut self, inode_id: u32) -> Result<()> {
        let mut inode = self.inode(inode_id)?;
        if inode.has_data() {
            self.free_all(&mut inode)?;
            self.write_inode(&inode)?;
        }

        log::debug!("dealloc_inode({inode_id})");
        let inode_bitmap = self.inode_bitmap;
        self.store.map_mut(BITMAP_BLOCK, |block| {
            inode_bitmap.set(block, inode_id as usize, false)
        })
    }

    pub fn is_inode_allocated(&self, inode_id: u32) -> bool {
        inode_id < self.inode_count()
            && self
                .store
                .map(BITMAP_BLOCK, |block| {
                    self.inode_bitmap.get(block, inode_id as usize)
                })
                .unwrap_or(false)
    }
}

/* inode table */
impl NeatFileSystem {
    /// Reads the live inode `inode_id`.
    pub fn inode(&self, inode_id: u32) -> Result<DiskInode> {
        if !self.is_inode_allocated(inode_id) {
            return Err(Error::NotFound);
        }

        let offset = Self::inode_offset(inode_id);
        let inode = self.store.map(INODE_TABLE_BLOCK, |block| {
            DiskInode::decode(&block[offset..offset + DiskInode::SIZE])
        })?;

        if inode.inode_id != inode_id {
            log::error!(
                "inode slot {inode_id} claims to be inode {}",
                inode.inode_id
            );
            return Err(Error::ConsistencyFault(format!(
                "inode slot {inode_id} holds inode {}",
                inode.inode_id
            )));
        }

        Ok(inode)
    }

    /// Stores `inode` back into its slot.
    pub fn write_inode(&mut self, inode: &DiskInode) -> Result<()> {
        if inode.inode_id >= self.inode_count() {
            return Err(Error::ConsistencyFault(format!(
                "inode {} is beyond the inode table",
                inode.inode_id
            )));
        }

        let offset = Self::inode_offset(inode.inode_id);
        self.store.map_mut(INODE_TABLE_BLOCK, |block| {
            inode.encode(&mut block[offset..offset + DiskInode::SIZE])
        })
    }

    /// Reads, updates and writes back an inode in one go.
    pub fn update_inode<V>(
        &mut self,
        inode_id: u32,
        f: impl FnOnce(&mut DiskInode) -> V,
    ) -> Result<V> {
        let mut inode = self.inode(inode_id)?;
        let value = f(&mut inode);
        self.write_inode(&inode)?;
        Ok(value)
    }

    /// Creates the root directory unless an earlier session already did.
    pub fn init_root(&mut self) -> Result<()> {
        if self.is_inode_allocated(ROOT_INODE) {
            log::debug!("root already initialized");
            return Ok(());
        }

        let root = self.alloc_inode()?;
        if root != ROOT_INODE {
            log::error!("root directory was allocated as inode {root}");
            return Err(Error::ConsistencyFault(format!(
                "root directory allocated as inode {root}"
            )));
        }

        log::info!("root directory created");
        Ok(())
    }

    #[inline]
    fn inode_offset(inode_id: u32) -> usize {
        inode_id as usize * DiskInode::SIZE
    }
}

/// Current time as unix seconds.
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}
