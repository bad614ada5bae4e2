//! # Extension chains
//!
//! The content of an inode lives in a singly linked list of data blocks.
//! The last [`BLOCK_PTR_SIZE`](crate::BLOCK_PTR_SIZE) bytes of each block hold the index of the next
//! block, or [`NULL_BLOCK`] at the tail. Logical byte `n` of an inode sits in
//! the `n / BLOCK_DATA_SIZE`-th block of its chain.

use vfs::{Error, Result};

use crate::layout::{read_u32, write_u32, DiskInode};
use crate::{NeatFileSystem, BLOCK_DATA_SIZE, NULL_BLOCK};

impl NeatFileSystem {
    /// Successor of `block_id` as recorded in its trailer.
    pub fn next_block(&self, block_id: u32) -> Result<Option<u32>> {
        let next = self
            .store
            .map(block_id, |block| read_u32(block, BLOCK_DATA_SIZE))?;
        Ok((next != NULL_BLOCK).then_some(next))
    }

    pub(crate) fn set_next(&mut self, block_id: u32, next: Option<u32>) -> Result<()> {
        self.store.map_mut(block_id, |block| {
            write_u32(block, BLOCK_DATA_SIZE, next.unwrap_or(NULL_BLOCK))
        })
    }

    /// Every block of the chain starting at `start`, in order.
    ///
    /// The walk stops at the sentinel or at a successor that is out of the
    /// volume or not allocated.
    pub fn chain(&self, start: u32) -> Result<Vec<u32>> {
        if !self.is_block_allocated(start) {
            log::error!("chain starts at unallocated block {start}");
            return Err(Error::ConsistencyFault(format!(
                "chain starts at unallocated block {start}"
            )));
        }

        let mut blocks = vec![start];
        let mut current = start;
        while let Some(next) = self.next_block(current)? {
            if !self.is_block_allocated(next) {
                break;
            }
            // a chain can't be longer than the volume without looping
            if blocks.len() >= self.block_count() as usize {
                log::error!("chain starting at block {start} loops");
                return Err(Error::ConsistencyFault(format!(
                    "chain starting at block {start} loops"
                )));
            }
            blocks.push(next);
            current = next;
        }

        Ok(blocks)
    }

    /// Last block of the chain starting at `start`, `start` itself when it
    /// has no successor. A query for callers outside this module; resizing
    /// walks the whole chain anyway since it needs the length too.
    pub fn chain_tail(&self, start: u32) -> Result<u32> {
        let chain = self.chain(start)?;
        Ok(chain[chain.len() - 1])
    }

    /// Allocates a block and links it after `tail`.
    pub fn grow_chain(&mut self, tail: u32) -> Result<u32> {
        let block_id = self.alloc_block()?;
        self.set_next(tail, Some(block_id))?;
        Ok(block_id)
    }

    /// Resizes `inode` to `new_size`, appending blocks to its chain as the
    /// size crosses [`BLOCK_DATA_SIZE`] boundaries.
    ///
    /// When the volume runs out of blocks halfway, the blocks taken by this
    /// call are released again and the inode keeps its size.
    pub fn grow(&mut self, inode: &mut DiskInode, new_size: u32) -> Result<()> {
        if new_size == inode.size {
            return Ok(());
        }
        if new_size < inode.size {
            return self.shrink(inode, new_size);
        }

        let chain = self.chain(inode.block_id)?;
        let old_tail = chain[chain.len() - 1];
        let needed = DiskInode::blocks_for(new_size).saturating_sub(chain.len());

        let mut tail = old_tail;
        let mut added = Vec::with_capacity(needed);
        for _ in 0..needed {
            match self.grow_chain(tail) {
                Ok(block_id) => {
                    added.push(block_id);
                    tail = block_id;
                }
                Err(err) => {
                    for &block_id in &added {
                        self.dealloc_block(block_id)?;
                    }
                    self.set_next(old_tail, None)?;
                    return Err(err);
                }
            }
        }

        log::debug!(
            "grow inode {}: {} -> {} bytes, {} new blocks",
            inode.inode_id,
            inode.size,
            new_size,
            added.len()
        );
        inode.size = new_size;
        Ok(())
    }

    /// Resizes `inode` down to `new_size`, releasing every block past the
    /// one holding the new last byte. The new tail gets a fresh sentinel.
    pub fn shrink(&mut self, inode: &mut DiskInode, new_size: u32) -> Result<()> {
        if new_size == inode.size {
            return Ok(());
        }
        if new_size > inode.size {
            return self.grow(inode, new_size);
        }

        let chain = self.chain(inode.block_id)?;
        let keep = DiskInode::blocks_for(new_size).min(chain.len());

        // tail first
        for &block_id in chain[keep..].iter().rev() {
            self.dealloc_block(block_id)?;
        }
        if keep < chain.len() {
            self.set_next(chain[keep - 1], None)?;
        }

        log::debug!(
            "shrink inode {}: {} -> {} bytes, {} blocks freed",
            inode.inode_id,
            inode.size,
            new_size,
            chain.len() - keep
        );
        inode.size = new_size;
        Ok(())
    }

    /// Releases the whole chain including the first block. Only used when
    /// the inode itself goes away.
    pub fn free_all(&mut self, inode: &mut DiskInode) -> Result<()> {
        self.shrink(inode, 0)?;
        self.dealloc_block(inode.block_id)?;
        inode.block_id = NULL_BLOCK;
        Ok(())
    }

    /// Copies content of `inode` starting at `offset` into `buf`, never past
    /// the inode size. Returns the number of bytes read, which is short if
    /// the chain ends early.
    pub(crate) fn read_chain(
        &self,
        inode: &DiskInode,
        offset: usize,
        buf: &mut [u8],
    ) -> Result<usize> {
        let size = inode.size as usize;
        if offset >= size || buf.is_empty() {
            return Ok(0);
        }

        let end = offset.saturating_add(buf.len()).min(size);
        let chain = self.chain(inode.block_id)?;

        let mut start = offset;
        let mut read_size = 0;
        while start < end {
            let Some(&block_id) = chain.get(start / BLOCK_DATA_SIZE) else {
                log::warn!(
                    "inode {} ends after {} blocks, short of its {size} bytes",
                    inode.inode_id,
                    chain.len()
                );
                break;
            };

            let inblock = start % BLOCK_DATA_SIZE;
            let block_read_size = (BLOCK_DATA_SIZE - inblock).min(end - start);
            self.store.map(block_id, |block| {
                buf[read_size..read_size + block_read_size]
                    .copy_from_slice(&block[inblock..inblock + block_read_size])
            })?;

            read_size += block_read_size;
            start += block_read_size;
        }

        Ok(read_size)
    }

    /// Copies `buf` into the content of `inode` at `offset`. The inode must
    /// already be large enough; a chain that ends before the write is done
    /// means the chain and the size disagree.
    pub(crate) fn write_chain(
        &mut self,
        inode: &DiskInode,
        offset: usize,
        buf: &[u8],
    ) -> Result<usize> {
        let Some(end) = offset
            .checked_add(buf.len())
            .filter(|&end| end <= inode.size as usize)
        else {
            log::error!(
                "write of {} bytes at {offset} is past the {} bytes of inode {}",
                buf.len(),
                inode.size,
                inode.inode_id
            );
            return Err(Error::ConsistencyFault(format!(
                "write past the end of inode {}",
                inode.inode_id
            )));
        };

        let chain = self.chain(inode.block_id)?;

        let mut start = offset;
        let mut written_size = 0;
        while start < end {
            let Some(&block_id) = chain.get(start / BLOCK_DATA_SIZE) else {
                log::error!(
                    "inode {} ends after {} blocks, short of its {} bytes",
                    inode.inode_id,
                    chain.len(),
                    inode.size
                );
                return Err(Error::ConsistencyFault(format!(
                    "chain of inode {} ends before its size",
                    inode.inode_id
                )));
            };

            let inblock = start % BLOCK_DATA_SIZE;
            let block_write_size = (BLOCK_DATA_SIZE - inblock).min(end - start);
            self.store.map_mut(block_id, |block| {
                block[inblock..inblock + block_write_size]
                    .copy_from_slice(&buf[written_size..written_size + block_write_size])
            })?;

            written_size += block_write_size;
            start += block_write_size;
        }

        Ok(written_size)
    }
}
