use vfs::Stat;

use super::{read_i64, read_u32, write_i64, write_u32};
use crate::{BLOCK_DATA_SIZE, NULL_BLOCK};

/// An inode record as stored in the inode table.
///
/// Layout (little endian, no padding):
/// `size | mode | block_id | inode_id | ctime | mtime | atime`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskInode {
    /// Logical length of the content in bytes
    pub size: u32,
    /// Type and permission bits
    pub mode: u32,
    /// First block of the extension chain, [`NULL_BLOCK`] once released
    pub block_id: u32,
    /// Own index, kept for validation
    pub inode_id: u32,
    pub ctime: i64,
    pub mtime: i64,
    pub atime: i64,
}

impl DiskInode {
    pub const SIZE: usize = 40;

    /// Mode given to freshly allocated inodes: a `rwxr-xr-x` directory.
    pub const DEFAULT_MODE: u32 = Stat::S_IFDIR | 0o755;

    pub fn new(inode_id: u32, block_id: u32, now: i64) -> Self {
        Self {
            size: 0,
            mode: Self::DEFAULT_MODE,
            block_id,
            inode_id,
            ctime: now,
            mtime: now,
            atime: now,
        }
    }

    pub fn decode(bytes: &[u8]) -> Self {
        Self {
            size: read_u32(bytes, 0),
            mode: read_u32(bytes, 4),
            block_id: read_u32(bytes, 8),
            inode_id: read_u32(bytes, 12),
            ctime: read_i64(bytes, 16),
            mtime: read_i64(bytes, 24),
            atime: read_i64(bytes, 32),
        }
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        write_u32(bytes, 0, self.size);
        write_u32(bytes, 4, self.mode);
        write_u32(bytes, 8, self.block_id);
        write_u32(bytes, 12, self.inode_id);
        write_i64(bytes, 16, self.ctime);
        write_i64(bytes, 24, self.mtime);
        write_i64(bytes, 32, self.atime);
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode & Stat::S_IFMT == Stat::S_IFDIR
    }

    /// Whether the inode still owns a chain.
    #[inline]
    pub fn has_data(&self) -> bool {
        self.block_id != NULL_BLOCK
    }

    /// Chain length needed for `size` bytes. An inode always keeps its
    /// first block, even when empty.
    #[inline]
    pub fn blocks_for(size: u32) -> usize {
        (size as usize).div_ceil(BLOCK_DATA_SIZE).max(1)
    }
}
