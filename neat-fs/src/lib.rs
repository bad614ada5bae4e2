//! # neat-fs
//!
//! A single-volume file system living in a fixed-size region of blocks.
//!
//! Block 0 holds the block bitmap followed by the inode bitmap, block 1 is
//! the inode table, every later block is a data block whose last four bytes
//! link to the next block of the same inode.

/* layers, top-down */

// Storage operations: the path based verbs
mod vfs;
pub use self::vfs::Usage;

// Directory layer: entries stored as directory content, path resolution
mod dir;
mod path;
pub use path::{components, split_parent_child};

// Extension chains: variable-length data of an inode
mod chain;

// Block manager: bitmaps and the inode table
mod efs;
pub use efs::{now, NeatFileSystem};

// On-disk structures
mod layout;
pub use layout::{DirEntry, DiskInode};

// Block store: block-granular addressing over a device
mod block_store;
pub use block_store::{count_blocks, BlockStore};

pub use block_dev::{BlockDevice, RamDisk};

pub const BLOCK_SIZE: usize = 4096;
pub const DEFAULT_BLOCK_COUNT: u32 = 256;
/// The block bitmap takes at most half of block 0, the rest is left to
/// the inode bitmap.
pub const MAX_BLOCK_COUNT: u32 = (BLOCK_SIZE * 8 / 2) as u32;

/// Size of the chain trailer at the end of every data block.
pub const BLOCK_PTR_SIZE: usize = 4;
/// Usable payload of a data block.
pub const BLOCK_DATA_SIZE: usize = BLOCK_SIZE - BLOCK_PTR_SIZE;
/// Trailer value meaning "no successor".
pub const NULL_BLOCK: u32 = u32::MAX;

pub const BITMAP_BLOCK: u32 = 0;
pub const INODE_TABLE_BLOCK: u32 = 1;
pub const ROOT_INODE: u32 = 0;

/// Longest file name in bytes; one more byte is kept for the NUL.
pub const NAME_MAX_LEN: usize = 47;
