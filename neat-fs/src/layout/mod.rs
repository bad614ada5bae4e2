//! # On-disk structures
//!
//! Volume layout:
//! block bitmap + inode bitmap (block 0) | inode table (block 1) | data blocks
//!
//! Every structure is (de)serialized explicitly in little endian, so the
//! image stays identical whatever the alignment of the backing region.

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::DiskInode;

mod dir_entry;
pub use dir_entry::DirEntry;

#[inline]
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

#[inline]
pub(crate) fn read_i64(bytes: &[u8], offset: usize) -> i64 {
    let mut raw = [0; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    i64::from_le_bytes(raw)
}

#[inline]
pub(crate) fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn write_i64(bytes: &mut [u8], offset: usize, value: i64) {
    bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}
