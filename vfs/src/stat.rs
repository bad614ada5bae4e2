use crate::DirEntryType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub inode: u64,
    /// Type and permission bits
    pub mode: u32,
    /// File size
    pub size: u64,
    /// Owner
    pub uid: u32,
    /// Optimal I/O block size
    pub block_size: u64,
    /// Occupying blocks
    pub blocks: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl Stat {
    pub const S_IFMT: u32 = 0o170000;
    pub const S_IFDIR: u32 = 0o040000;
    pub const S_IFREG: u32 = 0o100000;

    #[inline]
    pub fn kind(&self) -> DirEntryType {
        DirEntryType::from_mode(self.mode)
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind() == DirEntryType::Directory
    }

    /// Permission bits only
    #[inline]
    pub fn permissions(&self) -> u32 {
        self.mode & !Self::S_IFMT
    }
}
