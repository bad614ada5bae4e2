use crate::Stat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Inode number
    pub inode: u64,
    pub ty: DirEntryType,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DirEntryType {
    Block,
    Char,
    Directory,
    Fifo,
    SymLink,
    Socket,
    #[default]
    Regular,
}

impl DirEntryType {
    /// Decodes the `S_IFMT` part of a mode. Modes without type bits count
    /// as regular files.
    pub fn from_mode(mode: u32) -> Self {
        match mode & Stat::S_IFMT {
            0o060000 => Self::Block,
            0o020000 => Self::Char,
            Stat::S_IFDIR => Self::Directory,
            0o010000 => Self::Fifo,
            0o120000 => Self::SymLink,
            0o140000 => Self::Socket,
            _ => Self::Regular,
        }
    }
}
