use std::borrow::Cow;

use vfs::{Error, Result};

use super::{read_u32, write_u32};
use crate::NAME_MAX_LEN;

/// Metadata of a file system item, as stored in directory content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    // the last byte is kept for the NUL
    name: [u8; NAME_MAX_LEN + 1],
    inode_id: u32,
}

impl DirEntry {
    /// Entries are always 52 bytes: the name buffer then the inode index.
    pub const SIZE: usize = NAME_MAX_LEN + 1 + 4;

    pub fn new(name: &str, inode_id: u32) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.len() > NAME_MAX_LEN {
            return Err(Error::NameTooLong);
        }
        if bytes.is_empty() || bytes.contains(&0) || name.contains('/') {
            return Err(Error::InvalidPath);
        }

        let mut name = [0; NAME_MAX_LEN + 1];
        name[..bytes.len()].copy_from_slice(bytes);

        Ok(Self { name, inode_id })
    }

    /// Raw name bytes, without the terminator.
    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(NAME_MAX_LEN + 1);
        &self.name[..len]
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    #[inline]
    pub fn is_named(&self, name: &str) -> bool {
        self.name_bytes() == name.as_bytes()
    }

    #[inline]
    pub fn inode_id(&self) -> u32 {
        self.inode_id
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let mut name = [0; NAME_MAX_LEN + 1];
        name.copy_from_slice(&bytes[..NAME_MAX_LEN + 1]);

        Self {
            name,
            inode_id: read_u32(bytes, NAME_MAX_LEN + 1),
        }
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        bytes[..NAME_MAX_LEN + 1].copy_from_slice(&self.name);
        write_u32(bytes, NAME_MAX_LEN + 1, self.inode_id);
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0; Self::SIZE];
        self.encode(&mut bytes);
        bytes
    }
}
