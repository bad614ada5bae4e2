//! # Directory layer
//!
//! A directory is an inode whose content is a packed array of
//! [`DirEntry`]s. Entries may straddle block boundaries since they are read
//! through the extension chain like any other content.

use vfs::{Error, Result};

use crate::efs::now;
use crate::layout::{DirEntry, DiskInode};
use crate::path::components;
use crate::{NeatFileSystem, ROOT_INODE};

impl NeatFileSystem {
    /// Inode index of the entry `name` in directory `dir`; first match wins.
    pub fn lookup(&self, dir: u32, name: &str) -> Result<u32> {
        let dir = self.directory(dir)?;
        self.entries(&dir)?
            .into_iter()
            .find(|entry| entry.is_named(name))
            .map(|entry| entry.inode_id())
            .ok_or(Error::NotFound)
    }

    /// Walks `path` from the root, one component at a time.
    pub fn resolve_path(&self, path: &str) -> Result<u32> {
        if !path.starts_with('/') {
            return Err(Error::InvalidPath);
        }

        components(path).try_fold(ROOT_INODE, |current, name| {
            self.lookup(current, name).inspect_err(|err| {
                log::debug!("resolve_path({path}): {name:?} in inode {current}: {err}")
            })
        })
    }

    /// All entries of directory `dir`, in storage order.
    pub fn read_dir(&self, dir: u32) -> Result<Vec<DirEntry>> {
        let dir = self.directory(dir)?;
        self.entries(&dir)
    }

    /// Appends an entry `name -> child` to directory `dir`.
    pub fn add_entry(&mut self, dir: u32, name: &str, child: u32) -> Result<()> {
        let entry = DirEntry::new(name, child)?;
        let mut dir = self.directory(dir)?;
        if self.entries(&dir)?.iter().any(|entry| entry.is_named(name)) {
            return Err(Error::AlreadyExists);
        }

        let offset = dir.size as usize;
        let new_size = dir.size + DirEntry::SIZE as u32;
        self.grow(&mut dir, new_size)?;
        self.write_chain(&dir, offset, &entry.to_bytes())?;

        dir.mtime = now();
        self.write_inode(&dir)?;

        log::debug!("add_entry({}, {name:?}) -> {child}", dir.inode_id);
        Ok(())
    }

    /// Removes the entry `name` from directory `dir`, moving every later
    /// entry one slot down. Returns the inode the entry pointed to.
    pub fn remove_entry(&mut self, dir: u32, name: &str) -> Result<u32> {
        let mut dir = self.directory(dir)?;
        let entries = self.entries(&dir)?;
        let index = entries
            .iter()
            .position(|entry| entry.is_named(name))
            .ok_or(Error::NotFound)?;
        let child = entries[index].inode_id();

        let tail: Vec<u8> = entries[index + 1..]
            .iter()
            .flat_map(|entry| entry.to_bytes())
            .collect();
        self.write_chain(&dir, index * DirEntry::SIZE, &tail)?;
        let new_size = dir.size - DirEntry::SIZE as u32;
        self.shrink(&mut dir, new_size)?;

        dir.mtime = now();
        self.write_inode(&dir)?;

        log::debug!("remove_entry({}, {name:?}) -> {child}", dir.inode_id);
        Ok(child)
    }

    /// Reads inode `dir`, making sure it is a directory.
    fn directory(&self, dir: u32) -> Result<DiskInode> {
        let inode = self.inode(dir)?;
        if !inode.is_dir() {
            return Err(Error::NotADirectory);
        }
        Ok(inode)
    }

    fn entries(&self, dir: &DiskInode) -> Result<Vec<DirEntry>> {
        let mut content = vec![0; dir.size as usize];
        let read_size = self.read_chain(dir, 0, &mut content)?;

        Ok(content[..read_size]
            .chunks_exact(DirEntry::SIZE)
            .map(DirEntry::decode)
            .collect())
    }
}
