//! # Storage operations
//!
//! The path based verbs a file system front end calls. Each one resolves
//! its path(s) through the directory layer and then works on inodes.

use enumflags2::BitFlags;
use vfs::{Access, DirEntryType, Error, Result, Stat};

use crate::efs::now;
use crate::layout::DiskInode;
use crate::path::{components, split_parent_child};
use crate::{NeatFileSystem, BLOCK_SIZE, ROOT_INODE};

/// Allocation summary of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub block_size: u64,
    pub total_blocks: u64,
    pub used_blocks: u64,
    pub total_inodes: u64,
    pub used_inodes: u64,
}

impl NeatFileSystem {
    pub fn stat(&self, path: &str) -> Result<Stat> {
        let inode = self.inode(self.resolve_path(path)?)?;
        let blocks = if inode.has_data() {
            self.chain(inode.block_id)?.len()
        } else {
            0
        };

        Ok(Stat {
            inode: inode.inode_id as u64,
            mode: inode.mode,
            size: inode.size as u64,
            uid: self.uid(),
            block_size: BLOCK_SIZE as u64,
            blocks: blocks as u64,
            atime: inode.atime,
            mtime: inode.mtime,
            ctime: inode.ctime,
        })
    }

    /// Reads up to `size` bytes at `offset`. The result is short when the
    /// file ends first and empty when `offset` is past the end.
    pub fn read_at(&self, path: &str, offset: usize, size: usize) -> Result<Vec<u8>> {
        let inode = self.inode(self.resolve_path(path)?)?;

        let mut buf = vec![0; size.min((inode.size as usize).saturating_sub(offset))];
        let read_size = self.read_chain(&inode, offset, &mut buf)?;
        buf.truncate(read_size);

        Ok(buf)
    }

    /// Writes `buf` at `offset`, growing the file first when needed.
    pub fn write_at(&mut self, path: &str, offset: usize, buf: &[u8]) -> Result<usize> {
        let mut inode = self.file(path)?;
        if buf.is_empty() {
            return Ok(0);
        }

        let end = offset
            .checked_add(buf.len())
            .and_then(|end| u32::try_from(end).ok())
            .ok_or(Error::Exhausted)?;
        if end > inode.size {
            self.grow(&mut inode, end)?;
        }
        inode.mtime = now();
        self.write_inode(&inode)?;

        self.write_chain(&inode, offset, buf)
    }

    pub fn truncate(&mut self, path: &str, size: u64) -> Result<()> {
        let mut inode = self.file(path)?;
        let size = u32::try_from(size).map_err(|_| Error::Exhausted)?;

        self.grow(&mut inode, size)?;
        inode.mtime = now();
        self.write_inode(&inode)
    }

    /// Creates a file system object at `path`. A `mode` without type bits
    /// makes a regular file. Returns the new inode.
    pub fn mknod(&mut self, path: &str, mode: u32) -> Result<u32> {
        let (parent, name) = split_parent_child(path)?;
        let parent = self.resolve_path(parent)?;

        let inode_id = self.alloc_inode()?;
        let mode = if mode & Stat::S_IFMT == 0 {
            mode | Stat::S_IFREG
        } else {
            mode
        };
        self.update_inode(inode_id, |inode| inode.mode = mode)?;

        // don't leave an orphan behind
        if let Err(err) = self.add_entry(parent, name, inode_id) {
            self.dealloc_inode(inode_id)?;
            return Err(err);
        }

        log::info!("mknod({path}, {mode:o}) -> {inode_id}");
        Ok(inode_id)
    }

    pub fn mkdir(&mut self, path: &str, mode: u32) -> Result<u32> {
        self.mknod(path, (mode & !Stat::S_IFMT) | Stat::S_IFDIR)
    }

    /// Removes the directory entry at `path`. The inode stays allocated,
    /// other names may still point at it.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (parent, name) = split_parent_child(path)?;
        let parent = self.resolve_path(parent)?;
        let inode_id = self.remove_entry(parent, name)?;

        log::info!("unlink({path}) -> {inode_id}");
        Ok(())
    }

    /// Removes an empty directory and frees its inode.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        if path.starts_with('/') && components(path).next().is_none() {
            return Err(Error::PermissionDenied);
        }

        let (parent, name) = split_parent_child(path)?;
        let parent = self.resolve_path(parent)?;
        let inode_id = self.lookup(parent, name)?;

        if !self.read_dir(inode_id)?.is_empty() {
            return Err(Error::DirectoryNotEmpty);
        }
        self.remove_entry(parent, name)?;
        self.dealloc_inode(inode_id)?;

        log::info!("rmdir({path}) -> {inode_id}");
        Ok(())
    }

    /// Makes `to` another name of the object at `from`.
    pub fn link(&mut self, from: &str, to: &str) -> Result<()> {
        let inode_id = self.resolve_path(from)?;
        let (parent, name) = split_parent_child(to)?;
        let parent = self.resolve_path(parent)?;
        self.add_entry(parent, name, inode_id)?;

        log::info!("link({from} => {to}) -> {inode_id}");
        Ok(())
    }

    /// Moves `from` to `to`. The new name is linked before the old one is
    /// removed, so a failure never leaves the object unreachable.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let source = self.resolve_path(from)?;
        if from == to {
            return Ok(());
        }

        // a directory can't go below itself
        let (parent, _) = split_parent_child(to)?;
        let mut current = ROOT_INODE;
        if source == current {
            return Err(Error::InvalidPath);
        }
        for name in components(parent) {
            current = self.lookup(current, name)?;
            if current == source {
                return Err(Error::InvalidPath);
            }
        }

        self.link(from, to)?;
        self.unlink(from)
    }

    pub fn set_times(&mut self, path: &str, atime: i64, mtime: i64) -> Result<()> {
        let inode_id = self.resolve_path(path)?;
        self.update_inode(inode_id, |inode| {
            inode.atime = atime;
            inode.mtime = mtime;
        })
    }

    /// Replaces the permission bits, the type bits stay.
    pub fn chmod(&mut self, path: &str, mode: u32) -> Result<()> {
        let inode_id = self.resolve_path(path)?;
        self.update_inode(inode_id, |inode| {
            inode.mode = (inode.mode & Stat::S_IFMT) | (mode & !Stat::S_IFMT);
            inode.ctime = now();
        })
    }

    /// Checks `mask` against the owner bits of the object at `path`. An
    /// empty mask only checks that it exists.
    pub fn access(&self, path: &str, mask: BitFlags<Access>) -> Result<()> {
        let inode = self.inode(self.resolve_path(path)?)?;
        let granted = BitFlags::<Access>::from_bits_truncate((inode.mode >> 6) & 0o7);

        if granted.contains(mask) {
            Ok(())
        } else {
            Err(Error::PermissionDenied)
        }
    }

    /// Lists the directory at `path`.
    pub fn ls(&self, path: &str) -> Result<Vec<vfs::DirEntry>> {
        let dir = self.resolve_path(path)?;
        self.read_dir(dir)?
            .into_iter()
            .map(|entry| -> Result<vfs::DirEntry> {
                let inode = self.inode(entry.inode_id())?;
                Ok(vfs::DirEntry {
                    inode: entry.inode_id() as u64,
                    ty: DirEntryType::from_mode(inode.mode),
                    name: entry.name().into_owned(),
                })
            })
            .collect()
    }

    /// Reads the inode at `path`, refusing directories.
    fn file(&self, path: &str) -> Result<DiskInode> {
        let inode = self.inode(self.resolve_path(path)?)?;
        if inode.is_dir() {
            return Err(Error::IsADirectory);
        }
        Ok(inode)
    }

    pub fn usage(&self) -> Usage {
        let (used_blocks, used_inodes) = self.used_counts();

        Usage {
            block_size: BLOCK_SIZE as u64,
            total_blocks: self.block_count() as u64,
            used_blocks: used_blocks as u64,
            total_inodes: self.inode_count() as u64,
            used_inodes: used_inodes as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BLOCK_DATA_SIZE;

    fn volume() -> NeatFileSystem {
        NeatFileSystem::in_memory(256).unwrap()
    }

    #[test]
    fn mknod_sets_mode() {
        let mut efs = volume();
        let file = efs.mknod("/a", 0o644).unwrap();
        let dir = efs.mkdir("/d", 0o700).unwrap();

        let stat = efs.stat("/a").unwrap();
        assert_eq!(stat.inode, file as u64);
        assert_eq!(stat.mode, Stat::S_IFREG | 0o644);
        assert_eq!(stat.size, 0);
        assert_eq!(stat.blocks, 1);
        assert_eq!(stat.uid, efs.uid());
        assert!(!stat.is_dir());

        assert_eq!(efs.stat("/d").unwrap().mode, Stat::S_IFDIR | 0o700);
        assert_eq!(efs.resolve_path("/d"), Ok(dir));
        assert!(efs.stat("/").unwrap().is_dir());
    }

    #[test]
    fn mknod_failures_release_the_inode() {
        let mut efs = volume();
        efs.mknod("/a", 0o644).unwrap();
        let used = efs.usage();

        assert_eq!(efs.mknod("/a", 0o644), Err(Error::AlreadyExists));
        assert_eq!(efs.mknod("/nope/a", 0o644), Err(Error::NotFound));
        assert_eq!(
            efs.mknod(&format!("/{}", "x".repeat(60)), 0o644),
            Err(Error::NameTooLong)
        );
        assert_eq!(efs.mknod("a", 0o644), Err(Error::InvalidPath));
        assert_eq!(efs.usage(), used);
    }

    #[test]
    fn nested_directories() {
        let mut efs = volume();
        efs.mkdir("/usr", 0o755).unwrap();
        efs.mkdir("/usr/bin", 0o755).unwrap();
        let file = efs.mknod("/usr/bin/app", 0o755).unwrap();
        efs.write_at("/usr/bin/app", 0, b"\x7fELF").unwrap();

        assert_eq!(efs.resolve_path("/usr/bin/app"), Ok(file));
        assert_eq!(efs.read_at("/usr/bin/app", 0, 16).unwrap(), b"\x7fELF");

        let listing = efs.ls("/usr").unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "bin");
        assert_eq!(listing[0].ty, DirEntryType::Directory);
    }

    #[test]
    fn write_and_read_at_offsets() {
        let mut efs = volume();
        efs.mknod("/f", 0o644).unwrap();

        efs.write_at("/f", 0, b"hello world").unwrap();
        efs.write_at("/f", 6, b"there").unwrap();
        assert_eq!(efs.read_at("/f", 0, 64).unwrap(), b"hello there");
        assert_eq!(efs.read_at("/f", 6, 3).unwrap(), b"the");
        assert_eq!(efs.read_at("/f", 11, 3).unwrap(), b"");
        assert_eq!(efs.read_at("/f", 100, 3).unwrap(), b"");
        assert_eq!(efs.write_at("/f", 3, b"").unwrap(), 0);
        assert_eq!(efs.stat("/f").unwrap().size, 11);
    }

    #[test]
    fn write_past_end_leaves_zeroes() {
        let mut efs = volume();
        efs.mknod("/f", 0o644).unwrap();
        let offset = 2 * BLOCK_DATA_SIZE + 3;

        efs.write_at("/f", offset, b"tail").unwrap();
        let content = efs.read_at("/f", 0, offset + 4).unwrap();
        assert_eq!(content.len(), offset + 4);
        assert!(content[..offset].iter().all(|&b| b == 0));
        assert_eq!(&content[offset..], b"tail");
    }

    #[test]
    fn offsets_past_the_address_space() {
        let mut efs = volume();
        efs.mknod("/f", 0o644).unwrap();
        let used = efs.usage();

        assert_eq!(efs.write_at("/f", usize::MAX, b"x"), Err(Error::Exhausted));
        assert_eq!(efs.write_at("/f", u32::MAX as usize, b"x"), Err(Error::Exhausted));
        assert_eq!(efs.read_at("/f", usize::MAX, 8).unwrap(), b"");
        assert_eq!(efs.stat("/f").unwrap().size, 0);
        assert_eq!(efs.usage(), used);
    }

    #[test]
    fn content_operations_refuse_directories() {
        let mut efs = volume();
        efs.mkdir("/d", 0o755).unwrap();
        let child = efs.mknod("/d/f", 0o644).unwrap();

        assert_eq!(efs.truncate("/d", 0), Err(Error::IsADirectory));
        assert_eq!(efs.write_at("/d", 0, &[b'x'; 52]), Err(Error::IsADirectory));
        assert_eq!(efs.write_at("/", 0, b"x"), Err(Error::IsADirectory));

        let listing = efs.ls("/d").unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].inode, child as u64);
    }

    #[test]
    fn truncate_both_ways() {
        let mut efs = volume();
        efs.mknod("/f", 0o644).unwrap();
        efs.write_at("/f", 0, &[1; 3 * BLOCK_DATA_SIZE]).unwrap();
        let used = efs.usage().used_blocks;

        efs.truncate("/f", 10).unwrap();
        assert_eq!(efs.stat("/f").unwrap().size, 10);
        assert_eq!(efs.usage().used_blocks, used - 2);
        assert_eq!(efs.read_at("/f", 0, 100).unwrap(), [1; 10]);

        efs.truncate("/f", BLOCK_DATA_SIZE as u64 + 1).unwrap();
        assert_eq!(efs.stat("/f").unwrap().blocks, 2);
        assert_eq!(efs.truncate("/nope", 1), Err(Error::NotFound));
    }

    #[test]
    fn out_of_space() {
        let mut efs = NeatFileSystem::in_memory(8).unwrap();
        efs.mknod("/f", 0o644).unwrap();

        let big = vec![7; 10 * BLOCK_DATA_SIZE];
        assert_eq!(efs.write_at("/f", 0, &big), Err(Error::Exhausted));
        assert_eq!(efs.stat("/f").unwrap().size, 0);

        // what still fits goes through
        let fits = vec![7; 4 * BLOCK_DATA_SIZE];
        assert_eq!(efs.write_at("/f", 0, &fits), Ok(fits.len()));
        assert_eq!(efs.read_at("/f", 0, fits.len()).unwrap(), fits);
    }

    #[test]
    fn unlink_keeps_inode() {
        let mut efs = volume();
        let file = efs.mknod("/a", 0o644).unwrap();

        efs.unlink("/a").unwrap();
        assert_eq!(efs.resolve_path("/a"), Err(Error::NotFound));
        assert!(efs.is_inode_allocated(file));
        assert_eq!(efs.unlink("/a"), Err(Error::NotFound));
        assert_eq!(efs.unlink("/"), Err(Error::InvalidPath));
    }

    #[test]
    fn rmdir_rules() {
        let mut efs = volume();
        let dir = efs.mkdir("/d", 0o755).unwrap();
        efs.mknod("/d/f", 0o644).unwrap();
        efs.mknod("/f", 0o644).unwrap();

        assert_eq!(efs.rmdir("/d"), Err(Error::DirectoryNotEmpty));
        assert_eq!(efs.rmdir("/f"), Err(Error::NotADirectory));
        assert_eq!(efs.rmdir("/"), Err(Error::PermissionDenied));
        assert_eq!(efs.rmdir("//"), Err(Error::PermissionDenied));

        efs.unlink("/d/f").unwrap();
        efs.rmdir("/d").unwrap();
        assert!(!efs.is_inode_allocated(dir));
        assert_eq!(efs.resolve_path("/d"), Err(Error::NotFound));
    }

    #[test]
    fn link_into_subdirectory() {
        let mut efs = volume();
        efs.mkdir("/d", 0o755).unwrap();
        let file = efs.mknod("/a", 0o644).unwrap();

        efs.link("/a", "/d/b").unwrap();
        assert_eq!(efs.resolve_path("/d/b"), Ok(file));
        assert_eq!(efs.link("/a", "/d/b"), Err(Error::AlreadyExists));
        assert_eq!(efs.link("/nope", "/c"), Err(Error::NotFound));
    }

    #[test]
    fn rename_failures_keep_source() {
        let mut efs = volume();
        let dir = efs.mkdir("/d", 0o755).unwrap();
        let file = efs.mknod("/a", 0o644).unwrap();
        efs.mknod("/b", 0o644).unwrap();

        assert_eq!(efs.rename("/a", "/b"), Err(Error::AlreadyExists));
        assert_eq!(efs.rename("/a", "/nope/a"), Err(Error::NotFound));
        assert_eq!(efs.rename("/d", "/d/inner"), Err(Error::InvalidPath));
        assert_eq!(efs.rename("/d/", "/d/inner"), Err(Error::InvalidPath));
        assert_eq!(efs.rename("/", "/root"), Err(Error::InvalidPath));
        assert_eq!(efs.resolve_path("/a"), Ok(file));
        assert_eq!(efs.resolve_path("/d"), Ok(dir));

        // the same directory spelled differently
        assert_eq!(efs.rename("/d", "//d/x"), Err(Error::InvalidPath));
        assert_eq!(efs.rename("/d", "/d//x/"), Err(Error::InvalidPath));
        assert!(efs.ls("/d").unwrap().is_empty());
        assert_eq!(efs.resolve_path("/d"), Ok(dir));

        efs.rename("/a", "/a").unwrap();
        efs.rename("/d", "/dd").unwrap();
        assert_eq!(efs.resolve_path("/dd"), Ok(dir));
    }

    #[test]
    fn rename_below_a_hard_link_of_itself() {
        let mut efs = volume();
        let dir = efs.mkdir("/d", 0o755).unwrap();
        efs.mkdir("/d/sub", 0o755).unwrap();
        efs.link("/d", "/alias").unwrap();

        assert_eq!(efs.rename("/d", "/alias/sub/x"), Err(Error::InvalidPath));
        assert_eq!(efs.resolve_path("/d"), Ok(dir));
        assert!(efs.resolve_path("/alias/sub/x").is_err());
    }

    #[test]
    fn times_and_mode() {
        let mut efs = volume();
        efs.mknod("/f", 0o644).unwrap();

        efs.set_times("/f", 100, 200).unwrap();
        let stat = efs.stat("/f").unwrap();
        assert_eq!((stat.atime, stat.mtime), (100, 200));

        efs.chmod("/f", 0o400).unwrap();
        let stat = efs.stat("/f").unwrap();
        assert_eq!(stat.mode, Stat::S_IFREG | 0o400);
        assert_eq!(stat.permissions(), 0o400);
    }

    #[test]
    fn access_mask() {
        let mut efs = volume();
        efs.mknod("/f", 0o640).unwrap();

        assert_eq!(efs.access("/f", BitFlags::empty()), Ok(()));
        assert_eq!(efs.access("/f", Access::Read.into()), Ok(()));
        assert_eq!(efs.access("/f", Access::Read | Access::Write), Ok(()));
        assert_eq!(
            efs.access("/f", Access::Read | Access::Execute),
            Err(Error::PermissionDenied)
        );
        assert_eq!(efs.access("/g", BitFlags::empty()), Err(Error::NotFound));
        assert_eq!(efs.access("/", Access::Execute.into()), Ok(()));
    }

    #[test]
    fn usage_counts() {
        let mut efs = volume();
        let fresh = efs.usage();
        assert_eq!(fresh.used_blocks, 3);
        assert_eq!(fresh.used_inodes, 1);
        assert_eq!(fresh.total_inodes, 102);

        efs.mknod("/f", 0o644).unwrap();
        let usage = efs.usage();
        assert_eq!(usage.used_blocks, 4);
        assert_eq!(usage.used_inodes, 2);
        assert_eq!(efs.inode(ROOT_INODE).unwrap().size, 52);
    }
}
