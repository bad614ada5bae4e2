use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use block_dev::BlockDevice;
use memmap2::MmapMut;
use neat_fs::BLOCK_SIZE;

/// A volume image on the host, mapped into memory as a whole.
#[derive(Debug)]
pub struct ImageFile {
    mmap: MmapMut,
}

impl ImageFile {
    /// Maps the image at `path`. A missing or empty file is created with
    /// room for `block_count` blocks; an existing image keeps its size.
    pub fn open(path: &Path, block_count: u32) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if fd.metadata()?.len() == 0 {
            let len = block_count as u64 * BLOCK_SIZE as u64;
            log::info!("creating image {path:?}: {block_count} blocks");
            fd.set_len(len)?;
        }

        // SAFETY: the image is not expected to be changed by anyone else
        // while it is mapped
        let mmap = unsafe { MmapMut::map_mut(&fd)? };
        Ok(Self { mmap })
    }
}

impl BlockDevice for ImageFile {
    #[inline]
    fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    #[inline]
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    fn flush(&mut self) -> io::Result<()> {
        self.mmap.flush()
    }
}
