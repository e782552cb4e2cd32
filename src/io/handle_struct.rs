// A read-write handle onto a disk or an image file.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::Path;

use crate::io::{read, write};

pub struct BlockHandle {
    pub(super) file: File,
}

impl BlockHandle {
    /// Open the given disk or image for reading and writing.
    pub fn open(path: &Path) -> std::io::Result<BlockHandle> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(BlockHandle { file })
    }

    /// Total size in bytes. Seeking to the end works for both regular
    /// files and block devices, unlike metadata().len().
    pub fn size_bytes(&mut self) -> std::io::Result<u64> {
        self.file.seek(SeekFrom::End(0))
    }

    /// Read `buffer.len()` bytes starting at `offset`. Any offset and any
    /// length are accepted, alignment is dealt with internally.
    pub fn read_at(&self, offset: u64, buffer: &mut [u8]) -> std::io::Result<()> {
        read::read_unaligned(&self.file, offset, buffer)
    }

    /// Write all of `buffer` starting at `offset`. Any offset and any
    /// length are accepted, alignment is dealt with internally.
    pub fn write_at(&self, offset: u64, buffer: &[u8]) -> std::io::Result<()> {
        write::write_unaligned(&self.file, offset, buffer)
    }
}
