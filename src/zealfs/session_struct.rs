// A session binds the engine to one partition.

use crate::error_types::fs::FsError;
use crate::io::BlockProvider;
use crate::zealfs::entry_struct::DirEntry;
use crate::zealfs::header_struct::Header;

/// An opened file: the entry as last seen plus where it lives on disk,
/// so `flush` can put the updated entry back.
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub entry: DirEntry,
    pub entry_addr: u32,
}

/// An opened directory: the address of its first entry array. For the
/// root that points into page 0 right after the header, for every other
/// directory it is the start of its first page.
#[derive(Debug, Clone, Copy)]
pub struct DirHandle {
    pub entry_addr: u32,
}

/// One ZealFS session against one partition.
///
/// The header and FAT caches load lazily on the first operation, so a
/// freshly built session is cheap. Every mutating operation writes its
/// changes through before returning, there is no dirty tracking.
pub struct Session<P: BlockProvider> {
    pub(super) provider: P,
    pub(super) mounted: Option<Mounted>,
}

/// The cached on-disk state of a mounted partition.
pub(super) struct Mounted {
    pub header: Header,
    /// Next-page links, one per page, 0 terminates a chain.
    pub fat: Vec<u16>,
}

impl Mounted {
    /// Byte address of a page inside the partition.
    pub fn page_addr(&self, page: u16) -> u32 {
        (page as u32) << (8 + self.header.page_size_code)
    }

    /// Follow the FAT one step. A link outside the cached table means the
    /// disk is damaged.
    pub fn next_page(&self, page: u16) -> Result<u16, FsError> {
        self.fat
            .get(page as usize)
            .copied()
            .ok_or(FsError::Corrupted)
    }

    pub fn set_next(&mut self, page: u16, next: u16) -> Result<(), FsError> {
        match self.fat.get_mut(page as usize) {
            Some(slot) => {
                *slot = next;
                Ok(())
            }
            None => Err(FsError::Corrupted),
        }
    }
}

impl<P: BlockProvider> Session<P> {
    pub fn new(provider: P) -> Session<P> {
        Session {
            provider,
            mounted: None,
        }
    }

    /// Drop the cached header and FAT. The next operation re-reads them
    /// from disk.
    pub fn destroy(&mut self) {
        self.mounted = None;
    }
}
