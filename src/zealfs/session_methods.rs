// The filesystem operations themselves.
//
// Every mutating operation finishes its writes in the same order:
// data pages, then the directory entry, then the header/bitmap, then the
// FAT. An interruption mid-sequence can leak pages (allocated but
// unreferenced), it can never leave an entry pointing at freed pages.

use log::debug;

use crate::error_types::fs::FsError;
use crate::io::BlockProvider;
use crate::zealfs::browse::{browse_path, components, BrowseOut};
use crate::zealfs::entry_struct::{DirEntry, EntryFlags, EntryTime, ENTRY_SIZE, NAME_MAX_LEN};
use crate::zealfs::header_struct::{Header, HEADER_MAX_SIZE};
use crate::zealfs::session_struct::{DirHandle, FileHandle, Mounted, Session};

/// Read the header and FAT caches from the partition.
fn mount<P: BlockProvider>(provider: &mut P) -> Result<Mounted, FsError> {
    // In theory the header should be read in two steps, first the fixed
    // fields to learn the bitmap size, then the bitmap. Keep it simple
    // and read the potential maximum at once.
    let mut raw = vec![0u8; HEADER_MAX_SIZE];
    provider.read_at(0, &mut raw)?;
    let header = Header::from_bytes(&raw)?;

    // The FAT sits right behind the header page.
    let mut fat_raw = vec![0u8; header.fat_size_bytes() as usize];
    provider.read_at(header.page_size(), &mut fat_raw)?;
    let fat = fat_raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    debug!(
        "[zealfs] mounted: page size {}, {} free pages",
        header.page_size(),
        header.free_pages
    );
    Ok(Mounted { header, fat })
}

fn write_header<P: BlockProvider>(provider: &mut P, mounted: &Mounted) -> Result<(), FsError> {
    provider.write_at(0, &mounted.header.to_bytes())?;
    Ok(())
}

fn write_fat<P: BlockProvider>(provider: &mut P, mounted: &Mounted) -> Result<(), FsError> {
    let mut raw = Vec::with_capacity(mounted.fat.len() * 2);
    for link in &mounted.fat {
        raw.extend_from_slice(&link.to_le_bytes());
    }
    provider.write_at(mounted.header.page_size(), &raw)?;
    Ok(())
}

/// Allocate a page and link it behind `current` as the new chain tail.
fn allocate_next(mounted: &mut Mounted, current: u16) -> Result<u16, FsError> {
    let next = mounted.header.allocate_page().ok_or(FsError::NoSpace)?;
    mounted.set_next(next, 0)?;
    mounted.set_next(current, next)?;
    Ok(next)
}

impl<P: BlockProvider> Session<P> {
    /// Lazy mount: the first operation pays for loading the caches.
    fn state(&mut self) -> Result<(&mut P, &mut Mounted), FsError> {
        if self.mounted.is_none() {
            self.mounted = Some(mount(&mut self.provider)?);
        }
        match self.mounted.as_mut() {
            Some(mounted) => Ok((&mut self.provider, mounted)),
            None => Err(FsError::Corrupted),
        }
    }

    /// Free bytes: free pages times the page size.
    pub fn free_space(&mut self) -> Result<u64, FsError> {
        let (_, mounted) = self.state()?;
        Ok(mounted.header.free_pages as u64 * mounted.header.page_size() as u64)
    }

    /// Total bytes the bitmap can track.
    pub fn total_space(&mut self) -> Result<u64, FsError> {
        let (_, mounted) = self.state()?;
        Ok(mounted.header.total_pages() as u64 * mounted.header.page_size() as u64)
    }

    /// Open an existing file.
    pub fn open(&mut self, path: &str) -> Result<FileHandle, FsError> {
        let (provider, mounted) = self.state()?;
        if components(path).is_empty() {
            return Err(FsError::IsDirectory);
        }
        let info = browse_path(provider, mounted, path)?;
        let (entry, entry_addr) = info.found.ok_or(FsError::NotFound)?;
        if entry.is_directory() {
            return Err(FsError::IsDirectory);
        }
        Ok(FileHandle { entry, entry_addr })
    }

    /// Open a directory for listing.
    pub fn opendir(&mut self, path: &str) -> Result<DirHandle, FsError> {
        let (provider, mounted) = self.state()?;
        if components(path).is_empty() {
            return Ok(DirHandle {
                entry_addr: mounted.header.root_dir_addr(),
            });
        }
        let info = browse_path(provider, mounted, path)?;
        let (entry, _) = info.found.ok_or(FsError::NotFound)?;
        if !entry.is_directory() {
            return Err(FsError::NotDirectory);
        }
        Ok(DirHandle {
            entry_addr: mounted.page_addr(entry.start_page),
        })
    }

    /// Collect up to `max` occupied entries, in on-disk order, following
    /// the directory's page chain.
    pub fn readdir(&mut self, dir: &DirHandle, max: usize) -> Result<Vec<DirEntry>, FsError> {
        let (provider, mounted) = self.state()?;
        let header = &mounted.header;
        let is_root = dir.entry_addr == header.root_dir_addr();
        let mut max_entries = if is_root {
            header.root_dir_max_entries()
        } else {
            header.dir_max_entries()
        };
        let mut entries_addr = dir.entry_addr;
        let mut current_page = (entries_addr / header.page_size()) as u16;
        let mut filled = Vec::new();
        let mut pages_walked: u32 = 0;

        loop {
            let mut raw = vec![0u8; max_entries * ENTRY_SIZE];
            provider.read_at(entries_addr, &mut raw)?;

            for i in 0..max_entries {
                if filled.len() >= max {
                    return Ok(filled);
                }
                let entry = DirEntry::from_bytes(&raw[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE]);
                if entry.is_occupied() {
                    filled.push(entry);
                }
            }

            current_page = mounted.next_page(current_page)?;
            if current_page == 0 {
                return Ok(filled);
            }
            pages_walked += 1;
            if pages_walked > header.total_pages() {
                return Err(FsError::Corrupted);
            }
            max_entries = header.dir_max_entries();
            entries_addr = mounted.page_addr(current_page);
        }
    }

    /// Create an empty file.
    pub fn create(&mut self, path: &str) -> Result<FileHandle, FsError> {
        self.create_both(path, false)
    }

    /// Create an empty directory.
    pub fn mkdir(&mut self, path: &str) -> Result<FileHandle, FsError> {
        self.create_both(path, true)
    }

    fn create_both(&mut self, path: &str, is_dir: bool) -> Result<FileHandle, FsError> {
        let (provider, mounted) = self.state()?;

        let name = match components(path).last() {
            Some(last) => *last,
            // "/" always exists.
            None => return Err(FsError::Exists),
        };
        // Checked before anything is allocated, so a long name cannot
        // leak a page.
        if name.len() > NAME_MAX_LEN {
            return Err(FsError::NameTooLong);
        }

        let info = browse_path(provider, mounted, path)?;
        if info.found.is_some() {
            return Err(FsError::Exists);
        }

        // Snapshot the caches, a failed creation must leave them as
        // they were.
        let header_backup = mounted.header.clone();
        let fat_backup = mounted.fat.clone();

        let result = do_create(provider, mounted, &info, name, is_dir);
        if result.is_err() {
            mounted.header = header_backup;
            mounted.fat = fat_backup;
        }
        result
    }

    /// Read from an opened file. Requests past the end of the file are
    /// clamped, reading at or past `entry.size` returns 0 bytes.
    pub fn read(&mut self, fd: &FileHandle, buf: &mut [u8], offset: u32) -> Result<usize, FsError> {
        let (provider, mounted) = self.state()?;
        if buf.is_empty() || offset >= fd.entry.size {
            return Ok(0);
        }
        let page_size = mounted.header.page_size();
        let mut jump_pages = offset / page_size;
        let mut offset_in_page = (offset % page_size) as usize;
        let total = usize::min(buf.len(), (fd.entry.size - offset) as usize);

        let mut current_page = fd.entry.start_page;
        while jump_pages > 0 {
            current_page = mounted.next_page(current_page)?;
            if current_page == 0 {
                // The entry's size promised more pages than the chain has.
                return Err(FsError::Corrupted);
            }
            jump_pages -= 1;
        }

        let mut done = 0usize;
        while done < total {
            let count = usize::min(page_size as usize - offset_in_page, total - done);
            let addr = mounted.page_addr(current_page) + offset_in_page as u32;
            provider.read_at(addr, &mut buf[done..done + count])?;
            done += count;
            if done < total {
                current_page = mounted.next_page(current_page)?;
                if current_page == 0 {
                    return Err(FsError::Corrupted);
                }
            }
            offset_in_page = 0;
        }

        Ok(total)
    }

    /// Write to an opened file, growing its chain as needed.
    ///
    /// The caller must `flush` afterwards: the entry (with its updated
    /// size), the bitmap and the FAT only hit the disk on flush. Seeking
    /// more than one page past the current end of the chain is refused.
    pub fn write(&mut self, fd: &mut FileHandle, buf: &[u8], offset: u32) -> Result<usize, FsError> {
        let (provider, mounted) = self.state()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let page_size = mounted.header.page_size();
        let mut jump_pages = offset / page_size;
        let mut offset_in_page = (offset % page_size) as usize;
        let remaining_in_page = page_size as usize - offset_in_page;

        // Enough capacity? The landing page's free tail counts too.
        let free_bytes = mounted.header.free_pages as u64 * page_size as u64;
        if free_bytes + (remaining_in_page as u64) < buf.len() as u64 {
            return Err(FsError::NoSpace);
        }

        let mut current_page = fd.entry.start_page;
        while jump_pages > 0 {
            let next_page = mounted.next_page(current_page)?;
            if next_page == 0 {
                // The chain ends here. Growing by exactly one page is the
                // append case, anything further is a hole we don't allow.
                if jump_pages != 1 {
                    debug!("[zealfs] seek past the end of the chain, refusing");
                    return Err(FsError::SeekOutOfRange);
                }
                current_page = allocate_next(mounted, current_page)?;
            } else {
                current_page = next_page;
            }
            jump_pages -= 1;
        }

        let mut done = 0usize;
        while done < buf.len() {
            debug_assert!(
                current_page > 1,
                "data pages can never be the header or the FAT"
            );
            let count = usize::min(page_size as usize - offset_in_page, buf.len() - done);
            let addr = mounted.page_addr(current_page) + offset_in_page as u32;
            provider.write_at(addr, &buf[done..done + count])?;
            fd.entry.size += count as u32;
            done += count;

            let next_page = mounted.next_page(current_page)?;
            if next_page != 0 {
                current_page = next_page;
            } else if done < buf.len() {
                current_page = allocate_next(mounted, current_page)?;
            }
            offset_in_page = 0;
        }

        Ok(buf.len())
    }

    /// Push the entry, the header/bitmap and the FAT back to the disk.
    /// After this returns the on-disk state matches the caches.
    pub fn flush(&mut self, fd: &FileHandle) -> Result<(), FsError> {
        let (provider, mounted) = self.state()?;
        provider.write_at(fd.entry_addr, &fd.entry.to_bytes())?;
        write_header(provider, mounted)?;
        write_fat(provider, mounted)?;
        Ok(())
    }

    /// Remove a file (and only a file!).
    pub fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        let (provider, mounted) = self.state()?;
        if components(path).is_empty() {
            return Err(FsError::IsDirectory);
        }
        let info = browse_path(provider, mounted, path)?;
        let (entry, entry_addr) = info.found.ok_or(FsError::NotFound)?;
        if entry.is_directory() {
            return Err(FsError::IsDirectory);
        }

        // Hand every page of the chain back and cut its links.
        let mut page = entry.start_page;
        let mut pages_walked: u32 = 0;
        while page != 0 {
            mounted.header.free_page(page)?;
            let next = mounted.next_page(page)?;
            mounted.set_next(page, 0)?;
            page = next;
            pages_walked += 1;
            if pages_walked > mounted.header.total_pages() {
                return Err(FsError::Corrupted);
            }
        }

        provider.write_at(entry_addr, &DirEntry::empty().to_bytes())?;
        write_header(provider, mounted)?;
        write_fat(provider, mounted)?;
        Ok(())
    }

    /// Remove an empty directory.
    pub fn rmdir(&mut self, path: &str) -> Result<(), FsError> {
        let (provider, mounted) = self.state()?;
        if components(path).is_empty() {
            return Err(FsError::RootDirectory);
        }
        let info = browse_path(provider, mounted, path)?;
        let (entry, entry_addr) = info.found.ok_or(FsError::NotFound)?;
        if !entry.is_directory() {
            return Err(FsError::NotDirectory);
        }

        let max_entries = mounted.header.dir_max_entries();

        // First pass: the whole chain must be empty before anything is
        // freed, so a non-empty page deep in the chain cannot leave the
        // caches half-modified.
        let mut page = entry.start_page;
        let mut pages_walked: u32 = 0;
        while page != 0 {
            let mut raw = vec![0u8; max_entries * ENTRY_SIZE];
            provider.read_at(mounted.page_addr(page), &mut raw)?;
            for i in 0..max_entries {
                let slot = DirEntry::from_bytes(&raw[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE]);
                if slot.is_occupied() {
                    return Err(FsError::NotEmpty);
                }
            }
            page = mounted.next_page(page)?;
            pages_walked += 1;
            if pages_walked > mounted.header.total_pages() {
                return Err(FsError::Corrupted);
            }
        }

        // Second pass: free the chain.
        let mut page = entry.start_page;
        while page != 0 {
            let next = mounted.next_page(page)?;
            mounted.header.free_page(page)?;
            mounted.set_next(page, 0)?;
            page = next;
        }

        provider.write_at(entry_addr, &DirEntry::empty().to_bytes())?;
        write_header(provider, mounted)?;
        write_fat(provider, mounted)?;
        Ok(())
    }
}

/// The shared half of `create` and `mkdir`. The caches have already been
/// snapshotted by the caller, so this can bail anywhere.
fn do_create<P: BlockProvider>(
    provider: &mut P,
    mounted: &mut Mounted,
    info: &BrowseOut,
    name: &str,
    is_dir: bool,
) -> Result<FileHandle, FsError> {
    let page_size = mounted.header.page_size();

    // No free slot in the parent? Chain a fresh page onto it.
    let mut new_dir_page: Option<u16> = None;
    let entry_addr = match info.free_entry_addr {
        Some(addr) => addr,
        None => {
            let page = mounted.header.allocate_page().ok_or(FsError::NoSpace)?;
            mounted.set_next(page, 0)?;
            mounted.set_next(info.last_dir_page, page)?;
            new_dir_page = Some(page);
            mounted.page_addr(page)
        }
    };

    // The entry's own first page.
    let start_page = mounted.header.allocate_page().ok_or(FsError::NoSpace)?;
    mounted.set_next(start_page, 0)?;

    let mut flags = EntryFlags::Occupied;
    if is_dir {
        flags |= EntryFlags::IsDirectory;
    }
    let mut entry = DirEntry::empty();
    entry.flags = flags;
    entry.name[..name.len()].copy_from_slice(name.as_bytes());
    entry.start_page = start_page;
    // A directory's size is its own page, a file starts empty.
    entry.size = if is_dir { page_size } else { 0 };
    entry.time = EntryTime::now();

    // Clear the freshly allocated pages on disk before anything can
    // point at them.
    let zeroes = vec![0u8; page_size as usize];
    provider.write_at(mounted.page_addr(start_page), &zeroes)?;
    if let Some(page) = new_dir_page {
        provider.write_at(mounted.page_addr(page), &zeroes)?;
    }

    // Entry, then header, then FAT.
    provider.write_at(entry_addr, &entry.to_bytes())?;
    write_header(provider, mounted)?;
    write_fat(provider, mounted)?;

    debug!(
        "[zealfs] created {} at page {start_page}",
        entry.name_string()
    );
    Ok(FileHandle { entry, entry_addr })
}
