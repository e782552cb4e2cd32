// Walking a path down the directory tree.

use crate::error_types::fs::FsError;
use crate::io::BlockProvider;
use crate::zealfs::entry_struct::{DirEntry, ENTRY_SIZE, NAME_MAX_LEN};
use crate::zealfs::session_struct::Mounted;

/// What a walk found.
pub(super) struct BrowseOut {
    /// Last page of the last directory reached. A creation that finds no
    /// free slot chains a fresh page onto this one.
    pub last_dir_page: u16,
    /// First free entry slot seen in the final directory, ready for a
    /// creation to fill.
    pub free_entry_addr: Option<u32>,
    /// The entry and its on-disk address, when the path resolved.
    pub found: Option<(DirEntry, u32)>,
}

/// Split a path into its components, ignoring empty ones so that
/// "/a//b/" and "/a/b" walk the same way.
pub(super) fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

/// Walk `path` from the root directory.
///
/// Missing intermediate components are a hard `NotFound`; a missing final
/// component comes back as `found: None` together with the free-slot
/// information a creation needs. Intermediate components that are not
/// directories fail with `NotDirectory` rather than having their file
/// data misread as an entry array.
pub(super) fn browse_path<P: BlockProvider>(
    provider: &mut P,
    mounted: &Mounted,
    path: &str,
) -> Result<BrowseOut, FsError> {
    let comps = components(path);
    if comps.is_empty() {
        // The root itself is not an entry, callers special-case it.
        return Err(FsError::NotFound);
    }

    let header = &mounted.header;
    let mut entries_addr = header.root_dir_addr();
    let mut max_entries = header.root_dir_max_entries();
    let mut current_page: u16 = 0;

    let mut out = BrowseOut {
        last_dir_page: 0,
        free_entry_addr: None,
        found: None,
    };

    let mut comp_idx = 0;
    'component: loop {
        let comp = comps[comp_idx];
        if comp.len() > NAME_MAX_LEN {
            return Err(FsError::NameTooLong);
        }
        let is_last = comp_idx == comps.len() - 1;

        // Cycle guard while hopping through this directory's pages.
        let mut pages_walked: u32 = 0;

        loop {
            // Read this page's whole entry array in one go.
            let mut raw = vec![0u8; max_entries * ENTRY_SIZE];
            provider.read_at(entries_addr, &mut raw)?;

            for i in 0..max_entries {
                let entry = DirEntry::from_bytes(&raw[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE]);
                if !entry.is_occupied() {
                    // Only slots in the final directory are useful to
                    // remember, and only the first one.
                    if is_last && out.free_entry_addr.is_none() {
                        out.free_entry_addr = Some(entries_addr + (i * ENTRY_SIZE) as u32);
                    }
                    continue;
                }
                if !entry.name_matches(comp) {
                    continue;
                }
                if is_last {
                    out.found = Some((entry, entries_addr + (i * ENTRY_SIZE) as u32));
                    return Ok(out);
                }
                if !entry.is_directory() {
                    return Err(FsError::NotDirectory);
                }
                // Descend into the matched directory.
                current_page = entry.start_page;
                entries_addr = mounted.page_addr(current_page);
                max_entries = header.dir_max_entries();
                out.last_dir_page = current_page;
                comp_idx += 1;
                continue 'component;
            }

            // Every entry in this page was tested, follow the chain.
            let next = mounted.next_page(current_page)?;
            if next == 0 {
                if is_last {
                    // Not found, but the caller gets the free-slot info.
                    return Ok(out);
                }
                return Err(FsError::NotFound);
            }
            pages_walked += 1;
            if pages_walked > header.total_pages() {
                return Err(FsError::Corrupted);
            }
            current_page = next;
            out.last_dir_page = next;
            max_entries = header.dir_max_entries();
            entries_addr = mounted.page_addr(next);
        }
    }
}
