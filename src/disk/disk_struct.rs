// Everything we know about one disk, committed and staged.

use std::path::PathBuf;

use crate::helpers::size_str::{size_str, GIB};
use crate::io::SECTOR_SIZE;
use crate::mbr::mbr_struct::{Partition, MAX_PART_COUNT};

/// Disks bigger than this are hidden. Nobody is writing an 8-bit floppy
/// image onto their internal drive on purpose.
pub const MAX_DISK_SIZE: u64 = 32 * GIB;

/// A block device or a loaded image file.
///
/// The committed fields mirror what is on the disk right now. The staged
/// fields are the pending view the editor works on, they only reach the
/// disk on `write_changes`.
pub struct Disk {
    /// Display name, the basename for images.
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// False when the disk is too big to be safely edited.
    pub valid: bool,
    pub is_image: bool,

    /// Committed state.
    pub has_mbr: bool,
    pub mbr: [u8; SECTOR_SIZE],
    pub partitions: [Partition; MAX_PART_COUNT],

    /// Staged state.
    pub has_staged_changes: bool,
    pub staged_mbr: [u8; SECTOR_SIZE],
    pub staged_partitions: [Partition; MAX_PART_COUNT],
    /// Cached first free slot, None when the table is full. On a disk
    /// without an MBR only slot 0 is ever considered.
    pub free_part_idx: Option<usize>,
}

impl Disk {
    /// A blank record for the given path, to be filled by probing.
    pub fn blank(path: PathBuf) -> Disk {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Disk {
            name,
            path,
            size_bytes: 0,
            valid: false,
            is_image: false,
            has_mbr: false,
            mbr: [0u8; SECTOR_SIZE],
            partitions: Default::default(),
            has_staged_changes: false,
            staged_mbr: [0u8; SECTOR_SIZE],
            staged_partitions: Default::default(),
            free_part_idx: None,
        }
    }

    /// Display label. A leading `*` marks pending changes.
    pub fn label(&self) -> String {
        let marker = if self.has_staged_changes { '*' } else { ' ' };
        format!("{}{} ({})", marker, self.name, size_str(self.size_bytes))
    }

    /// Switching away from a disk with pending edits would lose them.
    pub fn can_be_switched(&self) -> bool {
        !self.has_staged_changes
    }

    pub fn size_sectors(&self) -> u64 {
        self.size_bytes / SECTOR_SIZE as u64
    }
}
