// The list of disks the tool knows about.

use crate::disk::disk_struct::Disk;

/// We never track more than this many disks at once.
pub const MAX_DISKS: usize = 32;

/// Owns every known disk plus the current selection. Physical disks come
/// and go on refresh, loaded images stick around.
#[derive(Default)]
pub struct Registry {
    pub disks: Vec<Disk>,
    pub selected_disk: Option<usize>,
    pub selected_partition: usize,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }
}
