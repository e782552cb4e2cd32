// The partition sizes offered when creating a new partition.

use crate::disk::disk_struct::Disk;
use crate::helpers::size_str::{GIB, KIB, MIB};

/// The menu of valid partition sizes, powers of two from 32 KiB to 4 GiB.
pub const PARTITION_SIZE_OPTIONS: [(&str, u64); 18] = [
    ("32KiB", 32 * KIB),
    ("64KiB", 64 * KIB),
    ("128KiB", 128 * KIB),
    ("256KiB", 256 * KIB),
    ("512KiB", 512 * KIB),
    ("1MiB", MIB),
    ("2MiB", 2 * MIB),
    ("4MiB", 4 * MIB),
    ("8MiB", 8 * MIB),
    ("16MiB", 16 * MIB),
    ("32MiB", 32 * MIB),
    ("64MiB", 64 * MIB),
    ("128MiB", 128 * MIB),
    ("256MiB", 256 * MIB),
    ("512MiB", 512 * MIB),
    ("1GiB", GIB),
    ("2GiB", 2 * GIB),
    ("4GiB", 4 * GIB),
];

/// How many of the size options fit in the disk's largest free gap once
/// its start is aligned, and where that gap begins. A hosting UI shows
/// exactly this prefix of the menu.
pub fn valid_option_count(disk: &Disk, align: u64) -> (usize, u64) {
    let (max_bytes, start_addr) = disk.max_partition_size(align);
    let count = PARTITION_SIZE_OPTIONS
        .iter()
        .take_while(|(_, bytes)| *bytes <= max_bytes)
        .count();
    (count, start_addr)
}
