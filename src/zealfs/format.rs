// Formatting a fresh partition.

use log::debug;

use crate::error_types::fs::FsError;
use crate::helpers::size_str::{GIB, KIB, MIB};
use crate::zealfs::header_struct::{ZEALFS_MAGIC, ZEALFS_VERSION};

/// Recommended page size for a partition of the given byte size. Bigger
/// partitions get bigger pages so the page count stays under 64 Ki.
pub fn page_size_for(part_size_bytes: u64) -> u32 {
    if part_size_bytes <= 64 * KIB {
        256
    } else if part_size_bytes <= 256 * KIB {
        512
    } else if part_size_bytes <= MIB {
        1024
    } else if part_size_bytes <= 4 * MIB {
        2048
    } else if part_size_bytes <= 16 * MIB {
        4096
    } else if part_size_bytes <= 64 * MIB {
        8192
    } else if part_size_bytes <= 256 * MIB {
        16384
    } else if part_size_bytes <= GIB {
        32768
    } else {
        65536
    }
}

/// Write a blank filesystem into `buffer`.
///
/// Only the header page needs actual content: magic, version, sizing
/// fields, and the first bitmap byte with the reserved pages marked. The
/// FAT pages are all zeroes, which already means "end of chain"
/// everywhere, so the pre-zeroed buffer covers them. The buffer must hold
/// at least three pages (header plus the biggest possible FAT), which is
/// also exactly what gets staged for a new partition.
pub fn format(buffer: &mut [u8], part_size_bytes: u64) -> Result<(), FsError> {
    let page_size = page_size_for(part_size_bytes);
    // The encoded code is log2(page_size / 256).
    let page_size_code = (page_size.trailing_zeros() - 8) as u8;

    // At most 64 Ki pages are addressable, anything past that is ignored.
    let total_pages = u64::min(part_size_bytes / page_size as u64, 64 * KIB);
    let bitmap_size = (total_pages / 8) as u16;
    if bitmap_size == 0 {
        // Fewer than 8 pages, nothing useful fits.
        return Err(FsError::NoSpace);
    }

    let fat_pages: u32 = if page_size == 256 { 1 } else { 2 };
    // The header page and the FAT pages are never free. Every other count
    // derives from what the bitmap can track.
    let free_pages = (bitmap_size as u32 * 8 - 1 - fat_pages) as u16;

    assert!(
        buffer.len() >= 3 * page_size as usize,
        "format needs a buffer of at least three pages"
    );

    // Start from a clean slate in case the buffer is being re-formatted.
    buffer[..3 * page_size as usize].fill(0);

    buffer[0] = ZEALFS_MAGIC;
    buffer[1] = ZEALFS_VERSION;
    buffer[2..2 + 2].copy_from_slice(&bitmap_size.to_le_bytes());
    buffer[4..4 + 2].copy_from_slice(&free_pages.to_le_bytes());
    buffer[6] = page_size_code;
    // Pages 0 and 1 are taken (header, FAT), page 2 as well when the FAT
    // needs two pages.
    buffer[7] = 3 | if fat_pages > 1 { 4 } else { 0 };

    debug!("[zealfs] bitmap size: {bitmap_size} bytes");
    debug!("[zealfs] page size: {page_size} bytes (code {page_size_code})");

    Ok(())
}
