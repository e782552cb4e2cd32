// Reading!

use std::fs::File;
use std::io::{Error, ErrorKind};

use crate::io::SECTOR_SIZE;

#[cfg(unix)]
fn pread(file: &File, buffer: &mut [u8], offset: u64) -> std::io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buffer, offset)
}

#[cfg(windows)]
fn pread(file: &File, buffer: &mut [u8], offset: u64) -> std::io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buffer, offset)
}

/// Positional read that refuses to come back short.
pub(super) fn pread_exact(file: &File, mut buffer: &mut [u8], mut offset: u64) -> std::io::Result<()> {
    while !buffer.is_empty() {
        let got = pread(file, buffer, offset)?;
        if got == 0 {
            return Err(Error::new(ErrorKind::UnexpectedEof, "short read from disk"));
        }
        buffer = &mut buffer[got..];
        offset += got as u64;
    }
    Ok(())
}

/// Read any (offset, len) request using only sector-aligned transfers.
///
/// Three spans:
///  - an unaligned head, fetched through a scratch sector,
///  - a whole-sector middle, read straight into the caller's buffer,
///  - an unaligned tail, fetched through a scratch sector.
pub(super) fn read_unaligned(file: &File, offset: u64, buffer: &mut [u8]) -> std::io::Result<()> {
    let sector = SECTOR_SIZE as u64;
    let mut scratch = [0u8; SECTOR_SIZE];
    let mut remaining = buffer;
    let mut position = offset;

    // Unaligned head: round the offset down to its sector and copy out
    // the part we were actually asked for.
    let lead = (position % sector) as usize;
    if lead != 0 {
        pread_exact(file, &mut scratch, position - lead as u64)?;
        let take = usize::min(SECTOR_SIZE - lead, remaining.len());
        remaining[..take].copy_from_slice(&scratch[lead..lead + take]);
        remaining = &mut remaining[take..];
        position += take as u64;
    }

    // Aligned middle, straight into the destination.
    let aligned_len = remaining.len() - remaining.len() % SECTOR_SIZE;
    if aligned_len > 0 {
        pread_exact(file, &mut remaining[..aligned_len], position)?;
        remaining = &mut remaining[aligned_len..];
        position += aligned_len as u64;
    }

    // Unaligned tail: read the whole final sector, keep the prefix.
    if !remaining.is_empty() {
        pread_exact(file, &mut scratch, position)?;
        let take = remaining.len();
        remaining.copy_from_slice(&scratch[..take]);
    }

    Ok(())
}
