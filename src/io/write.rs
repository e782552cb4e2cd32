// Writing!

use std::fs::File;
use std::io::{Error, ErrorKind};

use crate::io::read::pread_exact;
use crate::io::SECTOR_SIZE;

#[cfg(unix)]
fn pwrite(file: &File, buffer: &[u8], offset: u64) -> std::io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.write_at(buffer, offset)
}

#[cfg(windows)]
fn pwrite(file: &File, buffer: &[u8], offset: u64) -> std::io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_write(buffer, offset)
}

/// Positional write that refuses to come back short.
fn pwrite_all(file: &File, mut buffer: &[u8], mut offset: u64) -> std::io::Result<()> {
    while !buffer.is_empty() {
        let put = pwrite(file, buffer, offset)?;
        if put == 0 {
            return Err(Error::new(ErrorKind::WriteZero, "short write to disk"));
        }
        buffer = &buffer[put..];
        offset += put as u64;
    }
    Ok(())
}

/// Write any (offset, len) request using only sector-aligned transfers.
///
/// The unaligned head and tail are classic read-modify-write: fetch the
/// sector, splice the new bytes in, put the sector back. The middle goes
/// straight down.
pub(super) fn write_unaligned(file: &File, offset: u64, buffer: &[u8]) -> std::io::Result<()> {
    let sector = SECTOR_SIZE as u64;
    let mut scratch = [0u8; SECTOR_SIZE];
    let mut remaining = buffer;
    let mut position = offset;

    // Unaligned head.
    let lead = (position % sector) as usize;
    if lead != 0 {
        let sector_start = position - lead as u64;
        pread_exact(file, &mut scratch, sector_start)?;
        let take = usize::min(SECTOR_SIZE - lead, remaining.len());
        scratch[lead..lead + take].copy_from_slice(&remaining[..take]);
        pwrite_all(file, &scratch, sector_start)?;
        remaining = &remaining[take..];
        position += take as u64;
    }

    // Aligned middle.
    let aligned_len = remaining.len() - remaining.len() % SECTOR_SIZE;
    if aligned_len > 0 {
        pwrite_all(file, &remaining[..aligned_len], position)?;
        remaining = &remaining[aligned_len..];
        position += aligned_len as u64;
    }

    // Unaligned tail: the sector we are about to modify is the one at
    // `position` exactly, since the middle left us sector-aligned.
    if !remaining.is_empty() {
        pread_exact(file, &mut scratch, position)?;
        scratch[..remaining.len()].copy_from_slice(remaining);
        pwrite_all(file, &scratch, position)?;
    }

    Ok(())
}
