// Platform probing: which device paths are worth trying, and what is
// actually behind them.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::disk::disk_struct::{Disk, MAX_DISK_SIZE};
use crate::error_types::disk::DiskError;
use crate::helpers::size_str::GIB;
use crate::io::SECTOR_SIZE;
use crate::mbr::mbr_methods::has_mbr_signature;

/// Candidate raw device paths for this platform. Most will not exist,
/// probing sorts that out.
pub fn candidate_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        (b'a'..=b'z')
            .map(|c| PathBuf::from(format!("/dev/sd{}", c as char)))
            .collect()
    }
    #[cfg(target_os = "macos")]
    {
        // rdisk0 is the internal drive, skip it.
        (1..=32).map(|i| PathBuf::from(format!("/dev/rdisk{i}"))).collect()
    }
    #[cfg(windows)]
    {
        (0..32)
            .map(|i| PathBuf::from(format!(r"\\.\PhysicalDrive{i}")))
            .collect()
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
    {
        Vec::new()
    }
}

/// The error kind a privilege failure turns into on this platform.
fn privilege_error() -> DiskError {
    if cfg!(windows) {
        DiskError::NotAdmin
    } else {
        DiskError::NotRoot
    }
}

/// Try one candidate path.
///
/// Returns `Ok(None)` when there is simply nothing there. A permission
/// failure is reported, the whole enumeration is pointless without
/// privileges.
pub fn probe_device(path: &Path) -> Result<Option<Disk>, DiskError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            return Err(privilege_error());
        }
        Err(err) => {
            debug!("[disk] skipping {}: {err}", path.display());
            return Ok(None);
        }
    };

    let mut disk = Disk::blank(path.to_path_buf());

    // Seeking to the end gives the size for files and devices alike.
    disk.size_bytes = file.seek(SeekFrom::End(0))?;
    disk.valid = disk.size_bytes <= MAX_DISK_SIZE;
    if !disk.valid {
        warn!(
            "[disk] {} exceeds the {} GiB limit, marking invalid",
            path.display(),
            MAX_DISK_SIZE / GIB
        );
    }

    // Read sector 0 and look for the MBR signature.
    file.seek(SeekFrom::Start(0))?;
    let mut sector = [0u8; SECTOR_SIZE];
    match file.read_exact(&mut sector) {
        Ok(()) => {
            disk.mbr = sector;
            disk.has_mbr = has_mbr_signature(&sector);
        }
        Err(_) => {
            // Too small to even hold a boot sector. Leave it blank.
            disk.has_mbr = false;
        }
    }

    disk.parse_mbr_partitions();
    Ok(Some(disk))
}
