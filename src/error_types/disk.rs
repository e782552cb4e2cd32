// Errors pertaining to the disks themselves (probing and raw access).

use thiserror::Error;

#[derive(Debug, Error)]
/// Super-error about a physical disk or an image file.
pub enum DiskError {
    /// Windows refused to open the raw device.
    #[error("you must run this program as Administrator")]
    NotAdmin,
    /// Linux/Mac refused to open the raw device.
    #[error("you must run this program as root")]
    NotRoot,
    /// We refuse to touch anything this big, it is probably an internal drive.
    #[error("disk is {size_bytes} bytes, bigger than the 32 GiB limit")]
    TooLarge { size_bytes: u64 },
    /// The disk is too small to even hold an MBR.
    #[error("disk is only {size_bytes} bytes, not even one sector")]
    TooSmall { size_bytes: u64 },
    #[error("disk i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
