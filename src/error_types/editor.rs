// Errors for the staged partition editor and the disk registry.

use thiserror::Error;

use crate::error_types::disk::DiskError;

#[derive(Debug, Error)]
/// Errors raised while editing a disk's staged partition table.
pub enum EditorError {
    #[error("no free partition slot on this disk")]
    NoFreeSlot,
    #[error("partition {0} is out of bounds")]
    SlotOutOfRange(usize),
    #[error("partition {0} is not active")]
    NotActive(usize),
    #[error("the disk already has an MBR")]
    MbrPresent,
    #[error("the partition is too small to hold a filesystem")]
    PartitionTooSmall,
    /// Creating an MBR goes straight to disk, so nothing may be pending.
    #[error("the disk has staged changes, apply or revert them first")]
    StagedChangesPresent,
    #[error("the disk is not usable")]
    InvalidDisk,
    #[error(transparent)]
    Disk(#[from] DiskError),
}

#[derive(Debug, Error)]
/// Errors raised by the disk registry (enumeration and image management).
pub enum RegistryError {
    /// Refreshing would throw away the staged edits on the selected disk.
    #[error("the selected disk has staged changes, apply or revert them first")]
    StagedChangesPresent,
    #[error("maximum number of disks reached")]
    TooManyDisks,
    #[error("this image is already opened")]
    ImageAlreadyOpened,
    #[error("no such disk")]
    NoSuchDisk,
    #[error(transparent)]
    Disk(#[from] DiskError),
}
