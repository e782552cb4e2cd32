// Errors for the ZealFS v2 engine.

use thiserror::Error;

#[derive(Debug, Error)]
/// Filesystem-level errors. These mirror the classic errno family the
/// 8-bit OS side expects, but as a proper enum.
pub enum FsError {
    #[error("no such file or directory")]
    NotFound,
    #[error("entry already exists")]
    Exists,
    #[error("is a directory")]
    IsDirectory,
    #[error("not a directory")]
    NotDirectory,
    #[error("directory is not empty")]
    NotEmpty,
    #[error("name is longer than 16 bytes")]
    NameTooLong,
    #[error("no space left in the partition")]
    NoSpace,
    /// Writes may only extend a chain one page past its end.
    #[error("seek past the end of the page chain")]
    SeekOutOfRange,
    /// The root directory cannot be removed or opened as a file.
    #[error("operation not permitted on the root directory")]
    RootDirectory,
    /// Bad magic, bad version, or a FAT reference that runs off the bitmap.
    #[error("filesystem structures are corrupted")]
    Corrupted,
    #[error("partition i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
