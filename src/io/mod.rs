// Raw byte access to disks and image files.
//
// Raw block devices on some platforms (macOS character disks in
// particular) only accept sector-aligned transfers, so every request is
// split into an aligned middle plus scratch-sector work at both ends.
// Image files would not need this, but the envelope is correct for both.

pub mod handle_struct;
pub mod read;
pub mod write;
pub mod partition;

pub use handle_struct::BlockHandle;
pub use partition::PartitionView;

/// One sector. Everything the handle does is carved into these.
pub const SECTOR_SIZE: usize = 512;

/// Random access byte I/O, scoped to whatever the implementor decides
/// address 0 means. The ZealFS session is generic over this so it can run
/// against a partition on a real disk or a plain buffer in tests.
pub trait BlockProvider {
    /// Fill `buffer` from `addr`. Short reads are errors.
    fn read_at(&mut self, addr: u32, buffer: &mut [u8]) -> std::io::Result<()>;
    /// Write all of `buffer` at `addr`. Short writes are errors.
    fn write_at(&mut self, addr: u32, buffer: &[u8]) -> std::io::Result<()>;
}
