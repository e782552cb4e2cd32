use std::path::{Path, PathBuf};

use log::info;
use tempfile::{tempdir, TempDir};

use zealdisk::disk::Registry;
use zealdisk::io::{BlockHandle, PartitionView};
use zealdisk::zealfs::Session;

//
// Helper functions
//

// A scratch directory for image files.
pub fn scratch_dir() -> TempDir {
    tempdir().expect("creating a temp directory for test images")
}

pub fn image_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

// Create an image with an MBR and one committed ZealFS partition, and
// return its path.
pub fn image_with_partition(dir: &TempDir, disk_size: u64, lba: u32, sectors: u32) -> PathBuf {
    info!("Creating a {disk_size} byte test image...");
    let path = image_path(dir, "partitioned.img");
    let mut registry = Registry::new();
    let index = registry
        .create_image(&path, disk_size, true)
        .expect("creating the test image");

    let disk = &mut registry.disks[index];
    let slot = disk
        .allocate_partition(lba, sectors)
        .expect("allocating the test partition");
    info!("Committing partition {slot}...");
    disk.write_changes().expect("committing the test partition");
    path
}

// A ZealFS session over one partition of an image file.
pub fn session_for(path: &Path, lba: u32) -> Session<PartitionView> {
    let handle = BlockHandle::open(path).expect("opening the test image");
    Session::new(PartitionView::new(handle, lba))
}
