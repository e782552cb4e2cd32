use std::fs;

use log::info;
// We want to see logs while testing.
use test_log::test;

use zealdisk::disk::Registry;
use zealdisk::error_types::editor::RegistryError;
use zealdisk::mbr::mbr_struct::{MBR_PART_ENTRY_BEGIN, ZEALFS_TYPE};

pub mod test_common;

#[test]
// The full first-run flow: new image, new partition, commit, then check
// every byte that should have hit the disk.
fn create_partition_on_a_fresh_image() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_path(&dir, "fresh.img");

    let mut registry = Registry::new();
    let index = registry
        .create_image(&path, 2 * 1048576, true)
        .expect("creating a 2 MiB image");

    // 1 MiB aligned placement: the gap starts at LBA 1 and rounds up to
    // LBA 2048, leaving just under 1 MiB for the partition.
    let disk = &mut registry.disks[index];
    let (max_bytes, addr) = disk.max_partition_size(1048576);
    assert_eq!(addr, 1048576, "the aligned gap starts at 1 MiB");
    assert_eq!(max_bytes, 1048576, "one aligned MiB is available");
    let slot = disk
        .allocate_partition(2048, 2046)
        .expect("allocating the partition");
    assert_eq!(slot, 0, "first slot on a fresh image");
    disk.write_changes().expect("committing");
    assert!(!disk.has_staged_changes, "commit clears the pending flag");
    assert!(
        disk.staged_partitions[0].data.is_none(),
        "the staged buffer was consumed by the commit"
    );
    assert!(disk.partitions[0].active, "committed table has the partition");

    // Now verify the raw bytes.
    let image = fs::read(&path).expect("reading the image back");
    assert_eq!(image.len(), 2 * 1048576, "image size is exact");
    assert_eq!(image[510], 0x55, "MBR signature low byte");
    assert_eq!(image[511], 0xAA, "MBR signature high byte");

    let entry = &image[MBR_PART_ENTRY_BEGIN..MBR_PART_ENTRY_BEGIN + 16];
    assert_eq!(entry[4], ZEALFS_TYPE, "slot 0 is typed ZealFS");
    assert_eq!(&entry[8..12], &2048u32.to_le_bytes(), "start LBA");
    assert_eq!(&entry[12..16], &2046u32.to_le_bytes(), "sector count");

    // The partition starts with a valid header: 2046 sectors is just
    // under 1 MiB, so 1 KiB pages (code 2), 127 bitmap bytes, and
    // 127 * 8 - 3 = 1013 free pages.
    let part = &image[2048 * 512..];
    assert_eq!(part[0], b'Z', "filesystem magic");
    assert_eq!(part[1], 2, "filesystem version");
    assert_eq!(&part[2..4], &127u16.to_le_bytes(), "bitmap size");
    assert_eq!(&part[4..6], &1013u16.to_le_bytes(), "free pages");
    assert_eq!(part[6], 2, "page size code");
    assert_eq!(part[7], 0b111, "header and FAT pages marked allocated");
}

#[test]
// A committed image must parse back to the same partition table.
fn committed_image_reloads() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_with_partition(&dir, 16 * 1048576, 2048, 8192);

    let mut registry = Registry::new();
    let index = registry.load_image(&path).expect("loading the image");
    let disk = &registry.disks[index];

    assert!(disk.has_mbr, "the signature must be detected");
    let part = &disk.partitions[0];
    assert!(part.is_valid_zealfs(), "slot 0 parses as ZealFS");
    assert_eq!(part.start_lba, 2048);
    assert_eq!(part.size_sectors, 8192);
    assert_eq!(disk.free_part_idx, Some(1), "three slots left");
}

#[test]
fn revert_discards_staged_partitions() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_with_partition(&dir, 16 * 1048576, 2048, 8192);

    let mut registry = Registry::new();
    let index = registry.load_image(&path).expect("loading the image");
    let disk = &mut registry.disks[index];
    let committed_mbr = disk.mbr;

    info!("Staging a second partition, then changing our mind...");
    let _ = disk
        .allocate_partition(16384, 4096)
        .expect("staging a second partition");
    assert!(disk.has_staged_changes, "allocation is pending");

    disk.revert_changes();
    assert!(!disk.has_staged_changes, "revert clears the flag");
    assert_eq!(
        disk.staged_mbr.to_vec(),
        committed_mbr.to_vec(),
        "staged MBR is back to the committed bytes"
    );
    assert!(
        !disk.staged_partitions[1].active,
        "the staged partition is gone"
    );
    assert!(
        disk.staged_partitions.iter().all(|p| p.data.is_none()),
        "no staged buffers survive a revert"
    );

    // The image file itself was never touched by the staging.
    let image = fs::read(&path).expect("reading the image back");
    assert_eq!(
        &image[..512],
        &committed_mbr[..],
        "sector 0 on disk never changed"
    );
}

#[test]
fn refresh_refuses_with_pending_changes() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_path(&dir, "pending.img");

    let mut registry = Registry::new();
    let index = registry
        .create_image(&path, 1048576, true)
        .expect("creating the image");
    assert_eq!(registry.selected_disk, Some(index), "the image is selected");

    let disk = &mut registry.disks[index];
    let _ = disk
        .allocate_partition(2048, 1024)
        .expect("staging a partition");

    match registry.refresh() {
        Err(RegistryError::StagedChangesPresent) => {}
        other => panic!("refresh must refuse while edits are pending, got {other:?}"),
    }
}

#[test]
fn duplicate_images_are_rejected() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_path(&dir, "dup.img");

    let mut registry = Registry::new();
    let _ = registry
        .create_image(&path, 1048576, true)
        .expect("creating the image");
    match registry.load_image(&path) {
        Err(RegistryError::ImageAlreadyOpened) => {}
        other => panic!("expected ImageAlreadyOpened, got {other:?}"),
    }
}

#[test]
// An image created without an MBR can get one later, and the MBR goes to
// the disk immediately.
fn create_mbr_on_a_blank_image() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_path(&dir, "blank.img");

    let mut registry = Registry::new();
    let index = registry
        .create_image(&path, 1048576, false)
        .expect("creating a signature-less image");
    let disk = &mut registry.disks[index];
    assert!(!disk.has_mbr, "no signature was asked for");

    disk.create_mbr().expect("creating the MBR");
    assert!(disk.has_mbr, "the disk now has an MBR");
    assert!(!disk.has_staged_changes, "create_mbr commits immediately");
    assert_eq!(disk.free_part_idx, Some(0), "four empty slots");

    let image = fs::read(&path).expect("reading the image back");
    assert_eq!(image[510], 0x55, "signature low byte on disk");
    assert_eq!(image[511], 0xAA, "signature high byte on disk");
    assert!(
        image[..510].iter().all(|&b| b == 0),
        "the rest of sector 0 is zeroed"
    );
}

#[test]
// Images survive nothing here, but the selection guard must hold.
fn switching_away_from_pending_edits_is_refused() {
    let dir = test_common::scratch_dir();
    let path_a = test_common::image_path(&dir, "a.img");
    let path_b = test_common::image_path(&dir, "b.img");

    let mut registry = Registry::new();
    let index_a = registry
        .create_image(&path_a, 1048576, true)
        .expect("creating image a");
    let index_b = registry
        .create_image(&path_b, 1048576, true)
        .expect("creating image b");

    registry.select_disk(index_a).expect("selecting image a");
    let disk = registry.current_disk_mut().expect("a disk is selected");
    let _ = disk
        .allocate_partition(2048, 1024)
        .expect("staging a partition");

    match registry.select_disk(index_b) {
        Err(RegistryError::StagedChangesPresent) => {}
        other => panic!("switching must be refused, got {other:?}"),
    }

    // Reverting unblocks the switch.
    registry
        .current_disk_mut()
        .expect("a disk is selected")
        .revert_changes();
    registry.select_disk(index_b).expect("switching after revert");
}
