use log::info;
use rand::RngCore;
// We want to see logs while testing.
use test_log::test;

use zealdisk::error_types::fs::FsError;

pub mod test_common;

const MIB: u64 = 1048576;

#[test]
// Scenario: a 2 MiB file inside a 16 MiB partition, written, flushed,
// and read back through a fresh session over the same image file.
fn large_file_round_trip() {
    let dir = test_common::scratch_dir();
    // 17 MiB image so a full 16 MiB partition fits behind the MBR.
    let path = test_common::image_with_partition(&dir, 17 * MIB, 2048, (16 * MIB / 512) as u32);

    let mut session = test_common::session_for(&path, 2048);
    let free_before = session.free_space().expect("free space query");

    let mut fd = session.create("/big").expect("creating /big");
    let mut payload = vec![0u8; (2 * MIB) as usize];
    rand::rng().fill_bytes(&mut payload);

    info!("Writing 2 MiB...");
    let written = session.write(&mut fd, &payload, 0).expect("writing 2 MiB");
    assert_eq!(written, payload.len(), "the whole payload must be written");
    session.flush(&fd).expect("flushing");

    // 16 MiB partitions use 4 KiB pages. 2 MiB is exactly 512 pages, and
    // one of them was already allocated by the create.
    let free_after = session.free_space().expect("free space query");
    assert_eq!(
        free_before - free_after,
        2 * MIB,
        "2 MiB of pages are in use, file page included"
    );

    // A brand new session must see the same bytes from the disk.
    info!("Reading the file back through a fresh session...");
    let mut session = test_common::session_for(&path, 2048);
    let fd = session.open("/big").expect("reopening /big");
    assert_eq!(fd.entry.size as u64, 2 * MIB, "the size was flushed");

    let mut readback = vec![0u8; payload.len()];
    let got = session
        .read(&fd, &mut readback, 0)
        .expect("reading the payload back");
    assert_eq!(got, payload.len(), "the whole payload must come back");
    assert_eq!(readback, payload, "bytes survive the trip to disk");
}

#[test]
// Scenario: a small directory tree, listed back.
fn directory_hierarchy() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_with_partition(&dir, 2 * MIB, 2048, 2046);

    let mut session = test_common::session_for(&path, 2048);
    let _ = session.mkdir("/a").expect("mkdir /a");
    let _ = session.mkdir("/a/b").expect("mkdir /a/b");
    let _ = session.create("/a/b/c").expect("create /a/b/c");

    // Fresh session, straight off the disk.
    let mut session = test_common::session_for(&path, 2048);
    let handle = session.opendir("/a/b").expect("opendir /a/b");
    let entries = session.readdir(&handle, 64).expect("readdir /a/b");
    assert_eq!(entries.len(), 1, "exactly one entry");
    assert_eq!(entries[0].name_string(), "c");
    assert!(!entries[0].is_directory(), "c is a file");
    assert_eq!(entries[0].size, 0, "c is empty");
}

#[test]
// Scenario: unlink gives every page back.
fn unlink_reclaims_pages() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_with_partition(&dir, 2 * MIB, 2048, 2046);

    let mut session = test_common::session_for(&path, 2048);
    let free_before = session.free_space().expect("free space query");

    let mut fd = session.create("/doomed").expect("creating /doomed");
    let payload = vec![0xEEu8; 4 * 1024];
    let _ = session.write(&mut fd, &payload, 0).expect("writing 4 pages");
    session.flush(&fd).expect("flushing");

    session.unlink("/doomed").expect("unlinking");

    // Check through a fresh session so only on-disk state counts.
    let mut session = test_common::session_for(&path, 2048);
    assert_eq!(
        session.free_space().expect("free space query"),
        free_before,
        "all pages must be reclaimed on disk"
    );
    match session.open("/doomed") {
        Err(FsError::NotFound) => {}
        other => panic!("the entry must be gone, got {other:?}"),
    }
}

#[test]
// Scenario: rmdir refuses while a child exists, succeeds after.
fn rmdir_honours_children() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_with_partition(&dir, 2 * MIB, 2048, 2046);

    let mut session = test_common::session_for(&path, 2048);
    let _ = session.mkdir("/d").expect("mkdir /d");
    let _ = session.create("/d/x").expect("create /d/x");

    match session.rmdir("/d") {
        Err(FsError::NotEmpty) => {}
        other => panic!("expected NotEmpty, got {other:?}"),
    }

    session.unlink("/d/x").expect("removing the child");
    session.rmdir("/d").expect("removing the emptied directory");

    let mut session = test_common::session_for(&path, 2048);
    match session.opendir("/d") {
        Err(FsError::NotFound) => {}
        other => panic!("the directory must be gone, got {other:?}"),
    }
}

#[test]
// Writes at unaligned offsets go through the sector read-modify-write
// path of the block layer. Make sure nothing around the write is mangled.
fn unaligned_writes_leave_neighbours_alone() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_with_partition(&dir, 2 * MIB, 2048, 2046);

    let mut session = test_common::session_for(&path, 2048);
    let mut fd = session.create("/notes").expect("creating /notes");

    // A full page of a known pattern first.
    let base = vec![0x11u8; 1024];
    let _ = session.write(&mut fd, &base, 0).expect("writing the base");
    // Then 5 bytes right in the middle, nowhere near a sector boundary.
    let _ = session
        .write(&mut fd, b"hello", 100)
        .expect("writing the patch");
    session.flush(&fd).expect("flushing");

    let mut session = test_common::session_for(&path, 2048);
    let fd = session.open("/notes").expect("reopening /notes");
    let mut readback = vec![0u8; 1024];
    let _ = session
        .read(&fd, &mut readback, 0)
        .expect("reading the page back");

    assert_eq!(&readback[..100], &base[..100], "bytes before the patch");
    assert_eq!(&readback[100..105], b"hello", "the patch itself");
    assert_eq!(&readback[105..], &base[105..], "bytes after the patch");
}

#[test]
// Timestamps are stamped at creation in BCD.
fn created_entries_carry_a_bcd_timestamp() {
    let dir = test_common::scratch_dir();
    let path = test_common::image_with_partition(&dir, 2 * MIB, 2048, 2046);

    let mut session = test_common::session_for(&path, 2048);
    let fd = session.create("/dated").expect("creating /dated");

    let time = fd.entry.time;
    // Every field is BCD, so each nibble stays below ten.
    let fields = [
        time.year[0],
        time.year[1],
        time.month,
        time.day,
        time.weekday,
        time.hours,
        time.minutes,
        time.seconds,
    ];
    for field in fields {
        assert!(field >> 4 <= 9, "high nibble is a decimal digit");
        assert!(field & 0xF <= 9, "low nibble is a decimal digit");
    }
    assert_eq!(time.year[0], 0x20, "we are still in the 21st century");
    assert!(time.month >= 1, "months are one-based");
}
