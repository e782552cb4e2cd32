// Command line inspector for disks and images. The graphical shell lives
// elsewhere, this binary is the quickest way to eyeball what the library
// sees on a disk.

use std::path::PathBuf;
use std::process::ExitCode;

use zealdisk::disk::{Disk, Registry};
use zealdisk::error_types::disk::DiskError;
use zealdisk::error_types::editor::RegistryError;
use zealdisk::helpers::hex_view::hex_view;
use zealdisk::helpers::size_str::size_str;
use zealdisk::io::{BlockHandle, PartitionView, SECTOR_SIZE};
use zealdisk::mbr::mbr_methods::fs_type_name;
use zealdisk::zealfs::Session;

fn print_partition_table(disk: &Disk) {
    println!("{}", disk.label());
    println!("  {:<10} {:<22} {:<14} {:>12}", "Partition", "File System (Type)", "Start address", "Size");
    for (i, part) in disk.staged_partitions.iter().enumerate() {
        if !part.active || part.size_sectors == 0 {
            continue;
        }
        println!(
            "  {:<10} {:<22} {:#012x} {:>12}",
            i,
            fs_type_name(part.part_type),
            part.start_lba as u64 * SECTOR_SIZE as u64,
            size_str(part.size_bytes()),
        );
    }
}

// List the root directory of the first ZealFS partition, if any.
fn print_zealfs_root(disk: &Disk) {
    let Some(part) = disk.staged_partitions.iter().find(|p| p.is_valid_zealfs()) else {
        return;
    };

    let handle = match BlockHandle::open(&disk.path) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("could not open {}: {err}", disk.path.display());
            return;
        }
    };

    let mut session = Session::new(PartitionView::new(handle, part.start_lba));
    let listing = session
        .opendir("/")
        .and_then(|root| session.readdir(&root, 64));
    match listing {
        Ok(entries) => {
            println!("  ZealFS root directory:");
            for entry in entries {
                let kind = if entry.is_directory() { "dir " } else { "file" };
                println!("    {kind} {:>10}  {}", entry.size, entry.name_string());
            }
            if let Ok(free) = session.free_space() {
                println!("  Free space: {}", size_str(free));
            }
        }
        Err(err) => eprintln!("  could not read the ZealFS partition: {err}"),
    }
}

fn inspect_image(path: PathBuf) -> ExitCode {
    let mut registry = Registry::new();
    let index = match registry.load_image(&path) {
        Ok(index) => index,
        Err(err) => {
            eprintln!("could not load {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let disk = &registry.disks[index];
    print_partition_table(disk);
    println!("{}", hex_view(&disk.mbr));
    print_zealfs_root(disk);
    ExitCode::SUCCESS
}

fn inspect_devices() -> ExitCode {
    let mut registry = Registry::new();
    match registry.refresh() {
        Ok(()) => {}
        Err(RegistryError::Disk(err @ (DiskError::NotRoot | DiskError::NotAdmin))) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            eprintln!("could not enumerate disks: {err}");
            return ExitCode::FAILURE;
        }
    }

    if registry.disks.is_empty() {
        println!("No disk found.");
        return ExitCode::SUCCESS;
    }
    for disk in &registry.disks {
        print_partition_table(disk);
        print_zealfs_root(disk);
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    match std::env::args().nth(1) {
        Some(path) => inspect_image(PathBuf::from(path)),
        None => inspect_devices(),
    }
}
