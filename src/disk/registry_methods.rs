// Registry operations: enumeration, images, selection.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{info, warn};

use crate::disk::disk_struct::{Disk, MAX_DISK_SIZE};
use crate::disk::probe;
use crate::disk::registry_struct::{Registry, MAX_DISKS};
use crate::error_types::disk::DiskError;
use crate::error_types::editor::RegistryError;
use crate::io::SECTOR_SIZE;
use crate::mbr::mbr_methods::{has_mbr_signature, set_mbr_signature};
use crate::mbr::mbr_struct::Partition;

impl Registry {
    pub fn current_disk(&self) -> Option<&Disk> {
        self.selected_disk.and_then(|i| self.disks.get(i))
    }

    pub fn current_disk_mut(&mut self) -> Option<&mut Disk> {
        match self.selected_disk {
            Some(i) => self.disks.get_mut(i),
            None => None,
        }
    }

    /// The staged view of the selected partition on the selected disk.
    pub fn current_partition(&self) -> Option<&Partition> {
        self.current_disk()
            .and_then(|d| d.staged_partitions.get(self.selected_partition))
    }

    /// Change the selection. Refused while the current disk has pending
    /// edits, switching away would silently lose them.
    pub fn select_disk(&mut self, index: usize) -> Result<(), RegistryError> {
        if index >= self.disks.len() {
            return Err(RegistryError::NoSuchDisk);
        }
        if let Some(current) = self.current_disk() {
            if !current.can_be_switched() {
                return Err(RegistryError::StagedChangesPresent);
            }
        }
        self.selected_disk = Some(index);
        self.selected_partition = 0;
        Ok(())
    }

    /// Re-enumerate the physical disks. Loaded images survive and get
    /// re-appended behind them.
    pub fn refresh(&mut self) -> Result<(), RegistryError> {
        if let Some(current) = self.current_disk() {
            if current.has_staged_changes {
                warn!("[disk] cannot refresh: staged changes present");
                return Err(RegistryError::StagedChangesPresent);
            }
        }

        // Keep the loaded images aside while the physical list rebuilds.
        let images: Vec<Disk> = std::mem::take(&mut self.disks)
            .into_iter()
            .filter(|d| d.is_image)
            .collect();

        let mut disks: Vec<Disk> = Vec::new();
        for path in probe::candidate_paths() {
            if disks.len() >= MAX_DISKS {
                break;
            }
            if let Some(disk) = probe::probe_device(&path)? {
                info!("[disk] refreshed disk: {}", disk.label());
                disks.push(disk);
            }
        }

        for image in images {
            if disks.len() >= MAX_DISKS {
                warn!("[disk] maximum number of disks reached while restoring images");
                break;
            }
            info!("[disk] refreshed image: {}", image.label());
            disks.push(image);
        }

        self.disks = disks;
        // Default to the first valid disk, if any.
        self.selected_disk = self.disks.iter().position(|d| d.valid);
        self.selected_partition = 0;

        if self.disks.is_empty() {
            info!("[disk] no disk found");
        } else {
            info!("[disk] disk list refreshed, {} entries", self.disks.len());
        }
        Ok(())
    }

    /// Is this image path already in the list?
    fn image_opened(&self, path: &Path) -> bool {
        self.disks.iter().any(|d| d.is_image && d.path == path)
    }

    /// Load an existing image file into the registry. Returns its index.
    pub fn load_image(&mut self, path: &Path) -> Result<usize, RegistryError> {
        if self.disks.len() >= MAX_DISKS {
            return Err(RegistryError::TooManyDisks);
        }
        if self.image_opened(path) {
            return Err(RegistryError::ImageAlreadyOpened);
        }

        let mut file = File::open(path).map_err(DiskError::from)?;
        let size_bytes = file.seek(SeekFrom::End(0)).map_err(DiskError::from)?;
        if size_bytes > MAX_DISK_SIZE {
            return Err(RegistryError::Disk(DiskError::TooLarge { size_bytes }));
        }
        if size_bytes < SECTOR_SIZE as u64 {
            return Err(RegistryError::Disk(DiskError::TooSmall { size_bytes }));
        }

        let mut disk = Disk::blank(path.to_path_buf());
        disk.size_bytes = size_bytes;
        disk.valid = true;
        disk.is_image = true;

        file.seek(SeekFrom::Start(0)).map_err(DiskError::from)?;
        file.read_exact(&mut disk.mbr).map_err(DiskError::from)?;
        disk.has_mbr = has_mbr_signature(&disk.mbr);
        disk.parse_mbr_partitions();

        info!("[disk] image loaded: {}", disk.label());
        self.disks.push(disk);
        let index = self.disks.len() - 1;
        if self.selected_disk.is_none() {
            self.selected_disk = Some(index);
        }
        Ok(index)
    }

    /// Create a fresh image file of exactly `size` bytes (sparse where
    /// the filesystem allows), optionally with a blank MBR, and register
    /// it. Returns its index.
    pub fn create_image(
        &mut self,
        path: &Path,
        size: u64,
        with_mbr: bool,
    ) -> Result<usize, RegistryError> {
        if self.disks.len() >= MAX_DISKS {
            return Err(RegistryError::TooManyDisks);
        }
        if self.image_opened(path) {
            return Err(RegistryError::ImageAlreadyOpened);
        }
        if size < SECTOR_SIZE as u64 {
            return Err(RegistryError::Disk(DiskError::TooSmall { size_bytes: size }));
        }

        let mut mbr = [0u8; SECTOR_SIZE];
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(DiskError::from)?;

        if with_mbr {
            set_mbr_signature(&mut mbr);
            file.write_all(&mbr).map_err(DiskError::from)?;
        }
        // Extend to the requested size without writing the body.
        file.set_len(size).map_err(DiskError::from)?;

        let mut disk = Disk::blank(path.to_path_buf());
        disk.size_bytes = size;
        disk.valid = true;
        disk.is_image = true;
        disk.has_mbr = with_mbr;
        if with_mbr {
            disk.mbr = mbr;
        }
        disk.parse_mbr_partitions();

        info!("[disk] image created: {}", disk.label());
        self.disks.push(disk);
        let index = self.disks.len() - 1;
        if self.selected_disk.is_none() {
            self.selected_disk = Some(index);
        }
        Ok(index)
    }
}
