// The staged partition editor.
//
// Every operation here touches only the staged view. Nothing reaches the
// disk until `write_changes`, and `revert_changes` throws the whole
// staged view away.

use log::{debug, info};

use crate::error_types::disk::DiskError;
use crate::error_types::editor::EditorError;
use crate::io::{BlockHandle, SECTOR_SIZE};
use crate::mbr::mbr_methods::set_mbr_signature;
use crate::mbr::mbr_struct::{
    Partition, MAX_PART_COUNT, MBR_PART_ENTRY_BEGIN, MBR_PART_ENTRY_SIZE, ZEALFS_TYPE,
};
use crate::zealfs::format::{format, page_size_for};
use crate::zealfs::header_struct::{ZEALFS_MAGIC, ZEALFS_VERSION};

use super::disk_struct::Disk;

/// Round `addr` up to the next multiple of `align` (a power of two).
fn align_up(addr: u64, align: u64) -> u64 {
    (addr + align - 1) & !(align - 1)
}

impl Disk {
    /// Populate the committed partition table from the MBR buffer and
    /// reset the staged view to match it.
    ///
    /// A disk without an MBR may still carry a single ZealFS filesystem
    /// covering the whole disk, recognised by magic and version in its
    /// first two bytes. Only slot 0 is usable on such a disk.
    pub fn parse_mbr_partitions(&mut self) {
        let mut free_part_idx = None;

        if !self.has_mbr {
            self.partitions = Default::default();
            if self.mbr[0] == ZEALFS_MAGIC && self.mbr[1] == ZEALFS_VERSION {
                self.partitions[0] = Partition {
                    active: true,
                    part_type: ZEALFS_TYPE,
                    start_lba: 0,
                    size_sectors: self.size_sectors() as u32,
                    data: None,
                };
            } else {
                // No filesystem here, the single slot is free.
                free_part_idx = Some(0);
            }
        } else {
            for i in 0..MAX_PART_COUNT {
                let begin = MBR_PART_ENTRY_BEGIN + i * MBR_PART_ENTRY_SIZE;
                let parsed = Partition::from_mbr_entry(&self.mbr[begin..begin + MBR_PART_ENTRY_SIZE]);
                if !parsed.active && free_part_idx.is_none() {
                    free_part_idx = Some(i);
                }
                self.partitions[i] = parsed;
            }
        }

        // Mirror everything into the staged view.
        self.staged_mbr = self.mbr;
        self.staged_partitions = self.partitions.clone();
        self.has_staged_changes = false;
        self.free_part_idx = free_part_idx;
    }

    /// First free slot in the staged table. Disks without an MBR only
    /// ever get slot 0.
    pub fn find_free_partition(&self) -> Option<usize> {
        if !self.has_mbr {
            return if self.staged_partitions[0].active {
                None
            } else {
                Some(0)
            };
        }
        self.staged_partitions.iter().position(|p| !p.active)
    }

    /// Largest gap between staged partitions, as `(bytes, start_addr)`.
    ///
    /// Sector 0 belongs to the MBR so the first gap starts at LBA 1. A
    /// disk without an MBR is one single gap from address 0.
    fn largest_free_space(&self) -> (u64, u64) {
        if !self.has_mbr {
            return (self.size_bytes, 0);
        }

        let disk_size_sectors = self.size_sectors();
        let mut largest_free: u64 = 0;
        let mut largest_start: u64 = 1;
        let mut previous_end: u64 = 1;

        // Walk the active partitions in LBA order and measure the gaps.
        let mut sorted: Vec<&Partition> =
            self.staged_partitions.iter().filter(|p| p.active).collect();
        sorted.sort_by_key(|p| p.start_lba);

        for part in sorted {
            let start = part.start_lba as u64;
            let end = start + part.size_sectors as u64;
            if start > previous_end {
                let gap = start - previous_end;
                if gap > largest_free {
                    largest_free = gap;
                    largest_start = previous_end;
                }
            }
            previous_end = end;
        }

        // The space behind the last partition counts too.
        let tail = disk_size_sectors.saturating_sub(previous_end);
        if tail > largest_free {
            largest_free = tail;
            largest_start = previous_end;
        }

        (
            largest_free * SECTOR_SIZE as u64,
            largest_start * SECTOR_SIZE as u64,
        )
    }

    /// Largest partition that fits after aligning the gap's start to
    /// `align` bytes. Returns `(usable_bytes, aligned_start_addr)`.
    pub fn max_partition_size(&self, align: u64) -> (u64, u64) {
        let (free_bytes, start_addr) = self.largest_free_space();
        let aligned_addr = align_up(start_addr, align);
        let wasted = aligned_addr - start_addr;
        (free_bytes.saturating_sub(wasted), aligned_addr)
    }

    /// Re-encode one staged slot into the staged MBR bytes.
    fn encode_staged_entry(&mut self, slot: usize) {
        let begin = MBR_PART_ENTRY_BEGIN + slot * MBR_PART_ENTRY_SIZE;
        let entry = self.staged_partitions[slot].to_mbr_entry();
        self.staged_mbr[begin..begin + MBR_PART_ENTRY_SIZE].copy_from_slice(&entry);
    }

    /// Stage a new ZealFS partition in the first free slot.
    ///
    /// The slot gets type 0x5A and a freshly formatted three-page buffer
    /// (header plus FAT) that will be written at `start_lba` on commit.
    /// Returns the slot index.
    pub fn allocate_partition(
        &mut self,
        lba: u32,
        sectors_count: u32,
    ) -> Result<usize, EditorError> {
        if !self.valid {
            return Err(EditorError::InvalidDisk);
        }
        let slot = match self.free_part_idx {
            Some(slot) if !self.has_mbr && slot > 0 => {
                debug!("[disk] slot {slot} unusable without an MBR");
                return Err(EditorError::NoFreeSlot);
            }
            Some(slot) if slot >= MAX_PART_COUNT => {
                return Err(EditorError::SlotOutOfRange(slot));
            }
            Some(slot) => slot,
            None => return Err(EditorError::NoFreeSlot),
        };

        let part_size_bytes = sectors_count as u64 * SECTOR_SIZE as u64;
        info!("[disk] allocating ZealFS in partition {slot}");

        let part = &mut self.staged_partitions[slot];
        debug_assert!(!part.active, "the cached free slot must be free");
        part.active = true;
        part.part_type = ZEALFS_TYPE;
        part.start_lba = lba;
        part.size_sectors = sectors_count;

        // Three pages cover the header and the largest possible FAT.
        let page_size = page_size_for(part_size_bytes) as usize;
        let mut data = vec![0u8; 3 * page_size];
        if format(&mut data, part_size_bytes).is_err() {
            // Undo the slot, the partition cannot hold a filesystem.
            self.staged_partitions[slot] = Partition::default();
            return Err(EditorError::PartitionTooSmall);
        }
        debug!("[disk] formatted {} bytes (3 pages)", 3 * page_size);
        self.staged_partitions[slot].data = Some(data);

        self.encode_staged_entry(slot);
        self.has_staged_changes = true;
        self.free_part_idx = self.find_free_partition();
        Ok(slot)
    }

    /// Re-format an existing staged partition in place. The LBA and size
    /// stay as they are, the slot becomes a ZealFS partition.
    pub fn format_partition(&mut self, slot: usize) -> Result<(), EditorError> {
        if !self.valid {
            return Err(EditorError::InvalidDisk);
        }
        if slot >= MAX_PART_COUNT {
            return Err(EditorError::SlotOutOfRange(slot));
        }
        if !self.staged_partitions[slot].active {
            return Err(EditorError::NotActive(slot));
        }

        let part_size_bytes = self.staged_partitions[slot].size_bytes();
        let page_size = page_size_for(part_size_bytes) as usize;
        let mut data = vec![0u8; 3 * page_size];
        if format(&mut data, part_size_bytes).is_err() {
            return Err(EditorError::PartitionTooSmall);
        }

        let part = &mut self.staged_partitions[slot];
        part.part_type = ZEALFS_TYPE;
        part.data = Some(data);
        // The type byte may have changed, keep the staged MBR in step.
        self.encode_staged_entry(slot);
        self.has_staged_changes = true;
        info!("[disk] partition {slot} formatted");
        Ok(())
    }

    /// Drop a staged partition. A no-op if the slot is already free.
    pub fn delete_partition(&mut self, slot: usize) -> Result<(), EditorError> {
        if slot >= MAX_PART_COUNT {
            return Err(EditorError::SlotOutOfRange(slot));
        }
        if !self.staged_partitions[slot].active {
            return Ok(());
        }

        info!("[disk] deleting partition {slot}");
        self.staged_partitions[slot] = Partition::default();
        self.encode_staged_entry(slot);
        self.has_staged_changes = true;
        // If the table was full, this slot just became the free one.
        if self.free_part_idx.is_none() {
            self.free_part_idx = Some(slot);
        }
        Ok(())
    }

    /// Throw away every staged edit and mirror the committed state again.
    pub fn revert_changes(&mut self) {
        if !self.has_staged_changes {
            debug!("[disk] no changes to revert");
            return;
        }
        // Dropping the staged partitions frees their formatted buffers.
        self.staged_mbr = self.mbr;
        self.staged_partitions = self.partitions.clone();
        self.has_staged_changes = false;
        // Recompute only after the staged view has been restored.
        self.free_part_idx = self.find_free_partition();
        info!("[disk] changes reverted");
    }

    /// Promote staged to committed after a successful write. The staged
    /// buffers have reached the disk, so they are dropped.
    fn apply_changes(&mut self) {
        for part in self.staged_partitions.iter_mut() {
            part.data = None;
        }
        self.mbr = self.staged_mbr;
        self.partitions = self.staged_partitions.clone();
        self.has_staged_changes = false;
        info!("[disk] changes saved to disk");
    }

    /// Commit: write the staged MBR and every staged partition buffer,
    /// then promote staged to committed.
    ///
    /// On failure the staged view is left untouched so the user can retry
    /// or revert. Whatever already reached the disk stays there, raw
    /// device writes cannot be rolled back.
    pub fn write_changes(&mut self) -> Result<(), EditorError> {
        let handle = BlockHandle::open(&self.path).map_err(DiskError::from)?;

        if self.has_mbr {
            handle
                .write_at(0, &self.staged_mbr)
                .map_err(DiskError::from)?;
        }

        for (i, part) in self.staged_partitions.iter().enumerate() {
            if let Some(data) = &part.data {
                let offset = part.start_lba as u64 * SECTOR_SIZE as u64;
                debug!(
                    "[disk] writing partition {i} @ {offset:#010x}, {} bytes",
                    data.len()
                );
                handle.write_at(offset, data).map_err(DiskError::from)?;
            } else {
                debug!("[disk] partition {i} has no changes");
            }
        }

        self.apply_changes();
        Ok(())
    }

    /// Put a blank MBR (signature only) on a disk that has none. This
    /// commits immediately, so no other changes may be staged.
    pub fn create_mbr(&mut self) -> Result<(), EditorError> {
        if !self.valid {
            return Err(EditorError::InvalidDisk);
        }
        if self.has_mbr {
            return Err(EditorError::MbrPresent);
        }
        if self.has_staged_changes {
            return Err(EditorError::StagedChangesPresent);
        }

        self.has_mbr = true;
        self.staged_mbr = [0u8; SECTOR_SIZE];
        set_mbr_signature(&mut self.staged_mbr);
        self.has_staged_changes = true;

        match self.write_changes() {
            Ok(()) => {
                // Start over from the new, empty table.
                self.parse_mbr_partitions();
                Ok(())
            }
            Err(err) => {
                // The disk may or may not carry the signature now, but
                // the in-memory record goes back to what we knew.
                self.has_mbr = false;
                self.has_staged_changes = false;
                self.staged_mbr = self.mbr;
                Err(err)
            }
        }
    }
}
