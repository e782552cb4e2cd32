// Encoding and decoding of the 16-byte partition entries.

use crate::mbr::mbr_struct::{Partition, MBR_SIGNATURE_OFFSET};

impl Partition {
    /// Decode one 16-byte MBR entry.
    ///
    /// CHS fields are ignored entirely. An entry counts as active if any
    /// of the boot flag, type byte, start LBA or sector count is set.
    /// Being this conservative means partitions of unknown types are
    /// never mistaken for free slots and erased.
    pub fn from_mbr_entry(entry: &[u8]) -> Partition {
        let part_type = entry[4];
        let start_lba = u32::from_le_bytes(entry[8..8 + 4].try_into().expect("4 = 4"));
        let size_sectors = u32::from_le_bytes(entry[12..12 + 4].try_into().expect("4 = 4"));
        let active =
            (entry[0] & 0x80) != 0 || part_type != 0 || start_lba != 0 || size_sectors != 0;

        Partition {
            active,
            part_type,
            start_lba,
            size_sectors,
            data: None,
        }
    }

    /// Encode this partition as a 16-byte MBR entry.
    ///
    /// The boot flag is left clear and the CHS fields are written as
    /// all-ones, nobody has interpreted those in decades.
    pub fn to_mbr_entry(&self) -> [u8; 16] {
        let mut entry = [0u8; 16];
        // CHS start, not used
        entry[1] = 0xFF;
        entry[2] = 0xFF;
        entry[3] = 0xFF;
        entry[4] = self.part_type;
        // CHS end, not used either
        entry[5] = 0xFF;
        entry[6] = 0xFF;
        entry[7] = 0xFF;
        entry[8..8 + 4].copy_from_slice(&self.start_lba.to_le_bytes());
        entry[12..12 + 4].copy_from_slice(&self.size_sectors.to_le_bytes());
        entry
    }
}

/// Does this sector carry the 0x55 0xAA signature?
pub fn has_mbr_signature(sector: &[u8]) -> bool {
    sector.len() > MBR_SIGNATURE_OFFSET + 1
        && sector[MBR_SIGNATURE_OFFSET] == 0x55
        && sector[MBR_SIGNATURE_OFFSET + 1] == 0xAA
}

/// Stamp the 0x55 0xAA signature into a sector buffer.
pub fn set_mbr_signature(sector: &mut [u8]) {
    sector[MBR_SIGNATURE_OFFSET] = 0x55;
    sector[MBR_SIGNATURE_OFFSET + 1] = 0xAA;
}

/// Partition type byte to a displayable filesystem name.
pub fn fs_type_name(fs_byte: u8) -> &'static str {
    match fs_byte {
        0x01 => "FAT12",
        0x04 | 0x06 => "FAT16",
        0x0b | 0x0c => "FAT32",
        0x07 => "NTFS",
        0x83 => "ext3",
        0x8e => "ext4",
        0xa5 | 0xef => "exFAT",
        0x5a => "ZealFS",
        0x5e => "UFS",
        0xaf => "Mac OS Extended (HFS+)",
        0xc0 => "Mac OS Extended (HFSX)",
        0x17 => "Mac OS HFS",
        0x82 => "ext2",
        0xee => "GPT",
        _ => "Unknown",
    }
}
