// The 32-byte directory entry and its BCD timestamp.

use bitflags::bitflags;

/// Maximum length of a name, extension included. No NUL terminator on
/// disk, short names are NUL-padded.
pub const NAME_MAX_LEN: usize = 16;

/// Entries are packed to exactly 32 bytes.
pub const ENTRY_SIZE: usize = 32;

bitflags! {
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
    pub struct EntryFlags: u8 {
        const IsDirectory = 1 << 0;
        const Occupied = 1 << 7;
    }
}

/// Zeal 8-bit OS date format: every field is BCD.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct EntryTime {
    /// Century first, then year within the century. 2026 is [0x20, 0x26].
    pub year: [u8; 2],
    pub month: u8,
    pub day: u8,
    /// Day of the week.
    pub weekday: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

/// Convert a value between 0 and 99 into BCD. 13 becomes 0x13 (in hex!).
pub fn to_bcd(value: u8) -> u8 {
    (((value / 10) % 10) << 4) | (value % 10)
}

/// Convert an 8-bit BCD value back into binary.
pub fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0xF)
}

impl EntryTime {
    /// Current local wall-clock time, BCD encoded.
    #[cfg(unix)]
    pub fn now() -> EntryTime {
        let mut raw: libc::time_t = 0;
        let mut tm: libc::tm = unsafe { std::mem::zeroed() };
        // SAFETY: both pointers are valid locals, localtime_r is the
        // reentrant variant so no static storage is touched.
        unsafe {
            libc::time(&mut raw);
            libc::localtime_r(&raw, &mut tm);
        }

        let full_year = 1900 + tm.tm_year;
        EntryTime {
            year: [
                to_bcd((full_year / 100) as u8),
                to_bcd((full_year % 100) as u8),
            ],
            month: to_bcd((tm.tm_mon + 1) as u8),
            day: to_bcd(tm.tm_mday as u8),
            weekday: to_bcd(tm.tm_wday as u8),
            hours: to_bcd(tm.tm_hour as u8),
            minutes: to_bcd(tm.tm_min as u8),
            seconds: to_bcd(tm.tm_sec as u8),
        }
    }

    #[cfg(not(unix))]
    pub fn now() -> EntryTime {
        EntryTime::default()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DirEntry {
    pub flags: EntryFlags,
    /// NUL-padded, not NUL-terminated.
    pub name: [u8; NAME_MAX_LEN],
    pub start_page: u16,
    /// File size in bytes. Directories carry their own page size here.
    pub size: u32,
    pub time: EntryTime,
}

impl DirEntry {
    /// A zeroed entry, which is what a free slot looks like on disk.
    pub fn empty() -> DirEntry {
        DirEntry {
            flags: EntryFlags::empty(),
            name: [0u8; NAME_MAX_LEN],
            start_page: 0,
            size: 0,
            time: EntryTime::default(),
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.flags.contains(EntryFlags::Occupied)
    }

    pub fn is_directory(&self) -> bool {
        self.flags.contains(EntryFlags::IsDirectory)
    }

    /// Compare against a path component, honoring the NUL padding.
    pub fn name_matches(&self, component: &str) -> bool {
        let bytes = component.as_bytes();
        if bytes.len() > NAME_MAX_LEN {
            return false;
        }
        // The stored name must match and be padded right after.
        self.name[..bytes.len()] == *bytes
            && self.name[bytes.len()..].iter().all(|&b| b == 0)
    }

    /// The stored name as a displayable string.
    pub fn name_string(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_MAX_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    pub fn from_bytes(raw: &[u8]) -> DirEntry {
        let mut name = [0u8; NAME_MAX_LEN];
        name.copy_from_slice(&raw[1..1 + NAME_MAX_LEN]);
        DirEntry {
            flags: EntryFlags::from_bits_retain(raw[0]),
            name,
            start_page: u16::from_le_bytes(raw[17..17 + 2].try_into().expect("2 = 2")),
            size: u32::from_le_bytes(raw[19..19 + 4].try_into().expect("4 = 4")),
            time: EntryTime {
                year: [raw[23], raw[24]],
                month: raw[25],
                day: raw[26],
                weekday: raw[27],
                hours: raw[28],
                minutes: raw[29],
                seconds: raw[30],
            },
        }
    }

    pub fn to_bytes(&self) -> [u8; ENTRY_SIZE] {
        let mut raw = [0u8; ENTRY_SIZE];
        raw[0] = self.flags.bits();
        raw[1..1 + NAME_MAX_LEN].copy_from_slice(&self.name);
        raw[17..17 + 2].copy_from_slice(&self.start_page.to_le_bytes());
        raw[19..19 + 4].copy_from_slice(&self.size.to_le_bytes());
        raw[23] = self.time.year[0];
        raw[24] = self.time.year[1];
        raw[25] = self.time.month;
        raw[26] = self.time.day;
        raw[27] = self.time.weekday;
        raw[28] = self.time.hours;
        raw[29] = self.time.minutes;
        raw[30] = self.time.seconds;
        // raw[31] is reserved and stays zero.
        raw
    }
}
