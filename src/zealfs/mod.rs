// ZealFS v2: the page-allocated filesystem for the Zeal 8-bit computer.
//
// One partition holds a header page (fixed fields plus the allocation
// bitmap, with the root directory squeezed into the remainder), one or
// two FAT pages of 16-bit next-page links, and then plain pages that are
// either directory entry arrays or file data. Which one a page is comes
// from the entry that links it, pages carry no header of their own.

pub mod header_struct;
pub mod entry_struct;
pub mod format;
pub mod session_struct;
mod browse;
pub mod session_methods;

pub use entry_struct::{DirEntry, EntryFlags};
pub use format::{format, page_size_for};
pub use header_struct::Header;
pub use session_struct::{DirHandle, FileHandle, Session};
