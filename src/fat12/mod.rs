pub mod directory;
pub mod fat_table;
pub mod file;
pub mod format;
pub mod geometry;
pub mod timestamp;
pub mod volume;

pub use file::{DirectoryEntry, ShortName};
pub use geometry::Geometry;

/// FAT12 floppies always use 512-byte sectors
pub const SECTOR_SIZE: usize = 512;
pub(crate) const DIR_ENTRY_SIZE: usize = 32;

/// `55 AA` at offset 510, read little-endian
pub const BOOT_SIGNATURE: u16 = 0xAA55;

pub(crate) const END_MARKER: u8 = 0x00;
pub(crate) const DELETED_MARKER: u8 = 0xE5;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_LABEL: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
