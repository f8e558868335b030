//! 32-byte directory entry codec and 8.3 short names

use std::fmt;

use super::timestamp::FatTimestamp;
use super::{ATTR_DIRECTORY, ATTR_VOLUME_LABEL, DELETED_MARKER, DIR_ENTRY_SIZE, END_MARKER};
use crate::error::{Fat12Error, Result};

pub const NAME_LEN: usize = 8;
pub const EXT_LEN: usize = 3;

const FORBIDDEN_CHARS: &[u8] = b"\"*+,/:;<=>?[\\]|.";

/// Space-padded 8.3 name as stored in a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortName {
    name: [u8; NAME_LEN],
    ext: [u8; EXT_LEN],
}

fn pad_field<const N: usize>(full: &str, part: &str) -> Result<[u8; N]> {
    if part.len() > N {
        return Err(Fat12Error::name_too_long(full, N));
    }
    let mut field = [b' '; N];
    for (i, b) in part.bytes().enumerate() {
        if !b.is_ascii_graphic() || FORBIDDEN_CHARS.contains(&b) {
            return Err(Fat12Error::invalid_file_name(
                full,
                format!("character {:?} not allowed in a short name", b as char),
            ));
        }
        field[i] = b;
    }
    Ok(field)
}

impl ShortName {
    /// Builds a short name from separate name and extension parts, stored as given.
    pub fn new(name: &str, ext: &str) -> Result<Self> {
        let full = if ext.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", name, ext)
        };
        if name.is_empty() {
            return Err(Fat12Error::invalid_file_name(full, "empty name"));
        }
        Ok(Self {
            name: pad_field::<NAME_LEN>(&full, name)?,
            ext: pad_field::<EXT_LEN>(&full, ext)?,
        })
    }

    /// Parses `NAME.EXT` (or `NAME`), upper-casing it the way DOS stores names.
    pub fn parse(full_name: &str) -> Result<Self> {
        let upper = full_name.to_ascii_uppercase();
        match upper.split_once('.') {
            Some((name, ext)) => Self::new(name, ext),
            None => Self::new(&upper, ""),
        }
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.name).trim_end().to_string()
    }

    pub fn ext(&self) -> String {
        String::from_utf8_lossy(&self.ext).trim_end().to_string()
    }

    /// `NAME.EXT` with padding stripped, no dot when the extension is empty.
    pub fn full_name(&self) -> String {
        join_name(&self.name(), &self.ext())
    }
}

fn join_name(name: &str, ext: &str) -> String {
    if ext.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", name, ext)
    }
}

/// A live directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Name field with trailing spaces stripped
    pub name: String,
    /// Extension field with trailing spaces stripped
    pub ext: String,
    pub attr: u8,
    pub modified: FatTimestamp,
    /// First cluster of the file, 0 for an empty file
    pub start_cluster: u16,
    pub size: u32,
}

impl DirectoryEntry {
    pub fn full_name(&self) -> String {
        join_name(&self.name, &self.ext)
    }

    pub fn is_directory(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    pub fn is_volume_label(&self) -> bool {
        self.attr & ATTR_VOLUME_LABEL != 0
    }
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\t{:<8} {:<3}\t{}\t{}\t{}",
            self.name, self.ext, self.size, self.modified, self.start_cluster
        )
    }
}

/// Decoded state of one 32-byte directory slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEntry {
    /// First byte 0x00: no entries follow
    End,
    /// First byte 0xE5: slot free for reuse
    Deleted,
    Entry(DirectoryEntry),
}

/// Decodes one directory slot. A slice shorter than a full entry reads as the end marker.
pub fn parse_dir_entry(entry: &[u8]) -> RawEntry {
    if entry.len() < DIR_ENTRY_SIZE {
        return RawEntry::End;
    }
    match entry[0] {
        END_MARKER => return RawEntry::End,
        DELETED_MARKER => return RawEntry::Deleted,
        _ => {}
    }
    let name = String::from_utf8_lossy(&entry[0..8]).trim_end().to_string();
    let ext = String::from_utf8_lossy(&entry[8..11]).trim_end().to_string();
    let time = u16::from_le_bytes([entry[0x16], entry[0x17]]);
    let date = u16::from_le_bytes([entry[0x18], entry[0x19]]);
    RawEntry::Entry(DirectoryEntry {
        name,
        ext,
        attr: entry[0x0B],
        modified: FatTimestamp::unpack(time, date),
        start_cluster: u16::from_le_bytes([entry[0x1A], entry[0x1B]]),
        size: u32::from_le_bytes([entry[0x1C], entry[0x1D], entry[0x1E], entry[0x1F]]),
    })
}

/// Encodes a directory entry. The 10 reserved bytes are written as zero.
pub fn make_dir_entry(
    name: &ShortName,
    attr: u8,
    start_cluster: u16,
    size: u32,
    modified: FatTimestamp,
) -> [u8; DIR_ENTRY_SIZE] {
    let mut entry = [0u8; DIR_ENTRY_SIZE];
    entry[0..8].copy_from_slice(&name.name);
    entry[8..11].copy_from_slice(&name.ext);
    entry[0x0B] = attr;
    entry[0x16..0x18].copy_from_slice(&modified.pack_time().to_le_bytes());
    entry[0x18..0x1A].copy_from_slice(&modified.pack_date().to_le_bytes());
    entry[0x1A..0x1C].copy_from_slice(&start_cluster.to_le_bytes());
    entry[0x1C..0x20].copy_from_slice(&size.to_le_bytes());
    entry
}
