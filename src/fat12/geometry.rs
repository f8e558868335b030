//! Disk layout derived from the FAT12 boot sector

use std::fmt;
use std::ops::Range;

use super::{BOOT_SIGNATURE, DIR_ENTRY_SIZE, SECTOR_SIZE};
use crate::error::{Fat12Error, Result};

/// Region boundaries of a FAT12 image, all offsets in bytes from the start of the image.
///
/// Derived once from the boot sector. The ordering
/// `end_of_reserved <= end_of_first_fat <= end_of_fats <= end_of_root_dir <= image length`
/// is checked by [`Geometry::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entries: u16,
    pub total_sectors: u16,
    pub sectors_per_fat: u16,
    pub bootable: bool,

    pub end_of_reserved: usize,
    pub end_of_first_fat: usize,
    pub end_of_fats: usize,
    pub end_of_root_dir: usize,
    /// End of the usable data region, clamped to the image length
    pub end_of_data: usize,
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

impl Geometry {
    /// Parses the boot sector at the start of `image`.
    pub fn parse(image: &[u8]) -> Result<Self> {
        if image.len() < SECTOR_SIZE {
            return Err(Fat12Error::malformed(format!(
                "image is {} bytes, shorter than one sector",
                image.len()
            )));
        }

        let sectors_per_cluster = image[0x0D];
        let reserved_sectors = read_u16(image, 0x0E);
        let num_fats = image[0x10];
        let root_entries = read_u16(image, 0x11);
        let total_sectors = read_u16(image, 0x13);
        let sectors_per_fat = read_u16(image, 0x16);
        let bootable = read_u16(image, 510) == BOOT_SIGNATURE;

        if sectors_per_cluster == 0 {
            return Err(Fat12Error::malformed("sectors per cluster is zero"));
        }
        if reserved_sectors == 0 {
            return Err(Fat12Error::malformed("no reserved sectors"));
        }
        if num_fats == 0 || sectors_per_fat == 0 {
            return Err(Fat12Error::malformed("no FAT region"));
        }

        let fat_bytes = sectors_per_fat as usize * SECTOR_SIZE;
        let end_of_reserved = reserved_sectors as usize * SECTOR_SIZE;
        let end_of_first_fat = end_of_reserved + fat_bytes;
        let end_of_fats = end_of_reserved + num_fats as usize * fat_bytes;
        let end_of_root_dir = end_of_fats + root_entries as usize * DIR_ENTRY_SIZE;

        if end_of_root_dir > image.len() {
            return Err(Fat12Error::malformed(format!(
                "root directory ends at byte {} but image is {} bytes",
                end_of_root_dir,
                image.len()
            )));
        }

        // A zero 16-bit count means the real count lives in the 32-bit field,
        // which FAT12 floppies never use; fall back to the image length.
        let declared_end = if total_sectors == 0 {
            image.len()
        } else {
            total_sectors as usize * SECTOR_SIZE
        };
        let end_of_data = declared_end.clamp(end_of_root_dir, image.len());

        log::debug!(
            "geometry: spc={} reserved={} fats={}x{} root_entries={} total_sectors={} bootable={}",
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            sectors_per_fat,
            root_entries,
            total_sectors,
            bootable
        );

        Ok(Self {
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            root_entries,
            total_sectors,
            sectors_per_fat,
            bootable,
            end_of_reserved,
            end_of_first_fat,
            end_of_fats,
            end_of_root_dir,
            end_of_data,
        })
    }

    pub fn cluster_size(&self) -> usize {
        self.sectors_per_cluster as usize * SECTOR_SIZE
    }

    pub fn fat_size(&self) -> usize {
        self.sectors_per_fat as usize * SECTOR_SIZE
    }

    /// Byte range of FAT copy `index`.
    pub fn fat_range(&self, index: usize) -> Range<usize> {
        let start = self.end_of_reserved + index * self.fat_size();
        start..start + self.fat_size()
    }

    pub fn root_dir_range(&self) -> Range<usize> {
        self.end_of_fats..self.end_of_root_dir
    }

    /// Number of whole clusters that fit in the data region.
    pub fn data_clusters(&self) -> usize {
        (self.end_of_data - self.end_of_root_dir) / self.cluster_size()
    }

    /// One past the highest cluster number that is both addressable by the FAT
    /// and backed by data region bytes.
    pub fn cluster_limit(&self) -> usize {
        let fat_entries = self.fat_size() * 2 / 3;
        fat_entries.min(self.data_clusters() + 2)
    }

    /// Byte range of `cluster` in the image, `None` for reserved or out-of-range clusters.
    pub fn cluster_range(&self, cluster: u16) -> Option<Range<usize>> {
        let cluster = cluster as usize;
        if cluster < 2 || cluster >= self.data_clusters() + 2 {
            return None;
        }
        let start = self.end_of_root_dir + (cluster - 2) * self.cluster_size();
        Some(start..start + self.cluster_size())
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sector = |offset: usize| offset / SECTOR_SIZE;
        writeln!(f, "Reserved: 0-{}", sector(self.end_of_reserved))?;
        writeln!(
            f,
            "FAT: {}-{} ({} copies)",
            sector(self.end_of_reserved),
            sector(self.end_of_fats),
            self.num_fats
        )?;
        writeln!(
            f,
            "Root Directory: {}-{} ({} entries)",
            sector(self.end_of_fats),
            sector(self.end_of_root_dir),
            self.root_entries
        )?;
        write!(
            f,
            "Data: {}-{} ({} clusters of {} bytes)",
            sector(self.end_of_root_dir),
            sector(self.end_of_data),
            self.data_clusters(),
            self.cluster_size()
        )
    }
}
