use std::fmt;
use std::fs;
use std::path::Path;

use super::directory::{find_free_slot, parse_directory_entries, search};
use super::fat_table::{count_free_clusters, walk_chain, FatTable};
use super::file::{make_dir_entry, DirectoryEntry, ShortName};
use super::geometry::Geometry;
use super::timestamp::{Clock, SystemClock};
use super::{ATTR_ARCHIVE, DELETED_MARKER, DIR_ENTRY_SIZE};
use crate::error::{Fat12Error, Result};

/// A FAT12 image held in memory.
///
/// Mutations run on a copy of the buffer; the copy replaces the image only
/// when every FAT copy, data cluster and directory slot has been written.
pub struct Fat12Image {
    data: Vec<u8>,
    geometry: Geometry,
    clock: Box<dyn Clock>,
}

impl fmt::Debug for Fat12Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fat12Image")
            .field("len", &self.data.len())
            .field("geometry", &self.geometry)
            .finish()
    }
}

impl Fat12Image {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        log::info!("loaded {} ({} bytes)", path.display(), data.len());
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let geometry = Geometry::parse(&data)?;
        Ok(Self {
            data,
            geometry,
            clock: Box::new(SystemClock),
        })
    }

    /// Replaces the clock used to stamp new directory entries.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, &self.data)?;
        log::info!("saved {} ({} bytes)", path.display(), self.data.len());
        Ok(())
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn root_dir(&self) -> &[u8] {
        &self.data[self.geometry.root_dir_range()]
    }

    fn first_fat(&self) -> &[u8] {
        &self.data[self.geometry.fat_range(0)]
    }

    /// Bytes of FAT copy `index`.
    pub fn fat_copy(&self, index: usize) -> Option<&[u8]> {
        if index >= self.geometry.num_fats as usize {
            return None;
        }
        Some(&self.data[self.geometry.fat_range(index)])
    }

    /// Root directory entries in slot order, without deleted slots and volume labels.
    pub fn list(&self) -> Vec<DirectoryEntry> {
        parse_directory_entries(self.root_dir())
            .into_iter()
            .map(|(_, de)| de)
            .collect()
    }

    /// Case-sensitive lookup of `NAME.EXT` in the root directory.
    pub fn search(&self, full_name: &str) -> Option<DirectoryEntry> {
        search(self.root_dir(), full_name).map(|(_, de)| de)
    }

    /// Finds `file_name` as given, then as upper-case. Entries written by
    /// other tools may hold lower-case names that `ShortName::parse` never produces.
    fn lookup(&self, file_name: &str) -> Option<(usize, DirectoryEntry)> {
        search(self.root_dir(), file_name)
            .or_else(|| search(self.root_dir(), &file_name.to_ascii_uppercase()))
    }

    /// Cluster chain of `file_name`, empty for a zero-length file.
    pub fn file_clusters(&self, file_name: &str) -> Option<Vec<u16>> {
        let (_, de) = self.lookup(file_name)?;
        Some(walk_chain(self.first_fat(), de.start_cluster).collect())
    }

    pub fn get_file_content(&self, file_name: &str) -> Option<Vec<u8>> {
        let (_, de) = self.lookup(file_name)?;
        let file_name = de.full_name();

        let mut content = Vec::with_capacity(de.size as usize);
        for cluster in walk_chain(self.first_fat(), de.start_cluster) {
            match self.geometry.cluster_range(cluster) {
                Some(range) => content.extend_from_slice(&self.data[range]),
                None => {
                    log::warn!(
                        "{}: cluster {} lies outside the data region",
                        file_name,
                        cluster
                    );
                    break;
                }
            }
        }
        if content.len() < de.size as usize {
            log::warn!(
                "{}: chain holds {} bytes, directory says {}",
                file_name,
                content.len(),
                de.size
            );
        }
        content.truncate(de.size as usize);
        log::debug!("read {} ({} bytes)", file_name, content.len());
        Some(content)
    }

    pub fn insert_file(&mut self, file_name: &str, content: &[u8]) -> Result<()> {
        let short_name = ShortName::parse(file_name)?;
        let full_name = short_name.full_name();
        if search(self.root_dir(), &full_name).is_some() {
            return Err(Fat12Error::file_exists(full_name));
        }
        let size = u32::try_from(content.len()).map_err(|_| Fat12Error::OutOfSpace)?;

        let geometry = &self.geometry;
        let mut working = self.data.clone();

        let start_cluster = if content.is_empty() {
            0
        } else {
            let cluster_size = geometry.cluster_size();
            let mut fat = FatTable::new(&mut working, geometry);
            let mut clusters = Vec::with_capacity(content.len().div_ceil(cluster_size));
            for chunk in content.chunks(cluster_size) {
                let cluster = fat.find_free_cluster().ok_or(Fat12Error::OutOfSpace)?;
                fat.allocate(cluster);
                if let Some(&(previous, _)) = clusters.last() {
                    fat.link(previous, cluster);
                }
                clusters.push((cluster, chunk));
            }
            for &(cluster, chunk) in &clusters {
                let range = geometry
                    .cluster_range(cluster)
                    .ok_or(Fat12Error::OutOfSpace)?;
                working[range.start..range.start + chunk.len()].copy_from_slice(chunk);
            }
            clusters[0].0
        };

        let slot = find_free_slot(&working[geometry.root_dir_range()])
            .ok_or(Fat12Error::DirectoryFull)?;
        let entry = make_dir_entry(
            &short_name,
            ATTR_ARCHIVE,
            start_cluster,
            size,
            self.clock.now(),
        );
        let offset = geometry.end_of_fats + slot * DIR_ENTRY_SIZE;
        working[offset..offset + DIR_ENTRY_SIZE].copy_from_slice(&entry);

        self.data = working;
        log::info!(
            "inserted {} ({} bytes, start cluster {}, slot {})",
            full_name,
            size,
            start_cluster,
            slot
        );
        Ok(())
    }

    /// Deletes `file_name`, matched exactly or else upper-cased.
    /// Returns `false` when no such file exists.
    pub fn delete_file(&mut self, file_name: &str) -> Result<bool> {
        let Some((slot, de)) = self.lookup(file_name) else {
            log::debug!("delete: {} not found", file_name);
            return Ok(false);
        };
        let file_name = de.full_name();

        let mut working = self.data.clone();
        let freed = FatTable::new(&mut working, &self.geometry).release(de.start_cluster);
        working[self.geometry.end_of_fats + slot * DIR_ENTRY_SIZE] = DELETED_MARKER;

        self.data = working;
        log::info!("deleted {} ({} clusters freed)", file_name, freed.len());
        Ok(true)
    }

    pub fn is_bootable(&self) -> bool {
        self.geometry.bootable
    }

    /// Writes or clears the `55 AA` boot signature.
    pub fn make_bootable(&mut self, yes: bool) {
        let signature: [u8; 2] = if yes { [0x55, 0xAA] } else { [0x00, 0x00] };
        self.data[510..512].copy_from_slice(&signature);
        self.geometry.bootable = yes;
        log::info!("boot signature {}", if yes { "set" } else { "cleared" });
    }

    /// Free data clusters according to the first FAT copy.
    pub fn free_clusters(&self) -> usize {
        count_free_clusters(self.first_fat(), self.geometry.cluster_limit())
    }
}
