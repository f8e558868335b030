//! FAT12 table access: packed 12-bit entries, chain walking and cluster allocation
//!
//! Two entries share three bytes. Entry `n` lives in the little-endian word at
//! byte `n * 3 / 2`: low 12 bits for even `n`, high 12 bits for odd `n`.

use super::geometry::Geometry;

/// Free cluster marker
pub const FAT12_FREE_CLUSTER: u16 = 0x000;

/// Bad cluster marker
pub const FAT12_BAD_CLUSTER: u16 = 0xFF7;

/// Lowest end-of-chain marker; everything up to 0xFFF ends a chain
pub const FAT12_EOC_MIN: u16 = 0xFF8;

/// End-of-chain marker written for newly allocated clusters
pub const FAT12_EOC: u16 = 0xFFF;

/// First cluster number backed by the data region
pub const FIRST_DATA_CLUSTER: u16 = 2;

pub fn is_end_of_chain(value: u16) -> bool {
    (FAT12_EOC_MIN..=FAT12_EOC).contains(&value)
}

fn entry_offset(cluster: u16) -> usize {
    cluster as usize * 3 / 2
}

/// Reads the 12-bit entry for `cluster`. Entries past the end of the table read as end-of-chain.
pub fn read_entry(fat: &[u8], cluster: u16) -> u16 {
    let offset = entry_offset(cluster);
    if offset + 2 > fat.len() {
        return FAT12_EOC;
    }
    let word = u16::from_le_bytes([fat[offset], fat[offset + 1]]);
    if cluster % 2 == 0 {
        word & 0x0FFF
    } else {
        word >> 4
    }
}

/// Writes the 12-bit entry for `cluster`, keeping the nibble that belongs to its neighbour.
pub fn write_entry(fat: &mut [u8], cluster: u16, value: u16) {
    let offset = entry_offset(cluster);
    if offset + 2 > fat.len() {
        log::warn!("FAT write for cluster {} past end of table ignored", cluster);
        return;
    }
    let value = value & 0x0FFF;
    let word = u16::from_le_bytes([fat[offset], fat[offset + 1]]);
    let word = if cluster % 2 == 0 {
        (word & 0xF000) | value
    } else {
        (word & 0x000F) | (value << 4)
    };
    fat[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
}

/// Iterator over the clusters of one chain.
///
/// Stops on an end-of-chain marker. A free or reserved link, a link past the
/// last addressable cluster, or a cluster seen twice also end the walk, with a
/// warning, so a damaged table never loops forever.
pub struct ChainWalk<'a> {
    fat: &'a [u8],
    next: Option<u16>,
    visited: Vec<bool>,
}

/// Walks the chain starting at `start`. A start below cluster 2 is an empty chain.
pub fn walk_chain(fat: &[u8], start: u16) -> ChainWalk<'_> {
    let entries = fat.len() * 2 / 3;
    let next = if start < FIRST_DATA_CLUSTER {
        None
    } else {
        Some(start)
    };
    ChainWalk {
        fat,
        next,
        visited: vec![false; entries],
    }
}

impl Iterator for ChainWalk<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        let current = self.next.take()?;
        match self.visited.get_mut(current as usize) {
            Some(seen) if *seen => {
                log::warn!("cluster chain loops back to cluster {}", current);
                return None;
            }
            Some(seen) => *seen = true,
            None => {
                log::warn!("cluster chain links to cluster {} past the end of the FAT", current);
                return None;
            }
        }

        let value = read_entry(self.fat, current);
        self.next = match value {
            v if is_end_of_chain(v) => None,
            FAT12_FREE_CLUSTER | 1 => {
                log::warn!(
                    "cluster {} links to reserved value {:#05x}, treating as end of chain",
                    current,
                    value
                );
                None
            }
            v => Some(v),
        };
        Some(current)
    }
}

/// View over every FAT copy of an image buffer.
///
/// Reads come from the first copy. Writes go to every copy, so the copies stay identical.
pub struct FatTable<'a> {
    image: &'a mut [u8],
    geometry: &'a Geometry,
}

impl<'a> FatTable<'a> {
    pub fn new(image: &'a mut [u8], geometry: &'a Geometry) -> Self {
        Self { image, geometry }
    }

    /// Bytes of the first FAT copy
    pub fn first_fat(&self) -> &[u8] {
        &self.image[self.geometry.fat_range(0)]
    }

    pub fn get_entry(&self, cluster: u16) -> u16 {
        read_entry(self.first_fat(), cluster)
    }

    /// Writes one logical entry into every FAT copy.
    pub fn set_entry(&mut self, cluster: u16, value: u16) {
        for copy in 0..self.geometry.num_fats as usize {
            let range = self.geometry.fat_range(copy);
            write_entry(&mut self.image[range], cluster, value);
        }
    }

    /// First free cluster counting up from 2, within the data region.
    pub fn find_free_cluster(&self) -> Option<u16> {
        find_free_cluster(self.first_fat(), self.geometry.cluster_limit())
    }

    /// Marks `cluster` as in use and as the end of its chain.
    pub fn allocate(&mut self, cluster: u16) {
        log::debug!("allocating cluster {}", cluster);
        self.set_entry(cluster, FAT12_EOC);
    }

    /// Points `from` at `to`, replacing its end-of-chain marker.
    pub fn link(&mut self, from: u16, to: u16) {
        log::debug!("linking cluster {} -> {}", from, to);
        self.set_entry(from, to);
    }

    /// Frees every cluster of the chain starting at `start`. Returns the freed clusters in chain order.
    pub fn release(&mut self, start: u16) -> Vec<u16> {
        let chain: Vec<u16> = walk_chain(self.first_fat(), start).collect();
        for &cluster in &chain {
            self.set_entry(cluster, FAT12_FREE_CLUSTER);
        }
        log::debug!("released {} clusters starting at {}", chain.len(), start);
        chain
    }
}

fn free_clusters(fat: &[u8], limit: usize) -> impl Iterator<Item = u16> + '_ {
    let limit = limit.min(fat.len() * 2 / 3).min(FAT12_BAD_CLUSTER as usize);
    (FIRST_DATA_CLUSTER as usize..limit)
        .map(|c| c as u16)
        .filter(move |&c| read_entry(fat, c) == FAT12_FREE_CLUSTER)
}

/// Scans `fat` from cluster 2 up to (excluding) `limit` for an entry equal to 0.
pub fn find_free_cluster(fat: &[u8], limit: usize) -> Option<u16> {
    free_clusters(fat, limit).next()
}

pub fn count_free_clusters(fat: &[u8], limit: usize) -> usize {
    free_clusters(fat, limit).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_entry_uses_low_twelve_bits() {
        // cluster 2 -> bytes 3,4: 0x34 | (0x12 & 0x0F) << 8
        let fat = [0xF0, 0xFF, 0xFF, 0x34, 0x12, 0xAB];
        assert_eq!(read_entry(&fat, 2), 0x234);
    }

    #[test]
    fn odd_entry_uses_high_twelve_bits() {
        // cluster 3 -> bytes 4,5: (0xAB12) >> 4
        let fat = [0xF0, 0xFF, 0xFF, 0x34, 0x12, 0xAB];
        assert_eq!(read_entry(&fat, 3), 0xAB1);
    }

    #[test]
    fn media_descriptor_entries() {
        let fat = [0xF0, 0xFF, 0xFF, 0x00, 0x00, 0x00];
        assert_eq!(read_entry(&fat, 0), 0xFF0);
        assert_eq!(read_entry(&fat, 1), 0xFFF);
    }

    #[test]
    fn write_even_preserves_odd_neighbour() {
        let mut fat = [0u8; 6];
        write_entry(&mut fat, 3, 0xABC);
        write_entry(&mut fat, 2, 0x123);
        assert_eq!(fat[3..6], [0x23, 0xC1, 0xAB]);
        assert_eq!(read_entry(&fat, 2), 0x123);
        assert_eq!(read_entry(&fat, 3), 0xABC);
    }

    #[test]
    fn write_odd_preserves_even_neighbour() {
        let mut fat = [0u8; 6];
        write_entry(&mut fat, 2, 0xFFF);
        write_entry(&mut fat, 3, 0x005);
        assert_eq!(fat[3..6], [0xFF, 0x5F, 0x00]);
        assert_eq!(read_entry(&fat, 2), 0xFFF);
        assert_eq!(read_entry(&fat, 3), 0x005);
    }

    #[test]
    fn write_masks_value_to_twelve_bits() {
        let mut fat = [0u8; 6];
        write_entry(&mut fat, 2, 0xF123);
        assert_eq!(read_entry(&fat, 2), 0x123);
        assert_eq!(read_entry(&fat, 3), 0);
    }

    #[test]
    fn out_of_range_reads_as_end_of_chain() {
        let fat = [0u8; 6];
        assert_eq!(read_entry(&fat, 4), FAT12_EOC);
    }

    #[test]
    fn end_of_chain_range() {
        assert!(!is_end_of_chain(0xFF7));
        assert!(is_end_of_chain(0xFF8));
        assert!(is_end_of_chain(0xFFC));
        assert!(is_end_of_chain(0xFFF));
        assert!(!is_end_of_chain(0x000));
    }

    #[test]
    fn walk_follows_links_to_sentinel() {
        let mut fat = vec![0u8; 12];
        write_entry(&mut fat, 2, 5);
        write_entry(&mut fat, 5, 3);
        write_entry(&mut fat, 3, 0xFF8);
        assert_eq!(walk_chain(&fat, 2).collect::<Vec<_>>(), vec![2, 5, 3]);
    }

    #[test]
    fn walk_from_zero_is_empty() {
        let fat = vec![0u8; 12];
        assert_eq!(walk_chain(&fat, 0).count(), 0);
    }

    #[test]
    fn walk_stops_at_free_link() {
        let mut fat = vec![0u8; 12];
        write_entry(&mut fat, 2, 3);
        assert_eq!(walk_chain(&fat, 2).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn walk_stops_on_cycle() {
        let mut fat = vec![0u8; 12];
        write_entry(&mut fat, 2, 3);
        write_entry(&mut fat, 3, 2);
        assert_eq!(walk_chain(&fat, 2).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn walk_stops_past_table() {
        let mut fat = vec![0u8; 12];
        write_entry(&mut fat, 2, 0x200);
        assert_eq!(walk_chain(&fat, 2).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn free_scan_skips_used_and_respects_limit() {
        let mut fat = vec![0u8; 12];
        write_entry(&mut fat, 0, 0xFF0);
        write_entry(&mut fat, 1, 0xFFF);
        write_entry(&mut fat, 2, 0xFFF);
        write_entry(&mut fat, 3, FAT12_BAD_CLUSTER);
        assert_eq!(find_free_cluster(&fat, 8), Some(4));
        assert_eq!(find_free_cluster(&fat, 4), None);
    }

    #[test]
    fn free_scan_finds_odd_cluster() {
        let mut fat = vec![0u8; 12];
        write_entry(&mut fat, 0, 0xFF0);
        write_entry(&mut fat, 1, 0xFFF);
        write_entry(&mut fat, 2, 0xFFF);
        assert_eq!(find_free_cluster(&fat, 8), Some(3));
    }

    fn two_fat_geometry() -> (Vec<u8>, Geometry) {
        let image = crate::fat12::format::FloppyLayout {
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            num_fats: 2,
            sectors_per_fat: 1,
            root_entries: 16,
            total_sectors: 12,
            media: 0xF8,
            bootable: false,
        }
        .build();
        let geometry = Geometry::parse(&image).unwrap();
        (image, geometry)
    }

    #[test]
    fn table_writes_reach_every_copy() {
        let (mut image, geometry) = two_fat_geometry();
        let mut fat = FatTable::new(&mut image, &geometry);
        let first = fat.find_free_cluster().unwrap();
        fat.allocate(first);
        let second = fat.find_free_cluster().unwrap();
        fat.allocate(second);
        fat.link(first, second);

        assert_eq!((first, second), (2, 3));
        assert_eq!(fat.get_entry(first), second);
        assert_eq!(fat.get_entry(second), FAT12_EOC);
        assert_eq!(image[geometry.fat_range(0)], image[geometry.fat_range(1)]);
    }

    #[test]
    fn release_frees_chain_in_every_copy() {
        let (mut image, geometry) = two_fat_geometry();
        let mut fat = FatTable::new(&mut image, &geometry);
        for c in 2..6 {
            fat.allocate(c);
        }
        fat.link(2, 4);
        fat.link(4, 5);

        assert_eq!(fat.release(2), vec![2, 4, 5]);
        assert_eq!(fat.get_entry(3), FAT12_EOC);
        assert_eq!(fat.find_free_cluster(), Some(2));
        for copy in 0..2 {
            let fat = &image[geometry.fat_range(copy)];
            assert_eq!(read_entry(fat, 2), FAT12_FREE_CLUSTER);
            assert_eq!(read_entry(fat, 4), FAT12_FREE_CLUSTER);
            assert_eq!(read_entry(fat, 5), FAT12_FREE_CLUSTER);
        }
    }

    #[test]
    fn allocation_stops_at_data_region_end() {
        let (mut image, geometry) = two_fat_geometry();
        // 12 sectors - 1 reserved - 2 FAT - 1 root dir = 8 data clusters
        assert_eq!(geometry.data_clusters(), 8);
        let mut fat = FatTable::new(&mut image, &geometry);
        let mut allocated = Vec::new();
        while let Some(c) = fat.find_free_cluster() {
            fat.allocate(c);
            allocated.push(c);
        }
        assert_eq!(allocated, (2..10).collect::<Vec<u16>>());
    }
}
