use super::file::{parse_dir_entry, DirectoryEntry, RawEntry};
use super::DIR_ENTRY_SIZE;

fn slots(root_dir: &[u8]) -> impl Iterator<Item = (usize, RawEntry)> + '_ {
    root_dir
        .chunks_exact(DIR_ENTRY_SIZE)
        .enumerate()
        .map(|(i, entry)| (i, parse_dir_entry(entry)))
}

/// Live entries in slot order, up to the end marker. Deleted slots and volume labels are skipped.
pub fn parse_directory_entries(root_dir: &[u8]) -> Vec<(usize, DirectoryEntry)> {
    let mut results = Vec::new();
    for (index, raw) in slots(root_dir) {
        match raw {
            RawEntry::End => break,
            RawEntry::Deleted => continue,
            RawEntry::Entry(de) if de.is_volume_label() => continue,
            RawEntry::Entry(de) => results.push((index, de)),
        }
    }
    results
}

/// Case-sensitive lookup of `NAME.EXT`. Returns the slot index and the entry.
pub fn search(root_dir: &[u8], full_name: &str) -> Option<(usize, DirectoryEntry)> {
    parse_directory_entries(root_dir)
        .into_iter()
        .find(|(_, de)| de.full_name() == full_name)
}

/// First deleted or end-marker slot, `None` when every slot is taken.
pub fn find_free_slot(root_dir: &[u8]) -> Option<usize> {
    slots(root_dir)
        .find(|(_, raw)| matches!(raw, RawEntry::End | RawEntry::Deleted))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat12::file::{make_dir_entry, ShortName};
    use crate::fat12::timestamp::FatTimestamp;
    use crate::fat12::{ATTR_ARCHIVE, ATTR_VOLUME_LABEL};

    fn put(dir: &mut [u8], slot: usize, name: &str, attr: u8) {
        let raw = make_dir_entry(
            &ShortName::parse(name).unwrap(),
            attr,
            2,
            10,
            FatTimestamp::default(),
        );
        dir[slot * DIR_ENTRY_SIZE..(slot + 1) * DIR_ENTRY_SIZE].copy_from_slice(&raw);
    }

    #[test]
    fn search_skips_deleted_and_labels() {
        let mut dir = vec![0u8; 8 * DIR_ENTRY_SIZE];
        put(&mut dir, 0, "FLOPPY", ATTR_VOLUME_LABEL);
        put(&mut dir, 1, "A.TXT", ATTR_ARCHIVE);
        dir[DIR_ENTRY_SIZE] = 0xE5;
        put(&mut dir, 2, "B.TXT", ATTR_ARCHIVE);

        assert!(search(&dir, "FLOPPY").is_none());
        assert!(search(&dir, "A.TXT").is_none());
        let (index, de) = search(&dir, "B.TXT").unwrap();
        assert_eq!(index, 2);
        assert_eq!(de.size, 10);
    }

    #[test]
    fn search_is_case_sensitive() {
        let mut dir = vec![0u8; 4 * DIR_ENTRY_SIZE];
        put(&mut dir, 0, "A.TXT", ATTR_ARCHIVE);
        assert!(search(&dir, "a.txt").is_none());
        assert!(search(&dir, "A.TXT").is_some());
    }

    #[test]
    fn search_stops_at_end_marker() {
        let mut dir = vec![0u8; 4 * DIR_ENTRY_SIZE];
        put(&mut dir, 2, "LATE.TXT", ATTR_ARCHIVE);
        assert!(search(&dir, "LATE.TXT").is_none());
        assert!(parse_directory_entries(&dir).is_empty());
    }

    #[test]
    fn free_slot_prefers_first_deleted() {
        let mut dir = vec![0u8; 4 * DIR_ENTRY_SIZE];
        put(&mut dir, 0, "A.TXT", ATTR_ARCHIVE);
        put(&mut dir, 1, "B.TXT", ATTR_ARCHIVE);
        assert_eq!(find_free_slot(&dir), Some(2));
        dir[0] = 0xE5;
        assert_eq!(find_free_slot(&dir), Some(0));
    }

    #[test]
    fn full_directory_has_no_free_slot() {
        let mut dir = vec![0u8; 2 * DIR_ENTRY_SIZE];
        put(&mut dir, 0, "A.TXT", ATTR_ARCHIVE);
        put(&mut dir, 1, "B.TXT", ATTR_ARCHIVE);
        assert_eq!(find_free_slot(&dir), None);
        assert_eq!(parse_directory_entries(&dir).len(), 2);
    }
}
