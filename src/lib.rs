//! FAT12-raw: A lightweight Rust library for reading and modifying FAT12 floppy disk images

pub mod error;
pub mod fat12;

// Re-export main types
pub use error::{Fat12Error, Result};
pub use fat12::format::FloppyLayout;
pub use fat12::timestamp::{Clock, FatTimestamp, FixedClock, SystemClock};
pub use fat12::{volume::Fat12Image, DirectoryEntry, Geometry, ShortName};
