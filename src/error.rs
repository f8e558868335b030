//! Error types for the fat12-raw library

use std::fmt;
use std::io;

/// Result type for fat12-raw operations
pub type Result<T> = std::result::Result<T, Fat12Error>;

/// Main error type for fat12-raw operations.
///
/// A missing file is not an error: lookups return `Option` and
/// [`Fat12Image::delete_file`](crate::Fat12Image::delete_file) returns `false`.
#[derive(Debug)]
pub enum Fat12Error {
    /// I/O error from loading or saving an image
    Io(io::Error),

    /// Boot sector too short or describing an impossible layout
    MalformedBootSector { reason: String },

    /// File already present in the root directory
    FileExists { name: String },

    /// No free cluster left in the data region
    OutOfSpace,

    /// No free slot left in the fixed-size root directory
    DirectoryFull,

    /// Name or extension longer than the 8.3 limits
    NameTooLong { name: String, max: usize },

    /// Name that cannot be stored as an 8.3 short name
    InvalidFileName { name: String, reason: String },
}

impl fmt::Display for Fat12Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::MalformedBootSector { reason } => write!(f, "Malformed boot sector: {}", reason),
            Self::FileExists { name } => write!(f, "File exists: {}", name),
            Self::OutOfSpace => write!(f, "Out of disk space"),
            Self::DirectoryFull => write!(f, "Root directory is full"),
            Self::NameTooLong { name, max } => {
                write!(f, "Name '{}' is too long (max {} characters)", name, max)
            }
            Self::InvalidFileName { name, reason } => {
                write!(f, "Invalid file name '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for Fat12Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Fat12Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

// Convenience constructors
impl Fat12Error {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedBootSector {
            reason: reason.into(),
        }
    }

    pub fn file_exists(name: impl Into<String>) -> Self {
        Self::FileExists { name: name.into() }
    }

    pub fn name_too_long(name: impl Into<String>, max: usize) -> Self {
        Self::NameTooLong {
            name: name.into(),
            max,
        }
    }

    pub fn invalid_file_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFileName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
