//! Packed DOS time/date fields and the clock used for modification stamps

use std::fmt;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};

/// Year stored as offset 0 in a packed date
pub const FAT_EPOCH_YEAR: u16 = 1980;

/// Broken-down modification timestamp with two-second resolution once packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatTimestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl FatTimestamp {
    /// Packs hour/minute/second as 5/6/5 bits, seconds halved.
    pub fn pack_time(&self) -> u16 {
        let hours = (self.hour as u16 & 0x1F) << 11;
        let minutes = (self.minute as u16 & 0x3F) << 5;
        let seconds = (self.second / 2) as u16 & 0x1F;
        hours | minutes | seconds
    }

    /// Packs year-1980/month/day as 7/4/5 bits. Years outside 1980..=2107 saturate.
    pub fn pack_date(&self) -> u16 {
        let offset = self.year.clamp(FAT_EPOCH_YEAR, FAT_EPOCH_YEAR + 0x7F) - FAT_EPOCH_YEAR;
        let year = (offset & 0x7F) << 9;
        let month = (self.month as u16 & 0x0F) << 5;
        let day = self.day as u16 & 0x1F;
        year | month | day
    }

    pub fn unpack(time: u16, date: u16) -> Self {
        Self {
            year: ((date >> 9) & 0x7F) + FAT_EPOCH_YEAR,
            month: ((date >> 5) & 0x0F) as u8,
            day: (date & 0x1F) as u8,
            hour: ((time >> 11) & 0x1F) as u8,
            minute: ((time >> 5) & 0x3F) as u8,
            second: ((time & 0x1F) * 2) as u8,
        }
    }
}

impl From<NaiveDateTime> for FatTimestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year().clamp(0, u16::MAX as i32) as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            // leap seconds are reported as second 59 plus nanoseconds
            second: dt.second().min(59) as u8,
        }
    }
}

impl fmt::Display for FatTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Source of modification timestamps for new directory entries.
pub trait Clock {
    fn now(&self) -> FatTimestamp;
}

/// Wall-clock time in the host's local time zone, as DOS stamps files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> FatTimestamp {
        Local::now().naive_local().into()
    }
}

/// Always returns the same timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub FatTimestamp);

impl Clock for FixedClock {
    fn now(&self) -> FatTimestamp {
        self.0
    }
}
