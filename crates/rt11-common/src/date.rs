//! Packed directory dates
//!
//! A date word holds a 2-bit era (32-year epoch), a 4-bit month, a 5-bit
//! day and a 5-bit year within the era:
//!
//! ```text
//!  15 14 | 13 12 11 10 | 9 8 7 6 5 | 4 3 2 1 0
//!   era  |    month    |    day    | year - (1972 + 32 * era)
//! ```
//!
//! The all-zero word means "no date". Representable years are 1972-2099.

use crate::error::{Error, Result};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;

/// First representable year
pub const BASE_YEAR: i32 = 1972;

/// Last representable year
pub const MAX_YEAR: i32 = 2099;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A calendar date that fits the packed directory format
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RtDate {
    year: i32,
    month: u32,
    day: u32,
}

impl RtDate {
    /// Create a date, rejecting anything the packed word cannot hold
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        if !(BASE_YEAR..=MAX_YEAR).contains(&year)
            || !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
        {
            return Err(Error::InvalidDate { year, month, day });
        }
        Ok(Self { year, month, day })
    }

    /// Today's local date, if it is inside the representable range
    #[must_use]
    pub fn today() -> Option<Self> {
        let now = chrono::Local::now().date_naive();
        Self::new(now.year(), now.month(), now.day()).ok()
    }

    /// Parse `dd-MMM-yy` (e.g. `15-JAN-97`)
    ///
    /// Two-digit years 72-99 map to 1972-1999 and 00-71 to 2000-2071.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_argument(format!("invalid date {s:?}, expected dd-MMM-yy"));

        let mut parts = s.split('-');
        let (Some(day), Some(month), Some(year), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if day.len() != 2 || month.len() != 3 || year.len() != 2 {
            return Err(invalid());
        }

        let day: u32 = day.parse().map_err(|_| invalid())?;
        let month = MONTH_NAMES
            .iter()
            .position(|m| m.eq_ignore_ascii_case(month))
            .and_then(|i| u32::try_from(i + 1).ok())
            .ok_or_else(invalid)?;
        let year2: i32 = year.parse().map_err(|_| invalid())?;
        let year = if year2 >= 72 { 1900 + year2 } else { 2000 + year2 };

        Self::new(year, month, day)
    }

    /// Decode a packed word; `None` for the empty word or impossible fields
    #[must_use]
    pub fn from_word(word: u16) -> Option<Self> {
        if word == 0 {
            return None;
        }
        let era = i32::from((word >> 14) & 0x3);
        let month = u32::from((word >> 10) & 0xF);
        let day = u32::from((word >> 5) & 0x1F);
        let year_low = i32::from(word & 0x1F);

        Self::new(BASE_YEAR + 32 * era + year_low, month, day).ok()
    }

    /// Pack into a directory date word
    #[must_use]
    pub fn to_word(&self) -> u16 {
        let offset = self.year - BASE_YEAR;
        let era = (offset / 32).min(3);
        let year_low = offset - era * 32;

        // Fields are range-checked in `new`, so every cast below is lossless.
        let era = (era as u16) & 0x3;
        let year_low = (year_low as u16) & 0x1F;
        let month = (self.month as u16) & 0xF;
        let day = (self.day as u16) & 0x1F;

        (era << 14) | (month << 10) | (day << 5) | year_low
    }

    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    #[must_use]
    pub const fn day(&self) -> u32 {
        self.day
    }
}

impl fmt::Display for RtDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let month = MONTH_NAMES[(self.month - 1) as usize];
        write!(f, "{:02}-{}-{:02}", self.day, month, self.year % 100)
    }
}

/// Format a raw date word for listings; blank (eight spaces) when absent or invalid
#[must_use]
pub fn format_date_word(word: u16) -> String {
    RtDate::from_word(word).map_or_else(|| " ".repeat(8), |d| d.to_string())
}
