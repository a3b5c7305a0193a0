//! Binary time tags: CP16Time2a, CP24Time2a and CP56Time2a.
//!
//! Decoded tags keep the raw calendar fields. Conversion to an absolute
//! [`chrono::NaiveDateTime`] is explicit: CP24 only carries minutes and
//! milliseconds, so it needs a reference instant; CP56 carries a two-digit
//! year resolved with a century pivot of 70 (`< 70` is 20xx).

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime, Timelike};

use crate::error::CodecError;

/// Two-digit years below this map to 20xx, the rest to 19xx.
pub const CENTURY_PIVOT: u8 = 70;

fn check_len(bytes: &[u8], needed: usize) -> Result<(), CodecError> {
    if bytes.len() < needed {
        return Err(CodecError::TruncatedBuffer {
            needed,
            remaining: bytes.len(),
        });
    }
    Ok(())
}

/// Two octet binary time: elapsed milliseconds (0..=59999 nominal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cp16Time2a(pub u16);

impl Cp16Time2a {
    /// Parse from 2 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        check_len(bytes, 2)?;
        Ok(Self(u16::from_le_bytes([bytes[0], bytes[1]])))
    }

    /// Encode to 2 bytes.
    pub fn to_bytes(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Elapsed time as a duration.
    pub fn as_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::from(self.0))
    }
}

/// Three octet binary time: milliseconds and minutes within the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cp24Time2a {
    /// Milliseconds (0-59999)
    pub milliseconds: u16,
    /// Minutes (0-59)
    pub minutes: u8,
    /// Invalid flag
    pub invalid: bool,
}

impl Cp24Time2a {
    /// Parse from 3 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        check_len(bytes, 3)?;
        let minutes = bytes[2] & 0x3F;
        if minutes > 59 {
            return Err(CodecError::MalformedTime("minute out of range"));
        }
        Ok(Self {
            milliseconds: u16::from_le_bytes([bytes[0], bytes[1]]),
            minutes,
            invalid: bytes[2] & 0x80 != 0,
        })
    }

    /// Encode to 3 bytes.
    pub fn to_bytes(&self) -> [u8; 3] {
        let ms = self.milliseconds.to_le_bytes();
        [
            ms[0],
            ms[1],
            (self.minutes & 0x3F) | if self.invalid { 0x80 } else { 0 },
        ]
    }

    /// Build from an absolute time, keeping minute and millisecond.
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self {
            milliseconds: (dt.second() * 1000 + dt.nanosecond() / 1_000_000 % 1000) as u16,
            minutes: dt.minute() as u8,
            invalid: false,
        }
    }

    /// Resolve against `reference`.
    ///
    /// The result is the latest instant not after `reference` whose minute and
    /// millisecond match the tag.
    pub fn to_datetime(&self, reference: NaiveDateTime) -> Result<NaiveDateTime, CodecError> {
        let hour = reference
            .date()
            .and_hms_opt(reference.hour(), 0, 0)
            .ok_or(CodecError::MalformedTime("reference out of range"))?;
        let candidate = hour
            + ChronoDuration::minutes(i64::from(self.minutes))
            + ChronoDuration::milliseconds(i64::from(self.milliseconds));
        if candidate > reference {
            Ok(candidate - ChronoDuration::hours(1))
        } else {
            Ok(candidate)
        }
    }
}

/// Seven octet binary time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cp56Time2a {
    /// Milliseconds (0-59999)
    pub milliseconds: u16,
    /// Minutes (0-59)
    pub minutes: u8,
    /// Hours (0-23)
    pub hours: u8,
    /// Day of month (1-31)
    pub day: u8,
    /// Day of week (1-7, 1=Monday, 0=unused)
    pub day_of_week: u8,
    /// Month (1-12)
    pub month: u8,
    /// Year (0-99)
    pub year: u8,
    /// Invalid flag
    pub invalid: bool,
    /// Summer time flag
    pub summer_time: bool,
}

impl Cp56Time2a {
    /// Parse from 7 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        check_len(bytes, 7)?;

        let milliseconds = u16::from_le_bytes([bytes[0], bytes[1]]);
        let minutes = bytes[2] & 0x3F;
        let invalid = (bytes[2] & 0x80) != 0;
        let hours = bytes[3] & 0x1F;
        let summer_time = (bytes[3] & 0x80) != 0;
        let day = bytes[4] & 0x1F;
        let day_of_week = (bytes[4] >> 5) & 0x07;
        let month = bytes[5] & 0x0F;
        let year = bytes[6] & 0x7F;

        if minutes > 59 {
            return Err(CodecError::MalformedTime("minute out of range"));
        }
        if hours > 23 {
            return Err(CodecError::MalformedTime("hour out of range"));
        }
        if !(1..=31).contains(&day) {
            return Err(CodecError::MalformedTime("day out of range"));
        }
        if !(1..=12).contains(&month) {
            return Err(CodecError::MalformedTime("month out of range"));
        }

        Ok(Self {
            milliseconds,
            minutes,
            hours,
            day,
            day_of_week,
            month,
            year,
            invalid,
            summer_time,
        })
    }

    /// Encode to 7 bytes.
    pub fn to_bytes(&self) -> [u8; 7] {
        let mut result = [0u8; 7];
        result[0] = (self.milliseconds & 0xFF) as u8;
        result[1] = ((self.milliseconds >> 8) & 0xFF) as u8;
        result[2] = (self.minutes & 0x3F) | if self.invalid { 0x80 } else { 0 };
        result[3] = (self.hours & 0x1F) | if self.summer_time { 0x80 } else { 0 };
        result[4] = (self.day & 0x1F) | ((self.day_of_week & 0x07) << 5);
        result[5] = self.month & 0x0F;
        result[6] = self.year & 0x7F;
        result
    }

    /// Build from an absolute time.
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self {
            milliseconds: (dt.second() * 1000 + dt.nanosecond() / 1_000_000 % 1000) as u16,
            minutes: dt.minute() as u8,
            hours: dt.hour() as u8,
            day: dt.day() as u8,
            day_of_week: dt.weekday().number_from_monday() as u8,
            month: dt.month() as u8,
            year: dt.year().rem_euclid(100) as u8,
            invalid: false,
            summer_time: false,
        }
    }

    /// Current local wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(chrono::Local::now().naive_local())
    }

    /// Full four-digit year.
    pub const fn full_year(&self) -> i32 {
        if self.year < CENTURY_PIVOT {
            2000 + self.year as i32
        } else {
            1900 + self.year as i32
        }
    }

    /// Convert to an absolute time. The weekday field is not checked.
    pub fn to_datetime(&self) -> Result<NaiveDateTime, CodecError> {
        let ms = u32::from(self.milliseconds);
        NaiveDate::from_ymd_opt(self.full_year(), u32::from(self.month), u32::from(self.day))
            .and_then(|date| {
                date.and_hms_milli_opt(
                    u32::from(self.hours),
                    u32::from(self.minutes),
                    ms / 1000,
                    ms % 1000,
                )
            })
            .ok_or(CodecError::MalformedTime("calendar date out of range"))
    }

    /// The CP24 part of this tag.
    pub const fn to_cp24(&self) -> Cp24Time2a {
        Cp24Time2a {
            milliseconds: self.milliseconds,
            minutes: self.minutes,
            invalid: self.invalid,
        }
    }
}

/// Time tag attached to an information object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeTag {
    /// CP24Time2a
    Cp24(Cp24Time2a),
    /// CP56Time2a
    Cp56(Cp56Time2a),
}

impl TimeTag {
    /// The seven octet tag, if present.
    pub const fn as_cp56(&self) -> Option<&Cp56Time2a> {
        match self {
            Self::Cp56(t) => Some(t),
            Self::Cp24(_) => None,
        }
    }

    /// Whether the IV flag is set.
    pub const fn is_invalid(&self) -> bool {
        match self {
            Self::Cp24(t) => t.invalid,
            Self::Cp56(t) => t.invalid,
        }
    }
}

impl From<Cp24Time2a> for TimeTag {
    fn from(t: Cp24Time2a) -> Self {
        Self::Cp24(t)
    }
}

impl From<Cp56Time2a> for TimeTag {
    fn from(t: Cp56Time2a) -> Self {
        Self::Cp56(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_milli_opt(h, mi, s, ms)
            .unwrap()
    }

    #[test]
    fn test_cp56_decode_vector() {
        // 2005-11-26 16:28:14.765, Saturday
        let t = Cp56Time2a::from_bytes(&[0xAD, 0x39, 0x1C, 0x10, 0xDA, 0x0B, 0x05]).unwrap();
        assert_eq!(t.milliseconds, 14765);
        assert_eq!(t.minutes, 28);
        assert_eq!(t.hours, 16);
        assert_eq!(t.day, 26);
        assert_eq!(t.day_of_week, 6);
        assert_eq!(t.month, 11);
        assert_eq!(t.year, 5);
        assert!(!t.invalid);
        assert!(!t.summer_time);
        assert_eq!(t.to_bytes(), [0xAD, 0x39, 0x1C, 0x10, 0xDA, 0x0B, 0x05]);
        assert_eq!(t.to_datetime().unwrap(), dt(2005, 11, 26, 16, 28, 14, 765));
    }

    #[test]
    fn test_cp56_flags() {
        let t = Cp56Time2a::from_bytes(&[0, 0, 0x80 | 5, 0x80 | 3, 1, 1, 99]).unwrap();
        assert!(t.invalid);
        assert!(t.summer_time);
        assert_eq!(t.hours, 3);
        assert_eq!(t.full_year(), 1999);
    }

    #[test]
    fn test_cp56_malformed() {
        assert_eq!(
            Cp56Time2a::from_bytes(&[0, 0, 60, 0, 1, 1, 0]),
            Err(CodecError::MalformedTime("minute out of range"))
        );
        assert_eq!(
            Cp56Time2a::from_bytes(&[0, 0, 0, 24, 1, 1, 0]),
            Err(CodecError::MalformedTime("hour out of range"))
        );
        assert_eq!(
            Cp56Time2a::from_bytes(&[0, 0, 0, 0, 0, 1, 0]),
            Err(CodecError::MalformedTime("day out of range"))
        );
        assert_eq!(
            Cp56Time2a::from_bytes(&[0, 0, 0, 0, 1, 13, 0]),
            Err(CodecError::MalformedTime("month out of range"))
        );
        assert_eq!(
            Cp56Time2a::from_bytes(&[0, 0, 0]),
            Err(CodecError::TruncatedBuffer {
                needed: 7,
                remaining: 3
            })
        );
    }

    #[test]
    fn test_cp56_invalid_calendar_date() {
        // 31 February passes field checks but is not a date
        let t = Cp56Time2a::from_bytes(&[0, 0, 0, 0, 31, 2, 24]).unwrap();
        assert!(t.to_datetime().is_err());
    }

    #[test]
    fn test_cp56_from_datetime() {
        let t = Cp56Time2a::from_datetime(dt(2024, 6, 15, 12, 30, 45, 123));
        assert_eq!(t.milliseconds, 45123);
        assert_eq!(t.minutes, 30);
        assert_eq!(t.hours, 12);
        assert_eq!(t.day, 15);
        assert_eq!(t.day_of_week, 6);
        assert_eq!(t.month, 6);
        assert_eq!(t.year, 24);
        assert_eq!(t.to_datetime().unwrap(), dt(2024, 6, 15, 12, 30, 45, 123));
    }

    #[test]
    fn test_cp24_decode() {
        let t = Cp24Time2a::from_bytes(&[0x10, 0x27, 0x85]).unwrap();
        assert_eq!(t.milliseconds, 10000);
        assert_eq!(t.minutes, 5);
        assert!(t.invalid);
        assert_eq!(t.to_bytes(), [0x10, 0x27, 0x85]);
        assert!(Cp24Time2a::from_bytes(&[0, 0, 61]).is_err());
    }

    #[test]
    fn test_cp24_to_datetime() {
        let tag = Cp24Time2a {
            milliseconds: 10_500,
            minutes: 20,
            invalid: false,
        };
        let reference = dt(2024, 1, 1, 8, 30, 0, 0);
        assert_eq!(tag.to_datetime(reference).unwrap(), dt(2024, 1, 1, 8, 20, 10, 500));

        // Tag later in the hour than the reference belongs to the previous hour
        let reference = dt(2024, 1, 1, 0, 10, 0, 0);
        assert_eq!(tag.to_datetime(reference).unwrap(), dt(2023, 12, 31, 23, 20, 10, 500));
    }

    #[test]
    fn test_cp16() {
        let t = Cp16Time2a::from_bytes(&[0xE8, 0x03]).unwrap();
        assert_eq!(t.0, 1000);
        assert_eq!(t.as_duration(), std::time::Duration::from_secs(1));
        assert_eq!(t.to_bytes(), [0xE8, 0x03]);
    }

    #[test]
    fn test_time_tag() {
        let t = Cp56Time2a::from_datetime(dt(2024, 6, 15, 12, 30, 45, 0));
        let tag = TimeTag::from(t);
        assert_eq!(tag.as_cp56(), Some(&t));
        assert!(!tag.is_invalid());
        assert!(TimeTag::from(t.to_cp24()).as_cp56().is_none());
    }
}
