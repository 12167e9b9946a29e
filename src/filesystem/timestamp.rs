/// Represents an instant in time, in the local time zone.
///
/// exFAT stores timestamps with a two-second date/time pair, an extra
/// 10-millisecond-increment byte and an offset from UTC in fifteen-minute
/// units. The date/time pair counts from 1980 but the fields here count from
/// 1970 so the same type can describe the Unix epoch.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub struct Timestamp {
    /// Add 1970 to this field to get the calendar year
    pub year_since_1970: u8,
    /// Add one to this value to get the calendar month
    pub zero_indexed_month: u8,
    /// Add one to this value to get the calendar day
    pub zero_indexed_day: u8,
    /// The number of hours past midnight
    pub hours: u8,
    /// The number of minutes past the hour
    pub minutes: u8,
    /// The number of seconds past the minute
    pub seconds: u8,
    /// Hundredths of a second past the whole second
    pub hundredths: u8,
    /// Offset from UTC, in minutes, as recorded on disk
    pub utc_offset_minutes: i16,
}

impl Timestamp {
    /// Create a `Timestamp` from the 16-bit exFAT date and time fields, plus
    /// the 10 ms and timezone bytes.
    ///
    /// exFAT date layout: bits [0,5) are the day (1-31), bits [5,9) the month
    /// (1-12) and bits [9,16) the year offset from 1980. Time layout: bits
    /// [0,5) are seconds divided by two, bits [5,11) the minutes and bits
    /// [11,16) the hours. The 10 ms byte counts 0-199 and carries whole
    /// seconds past 100. Any out-of-range field makes the whole timestamp
    /// invalid.
    pub fn from_exfat(date: u16, time: u16, ten_ms: u8, tz: u8) -> Result<Timestamp, &'static str> {
        let day = (date & 0x001F) as u8;
        let month = ((date >> 5) & 0x000F) as u8;
        let year = 1980 + (date >> 9);
        let double_seconds = (time & 0x001F) as u8;
        let minutes = ((time >> 5) & 0x003F) as u8;
        let hours = ((time >> 11) & 0x001F) as u8;
        if !(1..=31).contains(&day) {
            return Err("Bad day");
        }
        if !(1..=12).contains(&month) {
            return Err("Bad month");
        }
        if hours > 23 {
            return Err("Bad hours");
        }
        if minutes > 59 {
            return Err("Bad minutes");
        }
        if double_seconds > 29 {
            return Err("Bad seconds");
        }
        if ten_ms > 199 {
            return Err("Bad hundredths");
        }
        let magnitude = i16::from(tz & 0x3F) * 15;
        let utc_offset_minutes = if (tz & 0x40) != 0 {
            -magnitude
        } else {
            magnitude
        };
        Ok(Timestamp {
            year_since_1970: (year - 1970) as u8,
            zero_indexed_month: month - 1,
            zero_indexed_day: day - 1,
            hours,
            minutes,
            seconds: double_seconds * 2 + ten_ms / 100,
            hundredths: ten_ms % 100,
            utc_offset_minutes,
        })
    }

    /// Create a `Timestamp` from year/month/day/hour/minute/second.
    ///
    /// Values should be given as you'd write them (i.e. 1980, 01, 01, 13, 30,
    /// 05) is 1980-Jan-01, 1:30:05pm. The hundredths and UTC offset are zero.
    pub fn from_calendar(
        year: u16,
        month: u8,
        day: u8,
        hours: u8,
        minutes: u8,
        seconds: u8,
    ) -> Result<Timestamp, &'static str> {
        Ok(Timestamp {
            year_since_1970: if (1970..=(1970 + 255)).contains(&year) {
                (year - 1970) as u8
            } else {
                return Err("Bad year");
            },
            zero_indexed_month: if (1..=12).contains(&month) {
                month - 1
            } else {
                return Err("Bad month");
            },
            zero_indexed_day: if (1..=31).contains(&day) {
                day - 1
            } else {
                return Err("Bad day");
            },
            hours: if hours <= 23 {
                hours
            } else {
                return Err("Bad hours");
            },
            minutes: if minutes <= 59 {
                minutes
            } else {
                return Err("Bad minutes");
            },
            seconds: if seconds <= 59 {
                seconds
            } else {
                return Err("Bad seconds");
            },
            hundredths: 0,
            utc_offset_minutes: 0,
        })
    }
}

impl core::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "Timestamp({})", self)
    }
}

impl core::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}",
            u16::from(self.year_since_1970) + 1970,
            self.zero_indexed_month + 1,
            self.zero_indexed_day + 1,
            self.hours,
            self.minutes,
            self.seconds
        )
    }
}

// ****************************************************************************
//
// Unit Tests
//
// ****************************************************************************


// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
