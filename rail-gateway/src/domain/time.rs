//! Clock time handling for Darwin boards.
//!
//! Darwin provides board times as "HH:MM" strings with no date attached,
//! and callers of the delays endpoint pass departure times as compact
//! "HHmm" values. Both describe a time of day in UK local time, so the
//! only arithmetic we need is a signed difference that copes with services
//! running across midnight.

use std::fmt;

use chrono::{NaiveTime, Timelike};

/// Minutes in a day.
const MINUTES_PER_DAY: i64 = 24 * 60;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of day at minute precision.
///
/// # Examples
///
/// ```
/// use rail_gateway::domain::ClockTime;
///
/// let sched = ClockTime::parse_hhmm("22:11").unwrap();
/// let est = ClockTime::parse_hhmm("22:22").unwrap();
/// assert_eq!(est.minutes_since(sched), 11);
///
/// // Compact request form
/// assert_eq!(ClockTime::parse_compact("2211").unwrap(), sched);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    /// Build a clock time from hour and minute.
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, TimeError> {
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| TimeError::new("invalid time"))
    }

    /// Parse a time in Darwin's "HH:MM" format.
    ///
    /// # Examples
    ///
    /// ```
    /// use rail_gateway::domain::ClockTime;
    ///
    /// assert!(ClockTime::parse_hhmm("00:00").is_ok());
    /// assert!(ClockTime::parse_hhmm("23:59").is_ok());
    ///
    /// assert!(ClockTime::parse_hhmm("1430").is_err());
    /// assert!(ClockTime::parse_hhmm("On time").is_err());
    /// assert!(ClockTime::parse_hhmm("25:00").is_err());
    /// ```
    pub fn parse_hhmm(s: &str) -> Result<Self, TimeError> {
        let bytes = s.as_bytes();
        if bytes.len() != 5 {
            return Err(TimeError::new("expected HH:MM format"));
        }
        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;

        Self::from_hm(hour, minute)
    }

    /// Parse a time in the compact 24-hour "HHmm" format used in request paths.
    pub fn parse_compact(s: &str) -> Result<Self, TimeError> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return Err(TimeError::new("expected HHmm format"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        let minute = parse_two_digits(&bytes[2..4])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;

        Self::from_hm(hour, minute)
    }

    /// Take the time of day from a chrono time, dropping seconds.
    pub fn from_time(time: NaiveTime) -> Self {
        // hour/minute of a valid NaiveTime are always in range
        Self::from_hm(time.hour(), time.minute()).unwrap_or(Self(NaiveTime::MIN))
    }

    /// Minutes after midnight.
    pub fn minutes_of_day(&self) -> i64 {
        i64::from(self.0.hour()) * 60 + i64::from(self.0.minute())
    }

    /// Signed minutes from `earlier` to `self`.
    ///
    /// Clock times carry no date, so the result is taken as the nearest
    /// interpretation: always within [-720, 720). A 23:55 schedule with an
    /// 00:05 estimate is 10 minutes late, not 1430 minutes early.
    pub fn minutes_since(&self, earlier: ClockTime) -> i64 {
        let raw = self.minutes_of_day() - earlier.minutes_of_day();
        let half = MINUTES_PER_DAY / 2;
        (raw + half).rem_euclid(MINUTES_PER_DAY) - half
    }
}

impl fmt::Debug for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClockTime({})", self)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

/// Parse exactly two ASCII digits into a number.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let tens = bytes[0];
    let ones = bytes[1];
    if !tens.is_ascii_digit() || !ones.is_ascii_digit() {
        return None;
    }
    Some(u32::from(tens - b'0') * 10 + u32::from(ones - b'0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> ClockTime {
        ClockTime::parse_hhmm(s).unwrap()
    }

    #[test]
    fn parse_valid_times() {
        assert_eq!(t("00:00").minutes_of_day(), 0);
        assert_eq!(t("12:30").minutes_of_day(), 750);
        assert_eq!(t("23:59").minutes_of_day(), 1439);
    }

    #[test]
    fn reject_status_words() {
        for word in ["On time", "Delayed", "Cancelled", "No Report", "Starts Here", ""] {
            assert!(ClockTime::parse_hhmm(word).is_err(), "{word} should not parse");
        }
    }

    #[test]
    fn reject_out_of_range() {
        assert!(ClockTime::parse_hhmm("24:00").is_err());
        assert!(ClockTime::parse_hhmm("12:60").is_err());
        assert!(ClockTime::parse_compact("2400").is_err());
        assert!(ClockTime::parse_compact("0960").is_err());
    }

    #[test]
    fn compact_format() {
        assert_eq!(ClockTime::parse_compact("0729").unwrap(), t("07:29"));
        assert!(ClockTime::parse_compact("07:29").is_err());
        assert!(ClockTime::parse_compact("729").is_err());
        assert!(ClockTime::parse_compact("ab12").is_err());
    }

    #[test]
    fn minutes_since_same_day() {
        assert_eq!(t("22:22").minutes_since(t("22:11")), 11);
        assert_eq!(t("22:11").minutes_since(t("22:22")), -11);
        assert_eq!(t("10:00").minutes_since(t("10:00")), 0);
    }

    #[test]
    fn minutes_since_across_midnight() {
        assert_eq!(t("00:05").minutes_since(t("23:55")), 10);
        assert_eq!(t("23:55").minutes_since(t("00:05")), -10);
    }

    #[test]
    fn minutes_since_half_day_boundary() {
        assert_eq!(t("12:00").minutes_since(t("00:00")), -720);
        assert_eq!(t("11:59").minutes_since(t("00:00")), 719);
    }

    #[test]
    fn display_pads() {
        assert_eq!(t("07:05").to_string(), "07:05");
        assert_eq!(format!("{:?}", t("07:05")), "ClockTime(07:05)");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Display then parse returns the same time
        #[test]
        fn display_roundtrip(h in 0u32..24, m in 0u32..60) {
            let time = ClockTime::from_hm(h, m).unwrap();
            prop_assert_eq!(ClockTime::parse_hhmm(&time.to_string()).unwrap(), time);
        }

        /// Differences are antisymmetric except at the half-day boundary
        #[test]
        fn minutes_since_antisymmetric(a in 0u32..1440, b in 0u32..1440) {
            let x = ClockTime::from_hm(a / 60, a % 60).unwrap();
            let y = ClockTime::from_hm(b / 60, b % 60).unwrap();
            let d = x.minutes_since(y);
            prop_assert!((-720..720).contains(&d));
            if d != -720 {
                prop_assert_eq!(y.minutes_since(x), -d);
            }
        }
    }
}
