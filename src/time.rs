//! # Timestamps and observing days
//!
//! Helpers converting header timestamps into [`hifitime::Epoch`] values and deriving
//! the two canonical time fields:
//!
//! - `date_obs`: the begin-of-exposure timestamp as `YYYY-MM-DDTHH:MM:SS.sss`,
//!   expressed in the time scale the instrument writes its headers in.
//! - `day_obs`: the observing day, i.e. the calendar date of the timestamp after
//!   subtracting the rollover offset. With the default 8 hour offset an exposure
//!   taken at 07:59 belongs to the previous day.
use std::fmt;
use std::str::FromStr;

use hifitime::{Duration, Epoch, TimeScale, Unit};
use nom::{
    character::complete::{char, digit1, i32 as dec_i32, one_of, u8 as dec_u8},
    combinator::{all_consuming, opt},
    sequence::preceded,
    IResult, Parser,
};

use crate::{constants::ROLLOVER_HOURS, obsinfo_errors::ObsInfoError};

/// Rollover offset expressed as a [`Duration`].
pub fn rollover(hours: f64) -> Duration {
    Unit::Hour * hours
}

/// Default rollover offset (8 hours).
pub fn default_rollover() -> Duration {
    rollover(ROLLOVER_HOURS)
}

/// Build an epoch from a modified julian date in the given time scale.
pub fn epoch_from_mjd(mjd: f64, scale: TimeScale) -> Epoch {
    Epoch::from_mjd_in_time_scale(mjd, scale)
}

fn iso_date(input: &str) -> IResult<&str, (i32, u8, u8)> {
    (dec_i32, preceded(char('-'), dec_u8), preceded(char('-'), dec_u8)).parse(input)
}

fn iso_time(input: &str) -> IResult<&str, (u8, u8, u8, Option<&str>)> {
    (
        preceded(one_of("T "), dec_u8),
        preceded(char(':'), dec_u8),
        preceded(char(':'), dec_u8),
        opt(preceded(char('.'), digit1)),
    )
        .parse(input)
}

fn iso_timestamp(input: &str) -> IResult<&str, ((i32, u8, u8), Option<(u8, u8, u8, Option<&str>)>)> {
    let (rest, (date, time, _)) = (iso_date, opt(iso_time), opt(char('Z'))).parse(input)?;
    Ok((rest, (date, time)))
}

fn fraction_to_nanos(fraction: &str) -> u32 {
    let mut digits: String = fraction.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    digits.parse().unwrap_or(0)
}

/// Parse an ISO-8601 timestamp (`YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff][Z]`, a
/// space is accepted instead of `T`) in the given time scale.
pub fn parse_iso_timestamp(text: &str, scale: TimeScale) -> Result<Epoch, ObsInfoError> {
    let invalid = || ObsInfoError::InvalidTimestamp(text.to_string());

    let (_, ((year, month, day), time)) = all_consuming(iso_timestamp)
        .parse(text.trim())
        .map_err(|_| invalid())?;

    let (hour, minute, second, nanos) = match time {
        Some((h, m, s, frac)) => (h, m, s, frac.map(fraction_to_nanos).unwrap_or(0)),
        None => (0, 0, 0, 0),
    };

    Epoch::maybe_from_gregorian(year, month, day, hour, minute, second, nanos, scale)
        .map_err(|_| invalid())
}

fn gregorian(epoch: &Epoch, scale: TimeScale) -> (i32, u8, u8, u8, u8, u8, u32) {
    match scale {
        TimeScale::TAI => epoch.to_gregorian_tai(),
        _ => epoch.to_gregorian_utc(),
    }
}

/// Format an epoch as `YYYY-MM-DDTHH:MM:SS.sss` in the given time scale
/// (rounded to the millisecond).
pub fn iso_string(epoch: &Epoch, scale: TimeScale) -> String {
    let rounded = epoch.round(Unit::Millisecond * 1.0);
    let (y, mo, d, h, mi, s, ns) = gregorian(&rounded, scale);
    format!(
        "{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}.{:03}",
        ns / 1_000_000
    )
}

/// Calendar day of an observation after applying the rollover offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayObs {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl DayObs {
    pub fn new(year: i32, month: u8, day: u8) -> Self {
        DayObs { year, month, day }
    }

    /// Observing day of `begin`: the timestamp minus `rollover`, truncated to a date.
    ///
    /// Arguments
    /// -----------------
    /// * `begin`: begin-of-exposure epoch.
    /// * `scale`: time scale whose calendar defines the day.
    /// * `rollover`: offset subtracted before truncation.
    pub fn from_epoch(begin: &Epoch, scale: TimeScale, rollover: Duration) -> Self {
        let shifted = *begin - rollover;
        let (year, month, day, ..) = gregorian(&shifted, scale);
        DayObs { year, month, day }
    }

    /// Integer day code `YYYYMMDD`.
    pub fn as_yyyymmdd(&self) -> u64 {
        self.year as u64 * 10_000 + self.month as u64 * 100 + self.day as u64
    }
}

impl fmt::Display for DayObs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for DayObs {
    type Err = ObsInfoError;

    /// Accepts `YYYYMMDD`, `YYYY-MM-DD`, or an ISO timestamp (truncated at `T`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ObsInfoError::InvalidValue {
            field: "day_obs",
            value: s.to_string(),
        };

        let date = s.split('T').next().unwrap_or_default().replace('-', "");
        if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }

        let year = date[0..4].parse().map_err(|_| malformed())?;
        let month = date[4..6].parse().map_err(|_| malformed())?;
        let day = date[6..8].parse().map_err(|_| malformed())?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(malformed());
        }
        Ok(DayObs { year, month, day })
    }
}

/// Integer made of the decimal digits found in the first `width` characters of
/// an ISO timestamp string (`2018-07-24T10:41:56.8` → `201807241041568`).
pub fn timestamp_digits(iso: &str, width: usize) -> Result<u64, ObsInfoError> {
    let digits: String = iso
        .chars()
        .take(width)
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().map_err(|_| ObsInfoError::InvalidValue {
        field: "exposure_id",
        value: iso.to_string(),
    })
}

#[cfg(test)]
mod time_test {
    use super::*;

    #[test]
    fn test_parse_iso_timestamp() {
        let epoch = parse_iso_timestamp("2019-03-20T07:59:00Z", TimeScale::UTC).unwrap();
        assert_eq!(iso_string(&epoch, TimeScale::UTC), "2019-03-20T07:59:00.000");

        let epoch = parse_iso_timestamp("2018-07-24T10:41:56.85", TimeScale::UTC).unwrap();
        assert_eq!(iso_string(&epoch, TimeScale::UTC), "2018-07-24T10:41:56.850");

        let epoch = parse_iso_timestamp("2018-07-24 10:41:56", TimeScale::UTC).unwrap();
        assert_eq!(iso_string(&epoch, TimeScale::UTC), "2018-07-24T10:41:56.000");

        let epoch = parse_iso_timestamp("2018-07-24", TimeScale::TAI).unwrap();
        assert_eq!(iso_string(&epoch, TimeScale::TAI), "2018-07-24T00:00:00.000");
    }

    #[test]
    fn test_parse_iso_timestamp_errors() {
        assert!(parse_iso_timestamp("2019-13-20T07:59:00", TimeScale::UTC).is_err());
        assert!(parse_iso_timestamp("yesterday", TimeScale::UTC).is_err());
        assert!(parse_iso_timestamp("2019-03-20T07:59", TimeScale::UTC).is_err());
    }

    #[test]
    fn test_day_obs_rollover() {
        let before = parse_iso_timestamp("2019-03-20T07:59:00Z", TimeScale::UTC).unwrap();
        let after = parse_iso_timestamp("2019-03-20T08:01:00Z", TimeScale::UTC).unwrap();

        let day = DayObs::from_epoch(&before, TimeScale::UTC, default_rollover());
        assert_eq!(day.to_string(), "2019-03-19");
        assert_eq!(day.as_yyyymmdd(), 20190319);

        let day = DayObs::from_epoch(&after, TimeScale::UTC, default_rollover());
        assert_eq!(day.to_string(), "2019-03-20");
    }

    #[test]
    fn test_day_obs_without_rollover() {
        let before = parse_iso_timestamp("2019-03-20T07:59:00Z", TimeScale::UTC).unwrap();
        let day = DayObs::from_epoch(&before, TimeScale::UTC, rollover(0.0));
        assert_eq!(day, DayObs::new(2019, 3, 20));
    }

    #[test]
    fn test_day_obs_from_str() {
        assert_eq!("20190319".parse::<DayObs>().unwrap(), DayObs::new(2019, 3, 19));
        assert_eq!("2019-03-19".parse::<DayObs>().unwrap(), DayObs::new(2019, 3, 19));
        assert_eq!(
            "2019-03-19T22:10:00".parse::<DayObs>().unwrap(),
            DayObs::new(2019, 3, 19)
        );
        assert!("2019-3-19".parse::<DayObs>().is_err());
        assert!("20191319".parse::<DayObs>().is_err());
    }

    #[test]
    fn test_timestamp_digits() {
        assert_eq!(
            timestamp_digits("2018-07-24T10:41:56.852", 21).unwrap(),
            201807241041568
        );
        assert_eq!(
            timestamp_digits("2018-12-05T23:31:48.123", 19).unwrap(),
            20181205233148
        );
        assert!(timestamp_digits("", 19).is_err());
    }

    #[test]
    fn test_mjd_epoch() {
        let epoch = epoch_from_mjd(58562.5, TimeScale::UTC);
        assert_eq!(iso_string(&epoch, TimeScale::UTC), "2019-03-20T12:00:00.000");
    }
}
