//! # Calibration identifiers
//!
//! Calibration products carry a `CALIB_ID` header value written by the process
//! that built them:
//!
//! ```text
//! raftName=R22 detectorName=S11 detector=97 filter=NONE calibDate=2019-03-19
//! ```
//!
//! Grammar: tokens separated by whitespace, every token is `key=value` where the
//! key contains no `=` and the value is non-empty. There is no quoting or
//! escaping. A malformed token makes the whole string invalid.
use nom::{
    bytes::complete::{take_till1, take_while1},
    character::complete::char,
    combinator::all_consuming,
    sequence::separated_pair,
    IResult, Parser,
};

use crate::{
    constants::DetectorNum,
    instrument::{DetectorScheme, InstrumentProfile},
    obsinfo_errors::ObsInfoError,
};

fn key_value(token: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(take_till1(|c: char| c == '='), char('='), take_while1(|_: char| true)).parse(token)
}

fn format_error(calib_id: &str, reason: impl Into<String>) -> ObsInfoError {
    ObsInfoError::CalibIdFormat {
        calib_id: calib_id.to_string(),
        reason: reason.into(),
    }
}

/// Value of `key` in a calibration identifier.
///
/// Arguments
/// -----------------
/// * `calib_id`: the `key=value ...` string.
/// * `key`: the case-sensitive key to look up.
///
/// Return
/// ----------
/// * The value (without surrounding whitespace), or [`ObsInfoError::CalibIdFormat`]
///   if a token is not `key=value` or if `key` is absent. When a key is repeated
///   the last occurrence wins.
pub fn parse_field<'a>(calib_id: &'a str, key: &str) -> Result<&'a str, ObsInfoError> {
    let mut found = None;
    for token in calib_id.split_whitespace() {
        let (_, (k, v)) = all_consuming(key_value)
            .parse(token)
            .map_err(|_| format_error(calib_id, format!("malformed token '{token}'")))?;
        if k == key {
            found = Some(v);
        }
    }
    found.ok_or_else(|| format_error(calib_id, format!("no '{key}' field")))
}

/// Integer value of `key`; non-numeric content is an [`ObsInfoError::InvalidValue`].
pub fn parse_int_field(calib_id: &str, key: &'static str) -> Result<i64, ObsInfoError> {
    let value = parse_field(calib_id, key)?;
    value.parse().map_err(|_| ObsInfoError::InvalidValue {
        field: key,
        value: value.to_string(),
    })
}

/// Fields of a calibration identifier used to file a calibration product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibInfo {
    pub raft_name: String,
    pub detector_name: String,
    pub detector: DetectorNum,
    pub filter: String,
    pub calib_date: String,
}

impl CalibInfo {
    /// Parse the `raftName`, `detectorName`, `detector`, `filter` and
    /// `calibDate` fields. Single detector instruments always report their fixed
    /// group as the raft name.
    pub fn from_calib_id(calib_id: &str, profile: &InstrumentProfile) -> Result<Self, ObsInfoError> {
        let raft_name = match profile.detector {
            DetectorScheme::Fixed { group, .. } => group.to_string(),
            _ => parse_field(calib_id, "raftName")?.to_string(),
        };

        let detector = parse_int_field(calib_id, "detector")?;
        let detector = DetectorNum::try_from(detector).map_err(|_| ObsInfoError::InvalidValue {
            field: "detector",
            value: detector.to_string(),
        })?;
        if detector >= profile.max_detectors {
            return Err(ObsInfoError::DetectorOutOfRange {
                detector_num: detector as u64,
                limit: format!("{} detectors of {}", profile.max_detectors, profile.name()),
            });
        }

        Ok(CalibInfo {
            raft_name,
            detector_name: parse_field(calib_id, "detectorName")?.to_string(),
            detector,
            filter: parse_field(calib_id, "filter")?.to_string(),
            calib_date: parse_field(calib_id, "calibDate")?.to_string(),
        })
    }
}
