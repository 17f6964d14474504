use thiserror::Error;

use crate::header::{cards::HeaderCardError, sections::SectionError};

#[derive(Error, Debug)]
pub enum ObsInfoError {
    #[error("Required field '{field}' is missing: {reason}")]
    MissingField { field: &'static str, reason: String },

    #[error("Conflicting values for '{field}': {reason}")]
    AmbiguousField { field: &'static str, reason: String },

    #[error("Detector number {detector_num} does not fit in {limit}")]
    DetectorOutOfRange { detector_num: u64, limit: String },

    #[error("Identifier overflow while packing exposure {exposure_id}")]
    IdentifierOverflow { exposure_id: u64 },

    #[error("Malformed calibration id '{calib_id}': {reason}")]
    CalibIdFormat { calib_id: String, reason: String },

    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Amplifier assembly failed: {0}")]
    Assembly(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Unable to load detector table: {0}")]
    DetectorTable(String),

    #[error("Invalid header card: {0}")]
    InvalidHeader(#[from] HeaderCardError),

    #[error("Invalid IRAF section: {0}")]
    InvalidSection(#[from] SectionError),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<csv::Error> for ObsInfoError {
    fn from(err: csv::Error) -> Self {
        ObsInfoError::DetectorTable(err.to_string())
    }
}

impl PartialEq for ObsInfoError {
    fn eq(&self, other: &Self) -> bool {
        use ObsInfoError::*;
        match (self, other) {
            (MissingField { field: a, .. }, MissingField { field: b, .. }) => a == b,
            (AmbiguousField { field: a, .. }, AmbiguousField { field: b, .. }) => a == b,
            (
                DetectorOutOfRange {
                    detector_num: a, ..
                },
                DetectorOutOfRange {
                    detector_num: b, ..
                },
            ) => a == b,
            (IdentifierOverflow { exposure_id: a }, IdentifierOverflow { exposure_id: b }) => {
                a == b
            }
            (CalibIdFormat { calib_id: a, .. }, CalibIdFormat { calib_id: b, .. }) => a == b,
            (InvalidValue { field: a, value: x }, InvalidValue { field: b, value: y }) => {
                a == b && x == y
            }
            (InvalidTimestamp(a), InvalidTimestamp(b)) => a == b,
            (Assembly(a), Assembly(b)) => a == b,
            (UnknownInstrument(a), UnknownInstrument(b)) => a == b,
            (DetectorTable(a), DetectorTable(b)) => a == b,
            (InvalidHeader(a), InvalidHeader(b)) => a == b,
            (InvalidSection(a), InvalidSection(b)) => a == b,

            // io errors are not comparable: same variant is enough
            (IoError(_), IoError(_)) => true,

            _ => false,
        }
    }
}
