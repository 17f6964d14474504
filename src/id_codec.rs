//! # Identifier codec
//!
//! Pure functions packing an exposure identifier and a detector number into one
//! integer key, and unpacking it again.
//!
//! ## Bit packing
//!
//! ```text
//! detector_exposure_id = exposure_id * 2^bits + detector_num      0 <= detector_num < 2^bits
//! (exposure_id, detector_num) = (packed >> bits, packed & (2^bits - 1))
//! ```
//!
//! `bits` belongs to the instrument and must never change once identifiers exist:
//! a different width decodes old identifiers into different pairs. A detector number
//! that does not fit is rejected with [`ObsInfoError::DetectorOutOfRange`], never
//! truncated, since a truncated number would collide with another detector.
//!
//! ## Decimal packing
//!
//! Older data keys use decimal concatenation instead: the detector number is zero
//! padded to the number of digits of the instrument's largest detector number and
//! appended to the exposure id (`2019031900001` + `29` → `2019031900001029`).
//!
//! ## Exposure identifiers
//!
//! [`compute_exposure_id`] builds the day/sequence exposure id `YYYYMMDDnnnnn`.
use crate::{
    constants::{DetectorExposureId, DetectorNum, ExposureId, MAX_SEQNUM, SEQNUM_DIGITS},
    obsinfo_errors::ObsInfoError,
    time::DayObs,
};

/// Largest supported bit width: detector numbers are 32-bit.
pub const MAX_DETECTOR_BITS: u32 = 32;

/// How an instrument combines exposure id and detector number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPacking {
    /// `exposure_id * 2^bits + detector_num`
    Bits(u32),
    /// Decimal concatenation, detector padded to the width of `max_num`
    Decimal { max_num: DetectorNum },
}

fn check_bits(bits: u32) -> Result<(), ObsInfoError> {
    if bits > MAX_DETECTOR_BITS {
        return Err(ObsInfoError::InvalidValue {
            field: "detector_exposure_id_bits",
            value: bits.to_string(),
        });
    }
    Ok(())
}

/// Pack `(exposure_id, detector_num)` with `bits` bits reserved for the detector.
///
/// Arguments
/// -----------------
/// * `exposure_id`: exposure identifier.
/// * `detector_num`: detector number, must satisfy `detector_num < 2^bits`.
/// * `bits`: detector bit width of the instrument (`0..=32`).
///
/// Return
/// ----------
/// * The packed identifier, [`ObsInfoError::DetectorOutOfRange`] when the detector
///   does not fit, or [`ObsInfoError::IdentifierOverflow`] when the result exceeds 64 bits.
pub fn encode(
    exposure_id: ExposureId,
    detector_num: DetectorNum,
    bits: u32,
) -> Result<DetectorExposureId, ObsInfoError> {
    check_bits(bits)?;
    let capacity = 1u64 << bits;
    if detector_num as u64 >= capacity {
        return Err(ObsInfoError::DetectorOutOfRange {
            detector_num: detector_num as u64,
            limit: format!("{bits} bits (max {})", capacity - 1),
        });
    }

    exposure_id
        .checked_mul(capacity)
        .map(|shifted| shifted | detector_num as u64)
        .ok_or(ObsInfoError::IdentifierOverflow { exposure_id })
}

/// Unpack an identifier produced by [`encode`] with the same `bits`.
pub fn decode(packed: DetectorExposureId, bits: u32) -> (ExposureId, DetectorNum) {
    let bits = bits.min(MAX_DETECTOR_BITS);
    let mask = (1u64 << bits) - 1;
    (packed >> bits, (packed & mask) as DetectorNum)
}

fn decimal_scale(max_num: DetectorNum) -> u64 {
    10u64.pow(max_num.to_string().len() as u32)
}

impl IdPacking {
    /// Pack `(exposure_id, detector_num)` according to the scheme.
    pub fn encode(
        &self,
        exposure_id: ExposureId,
        detector_num: DetectorNum,
    ) -> Result<DetectorExposureId, ObsInfoError> {
        match *self {
            IdPacking::Bits(bits) => encode(exposure_id, detector_num, bits),
            IdPacking::Decimal { max_num } => {
                if detector_num > max_num {
                    return Err(ObsInfoError::DetectorOutOfRange {
                        detector_num: detector_num as u64,
                        limit: format!("0..={max_num}"),
                    });
                }
                exposure_id
                    .checked_mul(decimal_scale(max_num))
                    .and_then(|shifted| shifted.checked_add(detector_num as u64))
                    .ok_or(ObsInfoError::IdentifierOverflow { exposure_id })
            }
        }
    }

    /// Unpack an identifier produced by [`IdPacking::encode`].
    pub fn decode(&self, packed: DetectorExposureId) -> (ExposureId, DetectorNum) {
        match *self {
            IdPacking::Bits(bits) => decode(packed, bits),
            IdPacking::Decimal { max_num } => {
                let scale = decimal_scale(max_num);
                (packed / scale, (packed % scale) as DetectorNum)
            }
        }
    }

    /// Number of distinct detector numbers the scheme can hold.
    pub fn capacity(&self) -> u64 {
        match *self {
            IdPacking::Bits(bits) => 1u64 << bits.min(MAX_DETECTOR_BITS),
            IdPacking::Decimal { max_num } => max_num as u64 + 1,
        }
    }
}

/// Smallest bit width able to hold `max_detectors` detector numbers.
pub fn bits_for_detectors(max_detectors: u32) -> u32 {
    match max_detectors {
        0 | 1 => 0,
        n => u32::BITS - (n - 1).leading_zeros(),
    }
}

/// Exposure id `YYYYMMDDnnnnn` from an observing day and a sequence number.
///
/// Return
/// ----------
/// * The exposure id, or [`ObsInfoError::InvalidValue`] if `seqnum` needs more
///   than five digits.
pub fn compute_exposure_id(day_obs: &DayObs, seqnum: u32) -> Result<ExposureId, ObsInfoError> {
    if seqnum > MAX_SEQNUM {
        return Err(ObsInfoError::InvalidValue {
            field: "sequence_num",
            value: seqnum.to_string(),
        });
    }
    Ok(day_obs.as_yyyymmdd() * 10u64.pow(SEQNUM_DIGITS) + seqnum as u64)
}

/// [`compute_exposure_id`] for a day given as text (`YYYYMMDD`, `YYYY-MM-DD` or ISO).
pub fn exposure_id_from_day_str(day_obs: &str, seqnum: u32) -> Result<ExposureId, ObsInfoError> {
    compute_exposure_id(&day_obs.parse()?, seqnum)
}

#[cfg(test)]
mod id_codec_test {
    use super::*;

    #[test]
    fn test_round_trip() {
        for bits in [0, 1, 7, 8, 10, 16] {
            let max = if bits == 0 { 0 } else { ((1u64 << bits) - 1) as u32 };
            for detector in [0, max / 2, max] {
                for exposure in [0u64, 1, 2019031900001, 201811151255111] {
                    let packed = encode(exposure, detector, bits).unwrap();
                    assert_eq!(decode(packed, bits), (exposure, detector));
                }
            }
        }
    }

    #[test]
    fn test_encode_values() {
        assert_eq!(encode(2019031900001, 29, 8).unwrap(), 2019031900001 * 256 + 29);
        assert_eq!(encode(2018092000065, 0, 0).unwrap(), 2018092000065);
    }

    #[test]
    fn test_detector_out_of_range() {
        let err = encode(1, 200, 7).unwrap_err();
        assert!(matches!(
            err,
            ObsInfoError::DetectorOutOfRange {
                detector_num: 200,
                ..
            }
        ));
        assert!(encode(1, 128, 7).is_err());
        assert!(encode(1, 127, 7).is_ok());
        assert!(encode(1, 1, 0).is_err());
    }

    #[test]
    fn test_bad_width_and_overflow() {
        assert!(matches!(
            encode(1, 0, 40),
            Err(ObsInfoError::InvalidValue { .. })
        ));
        assert_eq!(
            encode(u64::MAX >> 4, 1, 8),
            Err(ObsInfoError::IdentifierOverflow {
                exposure_id: u64::MAX >> 4
            })
        );
    }

    #[test]
    fn test_decimal_packing() {
        let packing = IdPacking::Decimal { max_num: 999 };
        assert_eq!(packing.encode(2019031900001, 29).unwrap(), 2019031900001029);
        assert_eq!(packing.decode(2019031900001029), (2019031900001, 29));
        assert_eq!(packing.encode(2019031900001, 999).unwrap(), 2019031900001999);
        assert!(packing.encode(2019031900001, 1000).is_err());

        let packing = IdPacking::Decimal { max_num: 3 };
        assert_eq!(packing.encode(20181205233148, 0).unwrap(), 201812052331480);
        assert_eq!(packing.capacity(), 4);
    }

    #[test]
    fn test_bits_for_detectors() {
        assert_eq!(bits_for_detectors(1), 0);
        assert_eq!(bits_for_detectors(2), 1);
        assert_eq!(bits_for_detectors(4), 2);
        assert_eq!(bits_for_detectors(205), 8);
        assert_eq!(bits_for_detectors(256), 8);
        assert_eq!(bits_for_detectors(257), 9);
    }

    #[test]
    fn test_compute_exposure_id() {
        assert_eq!(
            compute_exposure_id(&DayObs::new(2019, 3, 19), 1).unwrap(),
            2019031900001
        );
        assert_eq!(
            exposure_id_from_day_str("2018-09-20", 65).unwrap(),
            2018092000065
        );
        assert_eq!(
            exposure_id_from_day_str("2019-04-06T12:00:00", 643).unwrap(),
            2019040600643
        );
        assert!(compute_exposure_id(&DayObs::new(2019, 3, 19), 100_000).is_err());
        assert!(exposure_id_from_day_str("2019-4-6", 1).is_err());
    }
}
