//! # Constants and type definitions for obsinfo
//!
//! This module centralizes the **fixed numbers** and **type aliases** shared by the
//! identifier codec, the header normalizer and the amplifier assembler.
//!
//! ## Overview
//!
//! - Observing-day conventions (rollover offset, sequence number width)
//! - Limits used to size identifiers
//! - Type aliases for identifiers and pixel planes

use nalgebra::DMatrix;

// -------------------------------------------------------------------------------------------------
// Observing-day conventions
// -------------------------------------------------------------------------------------------------

/// Default rollover offset in hours: the observing day starts at 08:00 on the timestamp's clock
pub const ROLLOVER_HOURS: f64 = 8.0;

/// Number of decimal digits reserved for the per-day sequence number in an exposure id
pub const SEQNUM_DIGITS: u32 = 5;

/// Largest sequence number that fits in [`SEQNUM_DIGITS`] digits
pub const MAX_SEQNUM: u32 = 99_999;

/// Last day used to size the largest exposure id an instrument may produce
pub const MAX_DAY_OBS: &str = "2050-12-31";

/// Residual (in nm) above which a monochromator wavelength read-back is reported
pub const WAVELENGTH_TOLERANCE: f64 = 0.1;

/// Single detector naming used by one-sensor cameras
pub const SINGLE_DETECTOR_GROUP: &str = "RXX";
pub const SINGLE_DETECTOR_NAME: &str = "S00";

/// Exposure time reported when a header has no `EXPTIME`
pub const MISSING_EXPOSURE_TIME: f64 = -1.0;

/// Value used when a filter cannot be determined
pub const NO_FILTER: &str = "NONE";

/// Value used for descriptive string fields without a source
pub const UNKNOWN: &str = "unknown";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Exposure identifier (day code + sequence, or timestamp digits)
pub type ExposureId = u64;
/// Packed (exposure, detector) identifier
pub type DetectorExposureId = u64;
/// Detector number within an instrument
pub type DetectorNum = u32;
/// Seconds
pub type Seconds = f64;
/// Degrees
pub type Degree = f64;

/// Image plane of one amplifier or one detector (rows = y, columns = x)
pub type ImagePlane = DMatrix<f32>;
/// Mask plane (bit flags)
pub type MaskPlane = DMatrix<i32>;
