//! # Instrument profiles
//!
//! Every supported camera is described by an [`InstrumentProfile`]: a read-only
//! value naming the keywords and the per-field strategies the header normalizer
//! applies, the identifier packing, the observing-day rollover and the detector
//! name table. Profiles are built once (see [`Instrument::profile`]) and can be
//! shared between threads.
//!
//! | Instrument    | Begin timestamp      | Exposure id            | Detector    | Packing |
//! |---------------|----------------------|------------------------|-------------|---------|
//! | `lsstCam`     | `MJD-OBS` (TAI)      | `DAYOBS` + `SEQNUM`    | keywords    | 8 bits  |
//! | `comCam`      | `MJD-OBS` (TAI)      | `DAYOBS` + `SEQNUM`    | keywords    | 4 bits  |
//! | `LATISS`      | `MJD-OBS` (TAI)      | `DAYOBS` + `SEQNUM`    | fixed       | 0 bits  |
//! | `LSST-TS8`    | `MJD-OBS` (UTC)      | `DATE-OBS` digits (21) | serial      | 8 bits  |
//! | `LSST-TS3`    | `MJD-OBS` (UTC)      | `DATE-OBS` digits (21) | serial      | 10 bits |
//! | `LSST-UCDCam` | `MJD` (UTC)          | begin digits (19)      | serial      | 2 bits  |
//! | `ImSim`       | `MJD-OBS` (TAI)      | `OBSID`                | keywords    | 8 bits  |
//!
//! Every profile falls back to an ISO `DATE-OBS` when its MJD keywords are missing.
//!
//! ## See also
//! ------------
//! * [`detector_table`] – Detector name, number and serial tables.
//! * [`crate::translate`] – Applies a profile to a raw header.
pub mod bimap;
pub mod detector_table;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use hifitime::{Duration, Epoch, TimeScale};

use crate::{
    constants::{
        DetectorExposureId, DetectorNum, ExposureId, Seconds, MAX_DAY_OBS, MAX_SEQNUM,
        MISSING_EXPOSURE_TIME, SINGLE_DETECTOR_GROUP, SINGLE_DETECTOR_NAME,
    },
    diagnostics::{DiagnosticKind, Diagnostics},
    header::RawHeader,
    id_codec::{bits_for_detectors, compute_exposure_id, IdPacking},
    obsinfo_errors::ObsInfoError,
    time::{default_rollover, parse_iso_timestamp, timestamp_digits, DayObs},
};
use detector_table::{
    DetectorTable, COMCAM_TABLE, IMSIM_TABLE, LSSTCAM_TABLE, TS3_TABLE, TS8_TABLE, UCDCAM_TABLE,
};

/// Supported instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    LsstCam,
    ComCam,
    Latiss,
    Ts8,
    Ts3,
    UcdCam,
    ImSim,
}

impl Instrument {
    pub const ALL: [Instrument; 7] = [
        Instrument::LsstCam,
        Instrument::ComCam,
        Instrument::Latiss,
        Instrument::Ts8,
        Instrument::Ts3,
        Instrument::UcdCam,
        Instrument::ImSim,
    ];

    /// Canonical instrument name, as stored in the translated observation.
    pub fn name(&self) -> &'static str {
        match self {
            Instrument::LsstCam => "lsstCam",
            Instrument::ComCam => "comCam",
            Instrument::Latiss => "LATISS",
            Instrument::Ts8 => "LSST-TS8",
            Instrument::Ts3 => "LSST-TS3",
            Instrument::UcdCam => "LSST-UCDCam",
            Instrument::ImSim => "ImSim",
        }
    }

    /// Whether this instrument recognises the header.
    pub fn matches(&self, header: &RawHeader) -> bool {
        let is = |key: &str, value: &str| header.get_str(key).is_some_and(|v| v.trim() == value);
        let instrume = header
            .get_str("INSTRUME")
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_default();

        match self {
            Instrument::UcdCam => {
                is("ORIGIN", "UCDAVIS") && is("INSTRUME", "SAO") && is("TSTAND", "LSST_OPTICAL_SIMULATOR")
            }
            Instrument::ImSim => is("TESTTYPE", "IMSIM"),
            Instrument::Ts3 => is("TSTAND", "BNL-TS3-2-Janeway"),
            Instrument::Ts8 => {
                is("TSTAND", "TS8")
                    || (header.contains_key("LSST_NUM")
                        && header.contains_key("REBNAME")
                        && header.contains_key("CONTNUM"))
            }
            Instrument::Latiss => {
                instrume == "latiss" || instrume == "lsst_atiss" || is("DETNAME", "RXX_S00")
            }
            Instrument::ComCam => instrume == "comcam" && is("TELESCOP", "LSST"),
            Instrument::LsstCam => instrume == "lsstcam",
        }
    }

    /// Pick the instrument a header was written by.
    ///
    /// Test stands are checked before cameras since their headers may carry a
    /// misleading `INSTRUME`.
    pub fn detect(header: &RawHeader) -> Result<Instrument, ObsInfoError> {
        const ORDER: [Instrument; 7] = [
            Instrument::UcdCam,
            Instrument::ImSim,
            Instrument::Ts3,
            Instrument::Ts8,
            Instrument::Latiss,
            Instrument::ComCam,
            Instrument::LsstCam,
        ];
        ORDER
            .into_iter()
            .find(|instrument| instrument.matches(header))
            .ok_or_else(|| {
                ObsInfoError::UnknownInstrument(
                    header
                        .get_str("INSTRUME")
                        .unwrap_or("no INSTRUME keyword")
                        .to_string(),
                )
            })
    }

    /// Built-in profile of the instrument.
    pub fn profile(&self) -> Result<InstrumentProfile, ObsInfoError> {
        let table = |data: &str| DetectorTable::from_csv_str(data).map(Arc::new);
        let single = || Arc::new(DetectorTable::default());

        let base = InstrumentProfile {
            instrument: *self,
            telescope: Some("LSST"),
            id_packing: IdPacking::Bits(8),
            max_detectors: 1,
            rollover: default_rollover(),
            timestamp: TimestampSource {
                mjd_keys: &["MJD-OBS"],
                scale: TimeScale::TAI,
            },
            exposure_id: ExposureIdScheme::DayObsSeqNum,
            detector: DetectorScheme::Keywords {
                group_key: "RAFTBAY",
                name_key: "CCDSLOT",
            },
            detector_table: single(),
            filter: FilterStrategy::Joined(&["FILTER", "FILTER1", "FILTER2"]),
            observation_type: ObservationTypeStrategy::ImageType,
            observation_id: ObservationIdStrategy::Keyword("OBSID"),
            science_program: ScienceProgramStrategy::Keyword("RUNNUM"),
            missing_exposure_time: MISSING_EXPOSURE_TIME,
            on_mountain_since: None,
            amplifier_layout_source: self.name().to_string(),
        };

        let profile = match self {
            Instrument::LsstCam => InstrumentProfile {
                max_detectors: 205,
                detector_table: table(LSSTCAM_TABLE)?,
                ..base
            },
            Instrument::ComCam => InstrumentProfile {
                id_packing: IdPacking::Bits(4),
                max_detectors: 9,
                detector_table: table(COMCAM_TABLE)?,
                ..base
            },
            Instrument::Latiss => InstrumentProfile {
                telescope: Some("LSSTAuxTel"),
                id_packing: IdPacking::Bits(0),
                detector: DetectorScheme::Fixed {
                    group: SINGLE_DETECTOR_GROUP,
                    name: SINGLE_DETECTOR_NAME,
                    num: 0,
                },
                observation_type: ObservationTypeStrategy::Guess,
                science_program: ScienceProgramStrategy::Constant("unknown"),
                on_mountain_since: Some(Epoch::from_gregorian_utc_at_midnight(2020, 2, 1)),
                ..base
            },
            Instrument::Ts8 => InstrumentProfile {
                max_detectors: 250,
                timestamp: TimestampSource {
                    mjd_keys: &["MJD-OBS"],
                    scale: TimeScale::UTC,
                },
                exposure_id: ExposureIdScheme::DateObsDigits { digits: 21 },
                detector: DetectorScheme::Serial {
                    serial_key: "LSST_NUM",
                    group_key: Some("RAFTNAME"),
                },
                detector_table: table(TS8_TABLE)?,
                filter: FilterStrategy::WheelPosition("FILTPOS"),
                observation_id: ObservationIdStrategy::FilenameStem,
                ..base
            },
            Instrument::Ts3 => InstrumentProfile {
                id_packing: IdPacking::Bits(10),
                max_detectors: 1000,
                timestamp: TimestampSource {
                    mjd_keys: &["MJD-OBS"],
                    scale: TimeScale::UTC,
                },
                exposure_id: ExposureIdScheme::DateObsDigits { digits: 21 },
                detector: DetectorScheme::Serial {
                    serial_key: "LSST_NUM",
                    group_key: None,
                },
                detector_table: table(TS3_TABLE)?,
                filter: FilterStrategy::Keyword("FILTER"),
                observation_id: ObservationIdStrategy::FilenameStem,
                science_program: ScienceProgramStrategy::BeginDate,
                ..base
            },
            Instrument::UcdCam => InstrumentProfile {
                telescope: None,
                id_packing: IdPacking::Bits(2),
                max_detectors: 4,
                timestamp: TimestampSource {
                    mjd_keys: &["MJD"],
                    scale: TimeScale::UTC,
                },
                exposure_id: ExposureIdScheme::BeginDigits { digits: 19 },
                detector: DetectorScheme::Serial {
                    serial_key: "LSST_NUM",
                    group_key: None,
                },
                detector_table: table(UCDCAM_TABLE)?,
                filter: FilterStrategy::Lowercase("FILTER"),
                observation_id: ObservationIdStrategy::FilenameStem,
                science_program: ScienceProgramStrategy::BeginDate,
                ..base
            },
            Instrument::ImSim => InstrumentProfile {
                max_detectors: 189,
                exposure_id: ExposureIdScheme::Keyword("OBSID"),
                detector: DetectorScheme::Keywords {
                    group_key: "RAFTNAME",
                    name_key: "SENSNAME",
                },
                detector_table: table(IMSIM_TABLE)?,
                filter: FilterStrategy::Keyword("FILTER"),
                ..base
            },
        };
        profile.check()?;
        Ok(profile)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Instrument {
    type Err = ObsInfoError;

    /// Case-insensitive; accepts the canonical names and the usual aliases
    /// (`LSSTCam`, `LSST_ATISS`, `TS8`, `UCDCam`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lsstcam" => Ok(Instrument::LsstCam),
            "comcam" | "lsst-comcam" => Ok(Instrument::ComCam),
            "latiss" | "lsst_atiss" | "lsst_latiss" => Ok(Instrument::Latiss),
            "lsst-ts8" | "ts8" => Ok(Instrument::Ts8),
            "lsst-ts3" | "ts3" => Ok(Instrument::Ts3),
            "lsst-ucdcam" | "ucdcam" => Ok(Instrument::UcdCam),
            "imsim" => Ok(Instrument::ImSim),
            _ => Err(ObsInfoError::UnknownInstrument(s.to_string())),
        }
    }
}

/// Where the begin-of-exposure timestamp comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampSource {
    /// MJD keywords tried in order, before the ISO `DATE-OBS` fallback.
    pub mjd_keys: &'static [&'static str],
    /// Time scale of the header timestamps, also used to format `date_obs`.
    pub scale: TimeScale,
}

/// How the exposure id is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureIdScheme {
    /// `YYYYMMDD` observing day followed by the five digit sequence number.
    DayObsSeqNum,
    /// Decimal digits of the first `digits` characters of the `DATE-OBS` keyword.
    DateObsDigits { digits: usize },
    /// Decimal digits of the first `digits` characters of the begin timestamp.
    BeginDigits { digits: usize },
    /// Integer keyword.
    Keyword(&'static str),
}

/// How the detector is identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorScheme {
    /// Single detector camera.
    Fixed {
        group: &'static str,
        name: &'static str,
        num: DetectorNum,
    },
    /// Group and name keywords, number from the detector table. A `DETNAME`
    /// keyword (`R22_S11`) is used when the two keywords are missing.
    Keywords {
        group_key: &'static str,
        name_key: &'static str,
    },
    /// Detector serial looked up in the detector table. `group_key` names a
    /// keyword holding the group (`RTM-NNN`) when the table is not authoritative for it.
    Serial {
        serial_key: &'static str,
        group_key: Option<&'static str>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStrategy {
    /// Defined values joined with `+`, `NONE` when none is defined.
    Joined(&'static [&'static str]),
    /// Filter wheel position 2..6 → `g`, `r`, `i`, `z`, `y`.
    WheelPosition(&'static str),
    /// Keyword value lower-cased.
    Lowercase(&'static str),
    /// Keyword value as is.
    Keyword(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationTypeStrategy {
    /// `IMGTYPE` lower-cased, `skyexp` read as `science`.
    ImageType,
    /// `OBSTYPE`, `IMGTYPE` (and `GROUPID` before the instrument reached the
    /// mountain), otherwise `bias` for zero exposure time or `unknown`.
    Guess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationIdStrategy {
    Keyword(&'static str),
    /// `FILENAME` without directory and extension.
    FilenameStem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScienceProgramStrategy {
    Keyword(&'static str),
    Constant(&'static str),
    /// Begin date `YYYY-MM-DD`, for test stands without a run number.
    BeginDate,
}

/// Static description of one camera variant.
#[derive(Debug, Clone)]
pub struct InstrumentProfile {
    pub instrument: Instrument,
    pub telescope: Option<&'static str>,
    pub id_packing: IdPacking,
    /// Detector numbers are `0..max_detectors`.
    pub max_detectors: u32,
    pub rollover: Duration,
    pub timestamp: TimestampSource,
    pub exposure_id: ExposureIdScheme,
    pub detector: DetectorScheme,
    pub detector_table: Arc<DetectorTable>,
    pub filter: FilterStrategy,
    pub observation_type: ObservationTypeStrategy,
    pub observation_id: ObservationIdStrategy,
    pub science_program: ScienceProgramStrategy,
    /// Exposure time used when `EXPTIME` is missing.
    pub missing_exposure_time: Seconds,
    /// Data taken before this date come from the lab.
    pub on_mountain_since: Option<Epoch>,
    /// Key of the detector layouts in the geometry catalog.
    pub amplifier_layout_source: String,
}

impl InstrumentProfile {
    pub fn name(&self) -> &'static str {
        self.instrument.name()
    }

    fn check(&self) -> Result<(), ObsInfoError> {
        if self.max_detectors == 0 || self.max_detectors as u64 > self.id_packing.capacity() {
            return Err(ObsInfoError::InvalidValue {
                field: "max_detectors",
                value: format!(
                    "{} detectors do not fit in {:?}",
                    self.max_detectors, self.id_packing
                ),
            });
        }
        if let Some(max) = self.detector_table.max_num() {
            if max >= self.max_detectors {
                return Err(ObsInfoError::DetectorOutOfRange {
                    detector_num: max as u64,
                    limit: format!("{} detectors", self.max_detectors),
                });
            }
        }
        Ok(())
    }

    pub fn with_rollover(mut self, rollover: Duration) -> Self {
        self.rollover = rollover;
        self
    }

    /// Replace the detector table; every number in it must be below `max_detectors`.
    pub fn with_detector_table(mut self, table: DetectorTable) -> Result<Self, ObsInfoError> {
        self.detector_table = Arc::new(table);
        self.check()?;
        Ok(self)
    }

    /// Replace the identifier packing, sizing `max_detectors` to what it can hold
    /// when it is smaller than the current value.
    pub fn with_id_packing(mut self, packing: IdPacking) -> Result<Self, ObsInfoError> {
        self.id_packing = packing;
        self.max_detectors = self
            .max_detectors
            .min(packing.capacity().min(u32::MAX as u64) as u32);
        self.check()?;
        Ok(self)
    }

    /// Number of bits needed to hold every detector number of the instrument.
    pub fn required_detector_bits(&self) -> u32 {
        bits_for_detectors(self.max_detectors)
    }

    /// Detector-exposure id of `detector_num` within `exposure_id`.
    ///
    /// A single detector camera expects its fixed number; any other value is
    /// recorded as an [`DiagnosticKind::Ambiguous`] diagnostic and the fixed number
    /// is used.
    pub fn detector_exposure_id(
        &self,
        exposure_id: ExposureId,
        detector_num: DetectorNum,
        diags: &mut Diagnostics,
    ) -> Result<DetectorExposureId, ObsInfoError> {
        let detector_num = match self.detector {
            DetectorScheme::Fixed { num, .. } if num != detector_num => {
                diags.warn(
                    "detector_num",
                    DiagnosticKind::Ambiguous,
                    format!(
                        "unexpected detector number {detector_num} for {}, using {num}",
                        self.name()
                    ),
                );
                num
            }
            _ => detector_num,
        };
        if detector_num >= self.max_detectors {
            return Err(ObsInfoError::DetectorOutOfRange {
                detector_num: detector_num as u64,
                limit: format!("{} detectors of {}", self.max_detectors, self.name()),
            });
        }
        self.id_packing.encode(exposure_id, detector_num)
    }

    /// Largest detector-exposure id the instrument can produce before 2051.
    pub fn max_detector_exposure_id(&self) -> Result<DetectorExposureId, ObsInfoError> {
        let max_exposure_id = match self.exposure_id {
            ExposureIdScheme::DayObsSeqNum => {
                compute_exposure_id(&MAX_DAY_OBS.parse::<DayObs>()?, MAX_SEQNUM)?
            }
            ExposureIdScheme::DateObsDigits { digits } | ExposureIdScheme::BeginDigits { digits } => {
                timestamp_digits(&format!("{MAX_DAY_OBS}T23:59:59.999"), digits)?
            }
            ExposureIdScheme::Keyword(key) => {
                return Err(ObsInfoError::InvalidValue {
                    field: "exposure_id",
                    value: format!("{key} is not bounded"),
                })
            }
        };
        self.id_packing
            .encode(max_exposure_id, self.max_detectors - 1)
    }

    /// `true` for data taken on the mountain: after `on_mountain_since` when the
    /// profile has one, otherwise whenever the header names no test stand.
    pub fn is_on_mountain(&self, header: &RawHeader, begin: &Epoch) -> bool {
        match self.on_mountain_since {
            Some(since) => *begin > since,
            None => !header.contains_key("TSTAND"),
        }
    }

    /// Parse an ISO timestamp in the profile's time scale.
    pub fn parse_timestamp(&self, text: &str) -> Result<Epoch, ObsInfoError> {
        parse_iso_timestamp(text, self.timestamp.scale)
    }
}

#[cfg(test)]
mod instrument_test {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("LATISS".parse::<Instrument>().unwrap(), Instrument::Latiss);
        assert_eq!("LSSTCam".parse::<Instrument>().unwrap(), Instrument::LsstCam);
        assert_eq!("lsst-ts8".parse::<Instrument>().unwrap(), Instrument::Ts8);
        assert_eq!(
            "HSC".parse::<Instrument>(),
            Err(ObsInfoError::UnknownInstrument("HSC".into()))
        );
        for instrument in Instrument::ALL {
            assert_eq!(instrument.name().parse::<Instrument>().unwrap(), instrument);
        }
    }

    #[test]
    fn test_builtin_profiles_are_consistent() {
        for instrument in Instrument::ALL {
            let profile = instrument.profile().unwrap();
            assert!(profile.max_detectors as u64 <= profile.id_packing.capacity());
            if let IdPacking::Bits(bits) = profile.id_packing {
                assert!(profile.required_detector_bits() <= bits, "{instrument}");
            }
        }
    }

    #[test]
    fn test_detect() {
        let header = RawHeader::new().with("INSTRUME", "LATISS");
        assert_eq!(Instrument::detect(&header).unwrap(), Instrument::Latiss);

        let header = RawHeader::new()
            .with("INSTRUME", "ComCam")
            .with("TELESCOP", "LSST");
        assert_eq!(Instrument::detect(&header).unwrap(), Instrument::ComCam);

        let header = RawHeader::new().with("INSTRUME", "lsstCam");
        assert_eq!(Instrument::detect(&header).unwrap(), Instrument::LsstCam);

        let header = RawHeader::new()
            .with("LSST_NUM", "E2V-CCD250-179")
            .with("REBNAME", "LCA-13574-017")
            .with("CONTNUM", "0x189b7b6f");
        assert_eq!(Instrument::detect(&header).unwrap(), Instrument::Ts8);

        let header = RawHeader::new()
            .with("ORIGIN", "UCDAVIS")
            .with("INSTRUME", "SAO")
            .with("TSTAND", "LSST_OPTICAL_SIMULATOR");
        assert_eq!(Instrument::detect(&header).unwrap(), Instrument::UcdCam);

        let header = RawHeader::new().with("TESTTYPE", "IMSIM");
        assert_eq!(Instrument::detect(&header).unwrap(), Instrument::ImSim);

        let header = RawHeader::new().with("TSTAND", "BNL-TS3-2-Janeway");
        assert_eq!(Instrument::detect(&header).unwrap(), Instrument::Ts3);

        assert!(Instrument::detect(&RawHeader::new().with("INSTRUME", "HSC")).is_err());
    }

    #[test]
    fn test_max_detector_exposure_id() {
        let lsst = Instrument::LsstCam.profile().unwrap();
        assert_eq!(
            lsst.max_detector_exposure_id().unwrap(),
            2050123199999 * 256 + 204
        );

        let latiss = Instrument::Latiss.profile().unwrap();
        assert_eq!(latiss.max_detector_exposure_id().unwrap(), 2050123199999);

        let ts8 = Instrument::Ts8.profile().unwrap();
        assert_eq!(
            ts8.max_detector_exposure_id().unwrap(),
            205012312359599 * 256 + 249
        );

        assert!(Instrument::ImSim
            .profile()
            .unwrap()
            .max_detector_exposure_id()
            .is_err());
    }

    #[test]
    fn test_fixed_detector_mismatch_warns() {
        let latiss = Instrument::Latiss.profile().unwrap();
        let mut diags = Diagnostics::new();
        assert_eq!(
            latiss
                .detector_exposure_id(2018092000065, 0, &mut diags)
                .unwrap(),
            2018092000065
        );
        assert!(diags.is_empty());

        assert_eq!(
            latiss
                .detector_exposure_id(2018092000065, 3, &mut diags)
                .unwrap(),
            2018092000065
        );
        assert!(diags.has("detector_num", DiagnosticKind::Ambiguous));
    }

    #[test]
    fn test_detector_out_of_profile_range() {
        let lsst = Instrument::LsstCam.profile().unwrap();
        let mut diags = Diagnostics::new();
        assert!(matches!(
            lsst.detector_exposure_id(1, 205, &mut diags),
            Err(ObsInfoError::DetectorOutOfRange {
                detector_num: 205,
                ..
            })
        ));
    }

    #[test]
    fn test_builders() {
        let profile = Instrument::UcdCam
            .profile()
            .unwrap()
            .with_id_packing(IdPacking::Decimal { max_num: 3 })
            .unwrap()
            .with_rollover(crate::time::rollover(0.0));
        let mut diags = Diagnostics::new();
        assert_eq!(
            profile
                .detector_exposure_id(20181205233148, 0, &mut diags)
                .unwrap(),
            201812052331480
        );

        assert!(Instrument::LsstCam
            .profile()
            .unwrap()
            .with_id_packing(IdPacking::Bits(7))
            .is_err());

        let table = DetectorTable::from_csv_str("group,name,num,serial\nR00,S00,3,\n").unwrap();
        assert!(Instrument::ComCam
            .profile()
            .unwrap()
            .with_detector_table(table)
            .is_ok());
    }
}
