//! # Header normalizer
//!
//! Turns a [`RawHeader`] into a [`CanonicalObservation`] following the strategies
//! declared by an [`InstrumentProfile`].
//!
//! A [`Translator`] lives for one header. Values needed by several fields (begin
//! timestamp, exposure time, observing day, sequence number, detector) are computed
//! once and cached in the translator; nothing is shared between translations, so
//! independent headers can be translated from any number of threads with the same
//! profile.
//!
//! ## Failure policy
//!
//! Descriptive fields never fail: a missing or unusable value is replaced by a
//! documented default and a [`Diagnostic`](crate::diagnostics::Diagnostic) is
//! recorded. Fields needed to build identifiers (begin timestamp, exposure id,
//! detector) fail with an [`ObsInfoError`] instead, since a guessed value would
//! produce a wrong storage key.
//!
//! ## Example
//!
//! ```rust, ignore
//! use obsinfo::{header::RawHeader, instrument::Instrument, translate::translate};
//!
//! let header = RawHeader::from_cards(&text)?;
//! let profile = Instrument::detect(&header)?.profile()?;
//! let translation = translate(&profile, &header)?;
//! println!("{}", translation.observation);
//! for event in translation.diagnostics.iter() {
//!     println!("{event}");
//! }
//! ```
pub mod observation;

use std::cell::RefCell;

use hifitime::Epoch;
use itertools::Itertools;
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;

use crate::{
    constants::{
        Degree, DetectorNum, ExposureId, Seconds, NO_FILTER, UNKNOWN, WAVELENGTH_TOLERANCE,
    },
    diagnostics::{DiagnosticKind, Diagnostics},
    fallback::{file_stem, first_str, resolve_or, resolve_with, trailing_number, Resolution},
    header::{HeaderValue, RawHeader},
    id_codec::compute_exposure_id,
    instrument::{
        detector_table::full_name, DetectorScheme, ExposureIdScheme, FilterStrategy, Instrument,
        InstrumentProfile, ObservationIdStrategy, ObservationTypeStrategy,
        ScienceProgramStrategy,
    },
    obsinfo_errors::ObsInfoError,
    time::{epoch_from_mjd, iso_string, timestamp_digits, DayObs},
};
pub use observation::{CanonicalObservation, Translation};

static RAFT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"RTM-\d\d\d").expect("raft name regex"));

/// Filters mounted at wheel positions 2 to 6.
const WHEEL_FILTERS: [&str; 5] = ["g", "r", "i", "z", "y"];

/// Keywords holding the LSST detector serial.
const SERIAL_KEYS: [&str; 2] = ["LSST_NUM", "DETSER"];

/// Keyword pairs holding the boresight, tried in order.
const BORESIGHT_KEYS: [(&str, &str); 2] = [("RATEL", "DECTEL"), ("RA", "DEC")];

/// Identification of the detector that produced a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorInfo {
    pub group: String,
    pub name: String,
    pub num: DetectorNum,
    pub serial: Option<String>,
}

fn strip_dev(serial: &str) -> String {
    let serial = serial.trim();
    serial.strip_suffix("-Dev").unwrap_or(serial).to_string()
}

/// Per-header translation state.
pub struct Translator<'a> {
    profile: &'a InstrumentProfile,
    header: &'a RawHeader,
    begin: OnceCell<Epoch>,
    exposure_time: OnceCell<Seconds>,
    day_obs: OnceCell<DayObs>,
    sequence_num: OnceCell<u32>,
    detector: OnceCell<DetectorInfo>,
    diags: RefCell<Diagnostics>,
}

impl<'a> Translator<'a> {
    pub fn new(profile: &'a InstrumentProfile, header: &'a RawHeader) -> Self {
        Translator {
            profile,
            header,
            begin: OnceCell::new(),
            exposure_time: OnceCell::new(),
            day_obs: OnceCell::new(),
            sequence_num: OnceCell::new(),
            detector: OnceCell::new(),
            diags: RefCell::new(Diagnostics::new()),
        }
    }

    fn warn(&self, field: &'static str, kind: DiagnosticKind, message: impl Into<String>) {
        self.diags.borrow_mut().warn(field, kind, message);
    }

    fn note(&self, field: &'static str, kind: DiagnosticKind, message: impl Into<String>) {
        self.diags.borrow_mut().note(field, kind, message);
    }

    /// String value of `key` if it is defined.
    fn defined_str(&self, key: &str) -> Option<&'a str> {
        let header: &'a RawHeader = self.header;
        header
            .get(key)
            .filter(|v| v.is_defined())
            .and_then(HeaderValue::as_str)
            .map(str::trim)
    }

    /// Any defined value of `key`, as text.
    fn defined_text(&self, key: &str) -> Option<String> {
        self.header
            .get(key)
            .filter(|v| v.is_defined())
            .map(|v| v.to_string().trim().to_string())
    }

    /// Begin of the exposure, from the profile's MJD keywords or the ISO `DATE-OBS`.
    pub fn datetime_begin(&self) -> Result<Epoch, ObsInfoError> {
        self.begin
            .get_or_try_init(|| {
                let source = &self.profile.timestamp;
                match resolve_with(self.header, source.mjd_keys, HeaderValue::as_f64) {
                    Resolution::Primary(mjd) => Ok(epoch_from_mjd(mjd, source.scale)),
                    Resolution::Fallback { key, value } => {
                        self.warn(
                            "datetime_begin",
                            DiagnosticKind::Fallback,
                            format!("{} not usable, using {key}", source.mjd_keys[0]),
                        );
                        Ok(epoch_from_mjd(value, source.scale))
                    }
                    Resolution::Missing => {
                        let date_obs = self.defined_str("DATE-OBS").ok_or_else(|| {
                            ObsInfoError::MissingField {
                                field: "datetime_begin",
                                reason: format!("none of {:?} or DATE-OBS found", source.mjd_keys),
                            }
                        })?;
                        self.warn(
                            "datetime_begin",
                            DiagnosticKind::Fallback,
                            format!("none of {:?} found, using DATE-OBS", source.mjd_keys),
                        );
                        self.profile.parse_timestamp(date_obs)
                    }
                }
            })
            .copied()
    }

    /// Begin timestamp as `YYYY-MM-DDTHH:MM:SS.sss`.
    pub fn date_obs(&self) -> Result<String, ObsInfoError> {
        Ok(iso_string(
            &self.datetime_begin()?,
            self.profile.timestamp.scale,
        ))
    }

    /// `DAYOBS` when present, otherwise the begin timestamp minus the rollover.
    pub fn day_obs(&self) -> Result<DayObs, ObsInfoError> {
        self.day_obs
            .get_or_try_init(|| {
                if let Some(day) = self.defined_text("DAYOBS") {
                    return day.parse::<DayObs>();
                }
                let day = DayObs::from_epoch(
                    &self.datetime_begin()?,
                    self.profile.timestamp.scale,
                    self.profile.rollover,
                );
                if self.profile.exposure_id == ExposureIdScheme::DayObsSeqNum {
                    self.note(
                        "day_obs",
                        DiagnosticKind::Fallback,
                        format!("DAYOBS not found, using {day} from the begin timestamp"),
                    );
                }
                Ok(day)
            })
            .copied()
    }

    /// `SEQNUM`, else the trailing number of `IMGNAME` or `FILENAME`, else 0.
    pub fn sequence_num(&self) -> u32 {
        *self.sequence_num.get_or_init(|| {
            let seqnum = self
                .header
                .get("SEQNUM")
                .and_then(HeaderValue::as_i64)
                .and_then(|v| u32::try_from(v).ok());
            if let Some(seqnum) = seqnum {
                return seqnum;
            }

            for key in ["IMGNAME", "FILENAME"] {
                if let Some(seqnum) = self.defined_str(key).and_then(trailing_number) {
                    self.warn(
                        "sequence_num",
                        DiagnosticKind::Fallback,
                        format!("SEQNUM not found, using the trailing digits of {key}"),
                    );
                    return seqnum;
                }
            }

            self.warn(
                "sequence_num",
                DiagnosticKind::Default,
                "no sequence number found, using 0",
            );
            0
        })
    }

    pub fn snap(&self) -> u32 {
        self.header
            .get_i64("SNAP")
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0)
    }

    /// `EXPTIME`, else the profile's missing exposure time.
    pub fn exposure_time(&self) -> Seconds {
        *self.exposure_time.get_or_init(|| {
            if let Some(exptime) = resolve_with(self.header, &["EXPTIME"], HeaderValue::as_f64).value() {
                return exptime;
            }
            let default = self.profile.missing_exposure_time;
            self.warn(
                "exposure_time",
                DiagnosticKind::Default,
                format!("EXPTIME not found, setting exposure time to {default}s"),
            );
            default
        })
    }

    /// `DARKTIME`, falling back to the exposure time.
    pub fn dark_time(&self) -> Seconds {
        if let Some(dark) = resolve_with(self.header, &["DARKTIME"], HeaderValue::as_f64).value() {
            return dark;
        }
        let exposure_time = self.exposure_time();
        self.warn(
            "dark_time",
            DiagnosticKind::Fallback,
            "DARKTIME not found, using the exposure time",
        );
        exposure_time
    }

    fn raft_from_keyword(&self, key: &'static str) -> Result<String, ObsInfoError> {
        let value = self.defined_str(key).ok_or_else(|| ObsInfoError::MissingField {
            field: "detector_group",
            reason: format!("{key} not found"),
        })?;
        RAFT_NAME
            .find(value)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ObsInfoError::InvalidValue {
                field: "detector_group",
                value: value.to_string(),
            })
    }

    fn detector_from_keywords(
        &self,
        group_key: &'static str,
        name_key: &'static str,
    ) -> Result<(String, String), ObsInfoError> {
        let detname = self.defined_str("DETNAME");
        if let (Some(group), Some(name)) = (self.defined_str(group_key), self.defined_str(name_key)) {
            match detname {
                Some(detname) if detname != full_name(group, name) => {
                    return Err(ObsInfoError::AmbiguousField {
                        field: "detector_name",
                        reason: format!("{group_key}/{name_key} say {group}/{name}, DETNAME says {detname}"),
                    })
                }
                _ => return Ok((group.to_string(), name.to_string())),
            }
        }

        let detname = detname.ok_or_else(|| ObsInfoError::MissingField {
            field: "detector_name",
            reason: format!("none of {group_key}/{name_key} or DETNAME found"),
        })?;
        let (group, name) = detname
            .split_once('_')
            .ok_or_else(|| ObsInfoError::InvalidValue {
                field: "detector_name",
                value: detname.to_string(),
            })?;
        self.warn(
            "detector_name",
            DiagnosticKind::Fallback,
            format!("{group_key}/{name_key} not found, using DETNAME"),
        );
        Ok((group.to_string(), name.to_string()))
    }

    /// Detector group, name, number and serial.
    pub fn detector(&self) -> Result<&DetectorInfo, ObsInfoError> {
        self.detector.get_or_try_init(|| {
            let table = &self.profile.detector_table;
            match self.profile.detector {
                DetectorScheme::Fixed { group, name, num } => {
                    let fixed = full_name(group, name);
                    if let Some(detname) = self.defined_str("DETNAME").filter(|d| *d != fixed) {
                        self.warn(
                            "detector_name",
                            DiagnosticKind::Ambiguous,
                            format!("DETNAME says {detname}, {} only has {fixed}", self.profile.name()),
                        );
                    }
                    Ok(DetectorInfo {
                        group: group.to_string(),
                        name: name.to_string(),
                        num,
                        serial: first_str(self.header, &SERIAL_KEYS).map(strip_dev),
                    })
                }
                DetectorScheme::Keywords { group_key, name_key } => {
                    let (group, name) = self.detector_from_keywords(group_key, name_key)?;
                    let num = table.num(&group, &name).ok_or_else(|| ObsInfoError::InvalidValue {
                        field: "detector_name",
                        value: full_name(&group, &name),
                    })?;
                    Ok(DetectorInfo {
                        group,
                        name,
                        num,
                        serial: first_str(self.header, &SERIAL_KEYS).map(strip_dev),
                    })
                }
                DetectorScheme::Serial { serial_key, group_key } => {
                    let serial = self
                        .defined_str(serial_key)
                        .map(strip_dev)
                        .ok_or_else(|| ObsInfoError::MissingField {
                            field: "detector_serial",
                            reason: format!("{serial_key} not found"),
                        })?;
                    let entry = table.by_serial(&serial).ok_or_else(|| ObsInfoError::InvalidValue {
                        field: "detector_serial",
                        value: serial.clone(),
                    })?;

                    let group = match group_key {
                        Some(key) => self.raft_from_keyword(key)?,
                        None => entry.group.clone(),
                    };
                    let num = if group == entry.group {
                        entry.num
                    } else {
                        self.warn(
                            "detector_group",
                            DiagnosticKind::Ambiguous,
                            format!("{serial} is listed in {}, header says {group}", entry.group),
                        );
                        table.num(&group, &entry.name).ok_or_else(|| ObsInfoError::InvalidValue {
                            field: "detector_name",
                            value: full_name(&group, &entry.name),
                        })?
                    };

                    Ok(DetectorInfo {
                        group,
                        name: entry.name.clone(),
                        num,
                        serial: Some(serial),
                    })
                }
            }
        })
    }

    /// Exposure id following the profile's scheme.
    pub fn exposure_id(&self) -> Result<ExposureId, ObsInfoError> {
        match self.profile.exposure_id {
            ExposureIdScheme::DayObsSeqNum => compute_exposure_id(&self.day_obs()?, self.sequence_num()),
            ExposureIdScheme::DateObsDigits { digits } => {
                let iso = self.defined_str("DATE-OBS").ok_or_else(|| ObsInfoError::MissingField {
                    field: "exposure_id",
                    reason: "DATE-OBS not found".into(),
                })?;
                timestamp_digits(iso, digits)
            }
            ExposureIdScheme::BeginDigits { digits } => timestamp_digits(&self.date_obs()?, digits),
            ExposureIdScheme::Keyword(key) => self
                .header
                .get_i64(key)
                .and_then(|v| ExposureId::try_from(v).ok())
                .ok_or_else(|| ObsInfoError::MissingField {
                    field: "exposure_id",
                    reason: format!("{key} not found or not a positive integer"),
                }),
        }
    }

    pub fn filter(&self) -> String {
        match self.profile.filter {
            FilterStrategy::Joined(keys) => {
                let joined = keys.iter().filter_map(|key| self.defined_str(key)).join("+");
                if joined.is_empty() {
                    NO_FILTER.to_string()
                } else {
                    joined
                }
            }
            FilterStrategy::WheelPosition(key) => match self.header.get_i64(key) {
                Some(pos @ 2..=6) => WHEEL_FILTERS[(pos - 2) as usize].to_string(),
                Some(pos) => {
                    self.warn(
                        "filter",
                        DiagnosticKind::Default,
                        format!("unknown filter position {pos}, assuming {NO_FILTER}"),
                    );
                    NO_FILTER.to_string()
                }
                None => {
                    self.warn(
                        "filter",
                        DiagnosticKind::Default,
                        format!("{key} not found, assuming {NO_FILTER}"),
                    );
                    NO_FILTER.to_string()
                }
            },
            FilterStrategy::Lowercase(key) => self.filter_keyword(key, str::to_lowercase),
            FilterStrategy::Keyword(key) => self.filter_keyword(key, str::to_string),
        }
    }

    fn filter_keyword(&self, key: &'static str, convert: fn(&str) -> String) -> String {
        match self.defined_str(key) {
            Some(filter) => convert(filter),
            None => {
                self.warn(
                    "filter",
                    DiagnosticKind::Default,
                    format!("{key} not found, assuming {NO_FILTER}"),
                );
                NO_FILTER.to_string()
            }
        }
    }

    pub fn observation_type(&self) -> Result<String, ObsInfoError> {
        match self.profile.observation_type {
            ObservationTypeStrategy::ImageType => match self.defined_str("IMGTYPE") {
                Some(imgtype) => {
                    let obstype = imgtype.to_lowercase();
                    Ok(if obstype == "skyexp" {
                        "science".to_string()
                    } else {
                        obstype
                    })
                }
                None => {
                    self.warn(
                        "observation_type",
                        DiagnosticKind::Default,
                        format!("IMGTYPE not found, assuming {UNKNOWN}"),
                    );
                    Ok(UNKNOWN.to_string())
                }
            },
            ObservationTypeStrategy::Guess => {
                let mut keys = vec!["OBSTYPE", "IMGTYPE"];
                if !self
                    .profile
                    .is_on_mountain(self.header, &self.datetime_begin()?)
                {
                    keys.push("GROUPID");
                }
                if let Some(obstype) = keys.into_iter().find_map(|key| self.defined_str(key)) {
                    return Ok(obstype.to_lowercase());
                }

                let guess = if self.exposure_time() == 0.0 {
                    "bias"
                } else {
                    UNKNOWN
                };
                self.warn(
                    "observation_type",
                    DiagnosticKind::Default,
                    format!("unable to determine observation type, guessing '{guess}'"),
                );
                Ok(guess.to_string())
            }
        }
    }

    pub fn observation_id(&self) -> String {
        let from_filename = || self.defined_str("FILENAME").map(|f| file_stem(f).to_string());
        let resolved = match self.profile.observation_id {
            ObservationIdStrategy::Keyword(key) => match self.defined_text(key) {
                Some(id) => return id,
                None => from_filename().map(|id| (key, id)),
            },
            ObservationIdStrategy::FilenameStem => match from_filename() {
                Some(id) => return id,
                None => None,
            },
        };

        match resolved {
            Some((key, id)) => {
                self.warn(
                    "observation_id",
                    DiagnosticKind::Fallback,
                    format!("{key} not found, using FILENAME"),
                );
                id
            }
            None => {
                self.warn(
                    "observation_id",
                    DiagnosticKind::Default,
                    format!("no observation id found, assuming {UNKNOWN}"),
                );
                UNKNOWN.to_string()
            }
        }
    }

    pub fn science_program(&self) -> Result<String, ObsInfoError> {
        match self.profile.science_program {
            ScienceProgramStrategy::Keyword(key) => Ok(resolve_or(
                self.header,
                &[key],
                "science_program",
                UNKNOWN.to_string(),
                |v| Some(v.to_string().trim().to_string()),
                &mut self.diags.borrow_mut(),
            )),
            ScienceProgramStrategy::Constant(program) => Ok(program.to_string()),
            ScienceProgramStrategy::BeginDate => {
                let date_obs = self.date_obs()?;
                Ok(date_obs.split('T').next().unwrap_or_default().to_string())
            }
        }
    }

    /// `MONOWL` rounded to the nanometre.
    pub fn wavelength(&self) -> Option<i64> {
        let raw = resolve_with(self.header, &["MONOWL"], HeaderValue::as_f64).value()?;
        let rounded = raw.round();
        if (raw - rounded).abs() >= WAVELENGTH_TOLERANCE {
            self.warn(
                "wavelength",
                DiagnosticKind::Precision,
                format!("MONOWL {raw} is not close to an integer, rounded to {rounded}"),
            );
        }
        Some(rounded as i64)
    }

    pub fn boresight(&self) -> Option<(Degree, Degree)> {
        BORESIGHT_KEYS.iter().find_map(|&(ra, dec)| {
            Some((
                resolve_with(self.header, &[ra], HeaderValue::as_f64).value()?,
                resolve_with(self.header, &[dec], HeaderValue::as_f64).value()?,
            ))
        })
    }

    /// Translate every field.
    pub fn translate(self) -> Result<Translation, ObsInfoError> {
        let datetime_begin = self.datetime_begin()?;
        let exposure_id = self.exposure_id()?;
        let detector = self.detector()?.clone();
        let detector_exposure_id = self.profile.detector_exposure_id(
            exposure_id,
            detector.num,
            &mut self.diags.borrow_mut(),
        )?;

        let observation = CanonicalObservation {
            instrument: self.profile.name().to_string(),
            telescope: self.profile.telescope.map(String::from),
            observation_id: self.observation_id(),
            exposure_id,
            visit_id: exposure_id,
            detector_exposure_id,
            detector_num: detector.num,
            detector_name: detector.name,
            detector_group: detector.group,
            detector_serial: detector.serial,
            date_obs: self.date_obs()?,
            datetime_begin,
            day_obs: self.day_obs()?,
            sequence_num: self.sequence_num(),
            snap: self.snap(),
            filter: self.filter(),
            exposure_time: self.exposure_time(),
            dark_time: self.dark_time(),
            observation_type: self.observation_type()?,
            science_program: self.science_program()?,
            wavelength: self.wavelength(),
            boresight: self.boresight(),
        };

        Ok(Translation {
            observation,
            diagnostics: self.diags.into_inner(),
        })
    }
}

/// Translate `header` with `profile`.
///
/// Arguments
/// -----------------
/// * `profile`: instrument profile of the camera that wrote the header.
/// * `header`: effective header of the raw file.
///
/// Return
/// ----------
/// * The [`Translation`], or the first error met while building an identifier field.
pub fn translate(profile: &InstrumentProfile, header: &RawHeader) -> Result<Translation, ObsInfoError> {
    Translator::new(profile, header).translate()
}

/// Detect the instrument from the header and translate it with its built-in profile.
pub fn translate_detected(header: &RawHeader) -> Result<Translation, ObsInfoError> {
    let profile = Instrument::detect(header)?.profile()?;
    translate(&profile, header)
}
