use std::fmt;

use hifitime::Epoch;

use crate::{
    constants::{Degree, DetectorExposureId, DetectorNum, ExposureId, Seconds},
    diagnostics::Diagnostics,
    time::DayObs,
};

/// Normalized description of one raw file.
///
/// `detector_exposure_id` always decodes, with the instrument's packing, to
/// `(exposure_id, detector_num)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalObservation {
    pub instrument: String,
    pub telescope: Option<String>,
    pub observation_id: String,
    pub exposure_id: ExposureId,
    /// Visits and exposures are the same thing for every supported instrument.
    pub visit_id: ExposureId,
    pub detector_exposure_id: DetectorExposureId,
    pub detector_num: DetectorNum,
    pub detector_name: String,
    /// Raft.
    pub detector_group: String,
    pub detector_serial: Option<String>,
    /// Begin timestamp `YYYY-MM-DDTHH:MM:SS.sss` in the instrument time scale.
    pub date_obs: String,
    pub datetime_begin: Epoch,
    pub day_obs: DayObs,
    pub sequence_num: u32,
    pub snap: u32,
    pub filter: String,
    pub exposure_time: Seconds,
    pub dark_time: Seconds,
    pub observation_type: String,
    pub science_program: String,
    /// Monochromator wavelength in nm.
    pub wavelength: Option<i64>,
    /// (ra, dec)
    pub boresight: Option<(Degree, Degree)>,
}

impl CanonicalObservation {
    /// `<group>_<name>`
    pub fn detector_full_name(&self) -> String {
        format!("{}_{}", self.detector_group, self.detector_name)
    }
}

impl fmt::Display for CanonicalObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, exposure {}, detector {} #{}, {}, filter {})",
            self.instrument,
            self.observation_id,
            self.date_obs,
            self.exposure_id,
            self.detector_full_name(),
            self.detector_num,
            self.observation_type,
            self.filter
        )
    }
}

/// Result of a header translation: the observation and every non-fatal event
/// raised while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub observation: CanonicalObservation,
    pub diagnostics: Diagnostics,
}
