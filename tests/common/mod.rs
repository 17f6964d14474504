#![allow(dead_code)]

use std::fs;

use approx::assert_relative_eq;
use camino::Utf8Path;
use obsinfo::{
    header::RawHeader, translate::translate_detected, CanonicalObservation, Instrument, Translation,
};

/// Header fixture from `tests/data`.
pub fn load_header(name: &str) -> RawHeader {
    let path = Utf8Path::new("tests/data").join(name);
    let text = fs::read_to_string(&path).unwrap_or_else(|e| panic!("unable to read {path}: {e}"));
    RawHeader::from_cards(&text).unwrap_or_else(|e| panic!("unable to parse {path}: {e}"))
}

/// Detect the instrument of a fixture, check it and translate the header.
pub fn translate_fixture(name: &str, instrument: Instrument) -> Translation {
    let header = load_header(name);
    assert_eq!(Instrument::detect(&header).unwrap(), instrument, "{name}");
    translate_detected(&header).unwrap_or_else(|e| panic!("{name}: {e}"))
}

/// Fields checked for every fixture.
pub struct Expected<'a> {
    pub instrument: &'a str,
    pub telescope: Option<&'a str>,
    pub observation_id: &'a str,
    pub exposure_id: u64,
    pub detector_group: &'a str,
    pub detector_name: &'a str,
    pub detector_num: u32,
    pub detector_serial: Option<&'a str>,
    pub filter: &'a str,
    pub observation_type: &'a str,
    pub science_program: &'a str,
    pub exposure_time: f64,
    pub dark_time: f64,
}

pub fn assert_observation(obs: &CanonicalObservation, expected: &Expected) {
    assert_eq!(obs.instrument, expected.instrument);
    assert_eq!(obs.telescope.as_deref(), expected.telescope);
    assert_eq!(obs.observation_id, expected.observation_id);
    assert_eq!(obs.exposure_id, expected.exposure_id);
    assert_eq!(obs.visit_id, expected.exposure_id);
    assert_eq!(obs.detector_group, expected.detector_group);
    assert_eq!(obs.detector_name, expected.detector_name);
    assert_eq!(obs.detector_num, expected.detector_num);
    assert_eq!(obs.detector_serial.as_deref(), expected.detector_serial);
    assert_eq!(obs.filter, expected.filter);
    assert_eq!(obs.observation_type, expected.observation_type);
    assert_eq!(obs.science_program, expected.science_program);
    assert_relative_eq!(obs.exposure_time, expected.exposure_time, epsilon = 1e-9);
    assert_relative_eq!(obs.dark_time, expected.dark_time, epsilon = 1e-9);

    let profile = obs.instrument.parse::<Instrument>().unwrap().profile().unwrap();
    assert_eq!(
        profile.id_packing.decode(obs.detector_exposure_id),
        (obs.exposure_id, obs.detector_num)
    );
}
