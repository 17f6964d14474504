mod common;

use approx::assert_relative_eq;
use common::{assert_observation, translate_fixture, Expected};
use obsinfo::{diagnostics::DiagnosticKind, time::DayObs, Instrument};

#[test]
fn test_lsstcam_translator() {
    let translation = translate_fixture(
        "lsstCam-MC_C_20190319_000001_R10_S02.hdr",
        Instrument::LsstCam,
    );
    let obs = &translation.observation;
    assert_observation(
        obs,
        &Expected {
            instrument: "lsstCam",
            telescope: Some("LSST"),
            observation_id: "MC_C_20190319_000001",
            exposure_id: 2019031900001,
            detector_group: "R10",
            detector_name: "S02",
            detector_num: 29,
            detector_serial: Some("ITL-3800C-041"),
            filter: "NONE",
            observation_type: "bias",
            science_program: "unknown",
            exposure_time: 0.0,
            dark_time: 0.0,
        },
    );
    assert_eq!(obs.detector_exposure_id, 2019031900001 * 256 + 29);
    assert_eq!(obs.date_obs, "2019-03-19T22:00:00.000");
    assert_eq!(obs.day_obs, DayObs::new(2019, 3, 19));
    assert!(translation
        .diagnostics
        .has("science_program", DiagnosticKind::Default));

    let translation = translate_fixture(
        "lsstCam-MC_C_20190322_000002_R10_S22.hdr",
        Instrument::LsstCam,
    );
    assert_observation(
        &translation.observation,
        &Expected {
            instrument: "lsstCam",
            telescope: Some("LSST"),
            observation_id: "MC_C_20190322_000002",
            exposure_id: 2019032200002,
            detector_group: "R10",
            detector_name: "S22",
            detector_num: 35,
            detector_serial: Some("ITL-3800C-103"),
            filter: "SDSSi+ND_OD0.5",
            observation_type: "flat",
            science_program: "6489D",
            exposure_time: 1.0,
            dark_time: 1.0,
        },
    );
    assert!(translation.diagnostics.is_empty());

    let translation = translate_fixture(
        "lsstCam-MC_C_20190406_000643_R10_S00.hdr",
        Instrument::LsstCam,
    );
    assert_observation(
        &translation.observation,
        &Expected {
            instrument: "lsstCam",
            telescope: Some("LSST"),
            observation_id: "MC_C_20190406_000643",
            exposure_id: 2019040600643,
            detector_group: "R10",
            detector_name: "S00",
            detector_num: 27,
            detector_serial: Some("ITL-3800C-145"),
            filter: "950nm+empty",
            observation_type: "flat",
            science_program: "6549D",
            exposure_time: 999.99,
            dark_time: 1007.422,
        },
    );
    assert!(translation
        .diagnostics
        .has("detector_name", DiagnosticKind::Fallback));
}

#[test]
fn test_comcam_translator() {
    let translation = translate_fixture(
        "comCam-CC_C_20190530_000001_R22_S00.hdr",
        Instrument::ComCam,
    );
    let obs = &translation.observation;
    assert_observation(
        obs,
        &Expected {
            instrument: "comCam",
            telescope: Some("LSST"),
            observation_id: "CC_C_20190530_000001",
            exposure_id: 2019053000001,
            detector_group: "R22",
            detector_name: "S00",
            detector_num: 0,
            detector_serial: Some("ITL-3800C-229"),
            filter: "NONE",
            observation_type: "bias",
            science_program: "unknown",
            exposure_time: 0.0,
            dark_time: 0.398,
        },
    );
    assert_eq!(obs.detector_exposure_id, 2019053000001 * 16);
}

#[test]
fn test_latiss_translator() {
    let translation = translate_fixture(
        "latiss-2018-09-20-05700065-det000.hdr",
        Instrument::Latiss,
    );
    let obs = &translation.observation;
    assert_observation(
        obs,
        &Expected {
            instrument: "LATISS",
            telescope: Some("LSSTAuxTel"),
            observation_id: "AT_C_20180920_000065",
            exposure_id: 2018092000065,
            detector_group: "RXX",
            detector_name: "S00",
            detector_num: 0,
            detector_serial: Some("ITL-3800C-098"),
            filter: "NONE",
            observation_type: "unknown",
            science_program: "unknown",
            exposure_time: 27.0,
            dark_time: 27.0,
        },
    );
    assert_eq!(obs.detector_exposure_id, 2018092000065);
    assert!(translation.diagnostics.has("dark_time", DiagnosticKind::Fallback));
    assert!(translation
        .diagnostics
        .has("observation_type", DiagnosticKind::Default));

    let translation = translate_fixture(
        "latiss-AT_O_20190329_000022-ats-wfs_ccd.hdr",
        Instrument::Latiss,
    );
    let obs = &translation.observation;
    assert_observation(
        obs,
        &Expected {
            instrument: "LATISS",
            telescope: Some("LSSTAuxTel"),
            observation_id: "AT_O_20190329_000022",
            exposure_id: 2019032900022,
            detector_group: "RXX",
            detector_name: "S00",
            detector_num: 0,
            detector_serial: Some("ITL-3800C-098"),
            filter: "NONE",
            observation_type: "bias",
            science_program: "unknown",
            exposure_time: 0.0,
            dark_time: 0.0,
        },
    );
    assert_eq!(obs.sequence_num, 22);
    assert_eq!(obs.wavelength, Some(650));
    assert!(translation
        .diagnostics
        .has("sequence_num", DiagnosticKind::Fallback));
    assert!(translation
        .diagnostics
        .has("wavelength", DiagnosticKind::Precision));
}

#[test]
fn test_ts8_translator() {
    let translation = translate_fixture("ts8-E2V-CCD250-179_bias.hdr", Instrument::Ts8);
    let obs = &translation.observation;
    assert_observation(
        obs,
        &Expected {
            instrument: "LSST-TS8",
            telescope: Some("LSST"),
            observation_id: "E2V-CCD250-179_bias_bias_001_6006D_20180724104156",
            exposure_id: 201807241041568,
            detector_group: "RTM-010",
            detector_name: "S11",
            detector_num: 67,
            detector_serial: Some("E2V-CCD250-179"),
            filter: "y",
            observation_type: "bias",
            science_program: "6006D",
            exposure_time: 0.0,
            dark_time: 0.0,
        },
    );
    assert_eq!(obs.date_obs, "2018-07-24T10:41:56.852");

    let translation = translate_fixture("ts8-E2V-CCD250-200-Dev_flat.hdr", Instrument::Ts8);
    assert_observation(
        &translation.observation,
        &Expected {
            instrument: "LSST-TS8",
            telescope: Some("LSST"),
            observation_id: "E2V-CCD250-200-Dev_flat_ND_OD0.7_z_flat1_20180724102845",
            exposure_id: 201807241028453,
            detector_group: "RTM-010",
            detector_name: "S02",
            detector_num: 65,
            detector_serial: Some("E2V-CCD250-200"),
            filter: "z",
            observation_type: "flat",
            science_program: "6006D",
            exposure_time: 20.0,
            dark_time: 21.913,
        },
    );

    let translation = translate_fixture("ts8-E2V-CCD250-220_fe55.hdr", Instrument::Ts8);
    assert_observation(
        &translation.observation,
        &Expected {
            instrument: "LSST-TS8",
            telescope: Some("LSST"),
            observation_id: "E2V-CCD250-220_fe55_fe55_100_20171215114006",
            exposure_id: 201712151140062,
            detector_group: "RTM-005",
            detector_name: "S00",
            detector_num: 27,
            detector_serial: Some("E2V-CCD250-220"),
            filter: "i",
            observation_type: "fe55",
            science_program: "6288",
            exposure_time: 90.0,
            dark_time: 91.2,
        },
    );
    assert!(translation.diagnostics.is_empty());
}

#[test]
fn test_ts3_translator() {
    let translation = translate_fixture("ts3-E2V-CCD250-411_dark.hdr", Instrument::Ts3);
    let obs = &translation.observation;
    assert_observation(
        obs,
        &Expected {
            instrument: "LSST-TS3",
            telescope: Some("LSST"),
            observation_id: "E2V-CCD250-411_dark_dark_003_20181115125511",
            exposure_id: 201811151255111,
            detector_group: "R433",
            detector_name: "S00",
            detector_num: 433,
            detector_serial: Some("E2V-CCD250-411"),
            filter: "550CutOn",
            observation_type: "dark",
            science_program: "2018-11-15",
            exposure_time: 40.0,
            dark_time: 44.631,
        },
    );
    assert_eq!(obs.detector_exposure_id, 201811151255111 * 1024 + 433);

    let translation = translate_fixture("ts3-ITL-3800C-098_bias.hdr", Instrument::Ts3);
    assert_observation(
        &translation.observation,
        &Expected {
            instrument: "LSST-TS3",
            telescope: Some("LSST"),
            observation_id: "ITL-3800C-098_bias_001_20160722060706",
            exposure_id: 201607220607067,
            detector_group: "R071",
            detector_name: "S00",
            detector_num: 71,
            detector_serial: Some("ITL-3800C-098"),
            filter: "550CutOn",
            observation_type: "bias",
            science_program: "2016-07-22",
            exposure_time: 0.0,
            dark_time: 0.52,
        },
    );
}

#[test]
fn test_ucdcam_translator() {
    let translation = translate_fixture("ucdcam-20181205233148.hdr", Instrument::UcdCam);
    let obs = &translation.observation;
    assert_observation(
        obs,
        &Expected {
            instrument: "LSST-UCDCam",
            telescope: None,
            observation_id: "20181205233148",
            exposure_id: 20181205233148,
            detector_group: "R00",
            detector_name: "S00",
            detector_num: 0,
            detector_serial: Some("E2V-CCD250-112-04"),
            filter: "r",
            observation_type: "flat",
            science_program: "2018-12-05",
            exposure_time: 0.5,
            dark_time: 0.5,
        },
    );
    assert!(translation.diagnostics.has("dark_time", DiagnosticKind::Fallback));

    let translation = translate_fixture("ucdcam-20180530150355.hdr", Instrument::UcdCam);
    assert_observation(
        &translation.observation,
        &Expected {
            instrument: "LSST-UCDCam",
            telescope: None,
            observation_id: "20180530150355",
            exposure_id: 20180530150355,
            detector_group: "R02",
            detector_name: "S00",
            detector_num: 2,
            detector_serial: Some("ITL-3800C-002"),
            filter: "NONE",
            observation_type: "dark",
            science_program: "2018-05-30",
            exposure_time: 10.0,
            dark_time: 10.0,
        },
    );
    assert!(translation.diagnostics.has("filter", DiagnosticKind::Default));
}

#[test]
fn test_imsim_translator() {
    let translation = translate_fixture("imsim-lsst_a_204595_R11_S02_i.hdr", Instrument::ImSim);
    let obs = &translation.observation;
    assert_observation(
        obs,
        &Expected {
            instrument: "ImSim",
            telescope: Some("LSST"),
            observation_id: "204595",
            exposure_id: 204595,
            detector_group: "R11",
            detector_name: "S02",
            detector_num: 38,
            detector_serial: Some("LCA-11021_RTM-000"),
            filter: "i",
            observation_type: "science",
            science_program: "204595",
            exposure_time: 30.0,
            dark_time: 30.0,
        },
    );
    let (ra, dec) = obs.boresight.unwrap();
    assert_relative_eq!(ra, 53.010895997);
    assert_relative_eq!(dec, -27.437540909);

    let translation = translate_fixture(
        "imsim-bias-lsst_a_3010002_R11_S00.hdr",
        Instrument::ImSim,
    );
    assert_observation(
        &translation.observation,
        &Expected {
            instrument: "ImSim",
            telescope: Some("LSST"),
            observation_id: "3010002",
            exposure_id: 3010002,
            detector_group: "R11",
            detector_name: "S00",
            detector_num: 36,
            detector_serial: Some("LCA-11021_RTM-000"),
            filter: "i",
            observation_type: "science",
            science_program: "42",
            exposure_time: 0.0,
            dark_time: 0.0,
        },
    );
    assert!(translation.observation.boresight.is_none());
}
