//! # Raw formatter
//!
//! Read-time glue between the header normalizer and the amplifier assembler:
//! a raw file (primary header, extension header, amplifier segments) becomes an
//! assembled detector image carrying its canonical observation, the merged
//! header and, when the pointing is known, a world coordinate system built by the
//! caller.
use tracing::debug;

use crate::{
    assembly::{
        assemble_from_catalog, AmplifierSegment, AssembledExposure, AssemblyMode,
        DetectorGeometry, GeometryCatalog,
    },
    constants::Degree,
    diagnostics::Diagnostics,
    header::{effective_header, RawHeader},
    instrument::InstrumentProfile,
    obsinfo_errors::ObsInfoError,
    translate::{translate, CanonicalObservation},
};

/// Builds a world coordinate system for an assembled detector.
pub trait WcsBuilder {
    type Wcs;

    /// Arguments
    /// -----------------
    /// * `boresight`: telescope pointing (ra, dec) in degrees.
    /// * `observation`: the translated observation.
    /// * `detector`: nominal layout of the detector that was assembled.
    fn build(
        &self,
        boresight: (Degree, Degree),
        observation: &CanonicalObservation,
        detector: &DetectorGeometry,
    ) -> Result<Self::Wcs, ObsInfoError>;
}

/// A raw file read and assembled.
#[derive(Debug, Clone)]
pub struct RawExposure<W> {
    pub exposure: AssembledExposure,
    pub observation: CanonicalObservation,
    /// Header the observation was translated from.
    pub header: RawHeader,
    pub wcs: Option<W>,
    /// Translation then assembly events, in that order.
    pub diagnostics: Diagnostics,
}

/// [`read_raw_with_mode`] producing a trimmed image.
pub fn read_raw<C, B>(
    profile: &InstrumentProfile,
    primary: &RawHeader,
    extension: &RawHeader,
    segments: &[AmplifierSegment],
    catalog: &C,
    wcs_builder: Option<&B>,
) -> Result<RawExposure<B::Wcs>, ObsInfoError>
where
    C: GeometryCatalog,
    B: WcsBuilder,
{
    read_raw_with_mode(
        profile,
        primary,
        extension,
        segments,
        catalog,
        wcs_builder,
        AssemblyMode::Trimmed,
    )
}

/// Translate and assemble one raw file.
///
/// Arguments
/// -----------------
/// * `profile`: profile of the instrument that wrote the file.
/// * `primary`, `extension`: headers, reduced with [`effective_header`].
/// * `segments`: the amplifier segments of the detector.
/// * `catalog`: geometry of the instrument's detectors, looked up by detector number.
/// * `wcs_builder`: called when the observation has a boresight.
/// * `mode`: trimmed or untrimmed assembly.
///
/// Return
/// ----------
/// * The [`RawExposure`], or the first translation or assembly error.
pub fn read_raw_with_mode<C, B>(
    profile: &InstrumentProfile,
    primary: &RawHeader,
    extension: &RawHeader,
    segments: &[AmplifierSegment],
    catalog: &C,
    wcs_builder: Option<&B>,
    mode: AssemblyMode,
) -> Result<RawExposure<B::Wcs>, ObsInfoError>
where
    C: GeometryCatalog,
    B: WcsBuilder,
{
    let header = effective_header(primary, extension);
    let translation = translate(profile, &header)?;
    let observation = translation.observation;
    let mut diagnostics = translation.diagnostics;

    debug!(
        "assembling {} segments of {} in {:?} mode",
        segments.len(),
        observation,
        mode
    );
    let (exposure, assembly_diags) =
        assemble_from_catalog(segments, catalog, observation.detector_num, mode)?;
    diagnostics.extend(assembly_diags);

    let wcs = match (wcs_builder, observation.boresight, catalog.detector(observation.detector_num)) {
        (Some(builder), Some(boresight), Some(detector)) => {
            Some(builder.build(boresight, &observation, detector)?)
        }
        _ => None,
    };

    Ok(RawExposure {
        exposure,
        observation,
        header,
        wcs,
        diagnostics,
    })
}

#[cfg(test)]
mod formatter_test {
    use nalgebra::DMatrix;

    use super::*;
    use crate::{
        assembly::{AmpLayout, StaticGeometryCatalog},
        instrument::Instrument,
    };

    struct Pointing;

    impl WcsBuilder for Pointing {
        type Wcs = ((Degree, Degree), (usize, usize));

        fn build(
            &self,
            boresight: (Degree, Degree),
            _observation: &CanonicalObservation,
            detector: &DetectorGeometry,
        ) -> Result<Self::Wcs, ObsInfoError> {
            Ok((boresight, detector.bbox.dims()))
        }
    }

    fn catalog() -> StaticGeometryCatalog {
        let layout = AmpLayout {
            data_width: 2,
            data_height: 2,
            prescan: 1,
            serial_overscan: 1,
            parallel_overscan: 1,
        };
        StaticGeometryCatalog::new().with_detector(DetectorGeometry::grid("RXX_S00", 0, 2, 1, layout))
    }

    fn segments() -> Vec<AmplifierSegment> {
        (0..2)
            .map(|i| AmplifierSegment::new(i, DMatrix::from_element(3, 4, i as f32)))
            .collect()
    }

    #[test]
    fn test_read_raw() {
        let profile = Instrument::Latiss.profile().unwrap();
        let primary = RawHeader::new()
            .with("INSTRUME", "LATISS")
            .with("MJD-OBS", 58562.5)
            .with("DAYOBS", "20190320")
            .with("SEQNUM", 3)
            .with("EXPTIME", 1.0)
            .with("RA", 10.5)
            .with("DEC", -20.0);
        let extension = RawHeader::new().with("EXTNAME", "Segment00");

        let raw = read_raw(&profile, &primary, &extension, &segments(), &catalog(), Some(&Pointing))
            .unwrap();
        assert_eq!(raw.exposure.dims(), (4, 2));
        assert_eq!(raw.observation.exposure_id, 2019032000003);
        assert_eq!(raw.wcs, Some(((10.5, -20.0), (4, 2))));
        assert_eq!(raw.header.get_str("EXTNAME"), Some("Segment00"));

        let raw = read_raw(
            &profile,
            &primary,
            &extension,
            &segments(),
            &catalog(),
            None::<&Pointing>,
        )
        .unwrap();
        assert!(raw.wcs.is_none());
    }

    #[test]
    fn test_missing_geometry() {
        let profile = Instrument::Latiss.profile().unwrap();
        let primary = RawHeader::new()
            .with("MJD-OBS", 58562.5)
            .with("SEQNUM", 3)
            .with("EXPTIME", 1.0);
        let result = read_raw(
            &profile,
            &primary,
            &RawHeader::new(),
            &segments(),
            &StaticGeometryCatalog::new(),
            None::<&Pointing>,
        );
        assert!(matches!(result, Err(ObsInfoError::Assembly(_))));
    }
}
