//! # Amplifier assembly
//!
//! Build one detector image from its per-amplifier raw segments.
//!
//! ## Algorithm
//!
//! 1. Start from the nominal amplifier layout of the detector and substitute the
//!    registered as-built corrections that exceed their tolerance.
//! 2. Reconcile each amplifier with the segment actually read: a segment whose
//!    extent differs from the nominal raw box only by its overscan gets its
//!    geometry patched ([`AmpGeometry::fit_raw_extent`]). The `DETSEC`, `DATASEC`
//!    and `BIASSEC` cards of the segment are compared with the geometry; a
//!    mismatch is reported, never fatal.
//! 3. Cut the data region (or the whole segment in
//!    [`AssemblyMode::Untrimmed`]), flip it according to the readout corner and
//!    paste it at its destination.
//!
//! Destinations must lie inside the detector and must not overlap: either case
//! means the geometry tables are wrong and fails with [`ObsInfoError::Assembly`].
//! Pixel values are copied, never modified. Mask and variance planes follow the
//! same placement and are produced only when every segment carries them.
//!
//! Only the first geometry discrepancy of a call is logged as a warning, the
//! following ones at debug level; all of them are returned as diagnostics.
//!
//! ## See also
//! ------------
//! * [`geometry`] – Bounding boxes, amplifier layouts and the geometry catalog.
//! * [`segment`] – Input segments and assembled output.
pub mod geometry;
pub mod segment;

use nalgebra::{DMatrix, Scalar};
use tracing::debug;

use crate::{
    constants::DetectorNum,
    diagnostics::{DiagnosticKind, Diagnostics},
    header::{sections::IrafSection, RawHeader},
    obsinfo_errors::ObsInfoError,
};

pub use geometry::{
    AmpGeometry, AmpLayout, AsBuiltCorrection, BBox, DetectorGeometry, GeometryCatalog,
    ReadoutCorner, StaticGeometryCatalog,
};
pub use segment::{AmplifierSegment, AssembledExposure, AssemblyMode};

const GEOMETRY_FIELD: &str = "amplifier_geometry";

/// Warn once, then log at debug level.
struct GeometryLog {
    prefix: String,
    diags: Diagnostics,
    warned: bool,
}

impl GeometryLog {
    fn new(prefix: &str) -> Self {
        GeometryLog {
            prefix: prefix.to_string(),
            diags: Diagnostics::new(),
            warned: false,
        }
    }

    fn report(&mut self, message: String) {
        let message = format!("{}: {message}", self.prefix);
        if self.warned {
            self.diags.note(GEOMETRY_FIELD, DiagnosticKind::Geometry, message);
        } else {
            self.diags.warn(GEOMETRY_FIELD, DiagnosticKind::Geometry, message);
            self.warned = true;
        }
    }
}

fn check_sections(amp: &AmpGeometry, header: &RawHeader, log: &mut GeometryLog) {
    let expected = [
        ("DETSEC", amp.bbox),
        ("DATASEC", amp.raw_data_bbox),
        ("BIASSEC", amp.raw_horizontal_overscan),
    ];
    for (key, bbox) in expected {
        let Some(text) = header.get_str(key) else {
            continue;
        };
        match text.parse::<IrafSection>() {
            Ok(section) if section.bbox() == bbox => {}
            Ok(section) => log.report(format!(
                "{key} doesn't match for amplifier {} ({} != {})",
                amp.name,
                bbox,
                section.bbox()
            )),
            Err(err) => log.report(format!("amplifier {}: {err}", amp.name)),
        }
    }
}

/// Copy `region` of `plane`, flipped along the requested axes.
fn oriented<T: Scalar + Copy>(
    plane: &DMatrix<T>,
    region: &BBox,
    flip_x: bool,
    flip_y: bool,
) -> DMatrix<T> {
    DMatrix::from_fn(region.height, region.width, |r, c| {
        let row = if flip_y {
            region.y_end() - 1 - r
        } else {
            region.y0 + r
        };
        let col = if flip_x {
            region.x_end() - 1 - c
        } else {
            region.x0 + c
        };
        plane[(row, col)]
    })
}

struct Placement {
    amp_index: usize,
    source: BBox,
    destination: BBox,
    flip_x: bool,
    flip_y: bool,
}

fn paste_all<T: Scalar + Copy + Default>(
    canvas: BBox,
    placements: &[Placement],
    planes: &[&DMatrix<T>],
) -> DMatrix<T> {
    let mut out = DMatrix::from_element(canvas.height, canvas.width, T::default());
    for (p, plane) in placements.iter().zip(planes) {
        let block = oriented(plane, &p.source, p.flip_x, p.flip_y);
        // destinations are checked to lie inside the canvas, which may not start at the origin
        let d = p.destination;
        out.view_mut((d.y0 - canvas.y0, d.x0 - canvas.x0), (d.height, d.width))
            .copy_from(&block);
    }
    out
}

fn check_placements(
    placements: &[Placement],
    amps: &[AmpGeometry],
    canvas: BBox,
) -> Result<(), ObsInfoError> {
    for (i, p) in placements.iter().enumerate() {
        let name = &amps[p.amp_index].name;
        if p.source.dims() != p.destination.dims() {
            return Err(ObsInfoError::Assembly(format!(
                "amplifier {name}: source {} and destination {} differ in size",
                p.source, p.destination
            )));
        }
        if !canvas.contains(&p.destination) {
            return Err(ObsInfoError::Assembly(format!(
                "amplifier {name}: destination {} outside detector {}",
                p.destination, canvas
            )));
        }
        if let Some(other) = placements[..i]
            .iter()
            .find(|o| o.destination.overlaps(&p.destination))
        {
            return Err(ObsInfoError::Assembly(format!(
                "amplifiers {} and {name} overlap ({} and {})",
                amps[other.amp_index].name, other.destination, p.destination
            )));
        }
    }
    Ok(())
}

/// Assemble the segments of one detector.
///
/// Arguments
/// -----------------
/// * `segments`: one segment per amplifier of `detector`, in any order.
/// * `detector`: nominal layout from the geometry catalog.
/// * `corrections`: as-built corrections registered for the detector.
/// * `mode`: trimmed or untrimmed output.
///
/// Return
/// ----------
/// * The assembled exposure with the non-fatal geometry diagnostics, or
///   [`ObsInfoError::Assembly`] when the segments or the geometry are inconsistent.
pub fn assemble(
    segments: &[AmplifierSegment],
    detector: &DetectorGeometry,
    corrections: &[AsBuiltCorrection],
    mode: AssemblyMode,
) -> Result<(AssembledExposure, Diagnostics), ObsInfoError> {
    if segments.is_empty() {
        return Err(ObsInfoError::Assembly(format!(
            "no amplifier segments for detector {}",
            detector.name
        )));
    }

    let mut amps = detector.amps.clone();
    for correction in corrections {
        let amp = amps.get_mut(correction.amp_index).ok_or_else(|| {
            ObsInfoError::Assembly(format!(
                "as-built correction for unknown amplifier {} of detector {}",
                correction.amp_index, detector.name
            ))
        })?;
        if correction.apply(amp) {
            debug!(detector = %detector.name, amp = %amp.name, bbox = %amp.bbox, "as-built geometry applied");
        }
    }

    let mut ordered: Vec<Option<&AmplifierSegment>> = vec![None; amps.len()];
    for segment in segments {
        match ordered.get_mut(segment.amp_index) {
            None => {
                return Err(ObsInfoError::Assembly(format!(
                    "detector {} has no amplifier {}",
                    detector.name, segment.amp_index
                )))
            }
            Some(Some(_)) => {
                return Err(ObsInfoError::Assembly(format!(
                    "amplifier {} given twice for detector {}",
                    segment.amp_index, detector.name
                )))
            }
            Some(slot) => *slot = Some(segment),
        }
    }
    let ordered = ordered
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            s.ok_or_else(|| {
                ObsInfoError::Assembly(format!(
                    "missing segment for amplifier {} of detector {}",
                    amps[i].name, detector.name
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut log = GeometryLog::new(&detector.name);
    for (amp, segment) in amps.iter_mut().zip(&ordered) {
        let nominal = amp.raw_bbox;
        if amp.fit_raw_extent(segment.bbox())? {
            log.report(format!(
                "raw bbox of amplifier {} != segment bbox; patching ({} v. {})",
                amp.name,
                nominal,
                segment.bbox()
            ));
        }
        check_sections(amp, &segment.header, &mut log);

        if !segment.bbox().contains(&amp.raw_data_bbox) {
            return Err(ObsInfoError::Assembly(format!(
                "amplifier {}: data region {} outside segment {}",
                amp.name,
                amp.raw_data_bbox,
                segment.bbox()
            )));
        }
        let shape = segment.pixels.shape();
        let planes_agree = segment.mask.as_ref().map_or(true, |m| m.shape() == shape)
            && segment.variance.as_ref().map_or(true, |v| v.shape() == shape);
        if !planes_agree {
            return Err(ObsInfoError::Assembly(format!(
                "amplifier {}: mask or variance shape differs from image {shape:?}",
                amp.name
            )));
        }
    }

    let canvas = match mode {
        AssemblyMode::Trimmed => detector.bbox,
        AssemblyMode::Untrimmed => geometry::raw_extent(&amps),
    };
    let placements: Vec<Placement> = amps
        .iter()
        .zip(&ordered)
        .enumerate()
        .map(|(amp_index, (amp, segment))| {
            let (source, destination) = match mode {
                AssemblyMode::Trimmed => (amp.raw_data_bbox, amp.bbox),
                AssemblyMode::Untrimmed => (segment.bbox(), amp.raw_placement()),
            };
            Placement {
                amp_index,
                source,
                destination,
                flip_x: amp.readout_corner.flip_x(),
                flip_y: amp.readout_corner.flip_y(),
            }
        })
        .collect();
    check_placements(&placements, &amps, canvas)?;

    let images: Vec<_> = ordered.iter().map(|s| &s.pixels).collect();
    let image = paste_all(canvas, &placements, &images);

    let masks: Option<Vec<_>> = ordered.iter().map(|s| s.mask.as_ref()).collect();
    let variances: Option<Vec<_>> = ordered.iter().map(|s| s.variance.as_ref()).collect();
    let mut diags = log.diags;
    if masks.is_none() && ordered.iter().any(|s| s.mask.is_some()) {
        diags.note("mask", DiagnosticKind::Default, "mask missing for some amplifiers, dropped");
    }
    if variances.is_none() && ordered.iter().any(|s| s.variance.is_some()) {
        diags.note(
            "variance",
            DiagnosticKind::Default,
            "variance missing for some amplifiers, dropped",
        );
    }

    let exposure = AssembledExposure {
        detector_name: detector.name.clone(),
        detector_num: detector.num,
        mode,
        image,
        mask: masks.map(|m| paste_all(canvas, &placements, &m)),
        variance: variances.map(|v| paste_all(canvas, &placements, &v)),
        amps,
    };
    Ok((exposure, diags))
}

/// [`assemble`] with the layout and corrections looked up in `catalog`.
pub fn assemble_from_catalog(
    segments: &[AmplifierSegment],
    catalog: &impl GeometryCatalog,
    detector_num: DetectorNum,
    mode: AssemblyMode,
) -> Result<(AssembledExposure, Diagnostics), ObsInfoError> {
    let detector = catalog.detector(detector_num).ok_or_else(|| {
        ObsInfoError::Assembly(format!("no geometry for detector {detector_num}"))
    })?;
    assemble(segments, detector, catalog.corrections(detector_num), mode)
}
