//! # Amplifier and detector geometry
//!
//! Nominal layout of a detector as provided by a camera geometry catalog, plus the
//! as-built corrections registered against it.
//!
//! Coordinates are 0-based pixels, `x` along columns and `y` along rows. A
//! [`BBox`] is half-open: it covers `x0..x0 + width` and `y0..y0 + height`.
//!
//! For each amplifier the catalog describes two frames:
//! - the **raw** frame of the amplifier segment as it is read out (prescan, data,
//!   serial overscan, parallel overscan), placed at `raw_xy_offset` in the
//!   untrimmed detector image,
//! - the **trimmed** frame: `bbox` is where the data pixels land in the assembled
//!   detector image once flipped according to the readout corner.
use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;

use crate::{constants::DetectorNum, obsinfo_errors::ObsInfoError};

/// Half-open axis-aligned pixel box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BBox {
    pub x0: usize,
    pub y0: usize,
    pub width: usize,
    pub height: usize,
}

impl BBox {
    pub fn new(x0: usize, y0: usize, width: usize, height: usize) -> Self {
        BBox {
            x0,
            y0,
            width,
            height,
        }
    }

    /// Box of the given size anchored at the origin.
    pub fn from_dims(width: usize, height: usize) -> Self {
        BBox::new(0, 0, width, height)
    }

    /// One past the last column.
    pub fn x_end(&self) -> usize {
        self.x0 + self.width
    }

    /// One past the last row.
    pub fn y_end(&self) -> usize {
        self.y0 + self.height
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// `true` if the two boxes share at least one pixel.
    pub fn overlaps(&self, other: &BBox) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x0 < other.x_end()
            && other.x0 < self.x_end()
            && self.y0 < other.y_end()
            && other.y0 < self.y_end()
    }

    /// `true` if `other` lies entirely inside `self`.
    pub fn contains(&self, other: &BBox) -> bool {
        other.x0 >= self.x0
            && other.y0 >= self.y0
            && other.x_end() <= self.x_end()
            && other.y_end() <= self.y_end()
    }

    /// Same box moved by `(dx, dy)`.
    pub fn shifted(&self, dx: usize, dy: usize) -> BBox {
        BBox::new(self.x0 + dx, self.y0 + dy, self.width, self.height)
    }

    /// Largest absolute difference between the corners and sizes of two boxes.
    pub fn deviation(&self, other: &BBox) -> usize {
        [
            self.x0.abs_diff(other.x0),
            self.y0.abs_diff(other.y0),
            self.width.abs_diff(other.width),
            self.height.abs_diff(other.height),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.x0,
            self.y0,
            self.x_end(),
            self.y_end()
        )
    }
}

/// Corner of the amplifier where the first pixel is read.
///
/// The assembled image is oriented with its first pixel at the lower-left, so a
/// segment read from the right must be flipped along x, and one read from the
/// top along y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadoutCorner {
    LL,
    LR,
    UL,
    UR,
}

impl ReadoutCorner {
    pub fn flip_x(&self) -> bool {
        matches!(self, ReadoutCorner::LR | ReadoutCorner::UR)
    }

    pub fn flip_y(&self) -> bool {
        matches!(self, ReadoutCorner::UL | ReadoutCorner::UR)
    }
}

impl FromStr for ReadoutCorner {
    type Err = ObsInfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LL" => Ok(ReadoutCorner::LL),
            "LR" => Ok(ReadoutCorner::LR),
            "UL" => Ok(ReadoutCorner::UL),
            "UR" => Ok(ReadoutCorner::UR),
            _ => Err(ObsInfoError::InvalidValue {
                field: "readout_corner",
                value: s.to_string(),
            }),
        }
    }
}

/// Geometry of one amplifier.
#[derive(Debug, Clone, PartialEq)]
pub struct AmpGeometry {
    pub name: String,
    /// Data pixels in the trimmed detector image.
    pub bbox: BBox,
    pub readout_corner: ReadoutCorner,
    /// Full raw segment, in segment coordinates.
    pub raw_bbox: BBox,
    /// Data pixels within the raw segment.
    pub raw_data_bbox: BBox,
    /// Serial overscan within the raw segment.
    pub raw_horizontal_overscan: BBox,
    /// Parallel overscan within the raw segment.
    pub raw_vertical_overscan: BBox,
    /// Position of the raw segment in the untrimmed detector image.
    pub raw_xy_offset: (usize, usize),
}

impl AmpGeometry {
    /// Make the amplifier geometry agree with the shape of the segment read from disk.
    ///
    /// A raw segment whose extent differs from `raw_bbox` is assumed to carry a
    /// different number of overscan pixels: the overscan boxes are stretched to the
    /// new extent and the raw offset recomputed from the amplifier's grid position.
    /// This is only valid while the data region keeps its nominal size and still
    /// fits in the segment.
    ///
    /// Arguments
    /// -----------------
    /// * `on_disk`: extent of the raw segment as read.
    ///
    /// Return
    /// ----------
    /// * `Ok(true)` if the geometry was patched, `Ok(false)` if it already matched,
    ///   or [`ObsInfoError::Assembly`] when the difference is not explained by the overscan.
    pub fn fit_raw_extent(&mut self, on_disk: BBox) -> Result<bool, ObsInfoError> {
        if self.raw_bbox == on_disk {
            return Ok(false);
        }

        if self.raw_data_bbox.dims() != self.bbox.dims() {
            return Err(ObsInfoError::Assembly(format!(
                "amplifier {}: active area is the wrong size ({:?} v. {:?})",
                self.name,
                self.raw_data_bbox.dims(),
                self.bbox.dims()
            )));
        }
        if !on_disk.contains(&self.raw_data_bbox) {
            return Err(ObsInfoError::Assembly(format!(
                "amplifier {}: data region {} outside raw segment {}",
                self.name, self.raw_data_bbox, on_disk
            )));
        }

        let (w, h) = on_disk.dims();
        let (old_w, old_h) = self.raw_bbox.dims();

        let hos = self.raw_horizontal_overscan;
        self.raw_horizontal_overscan = BBox::new(hos.x0, hos.y0, w.saturating_sub(hos.x0), hos.height);
        let vos = self.raw_vertical_overscan;
        self.raw_vertical_overscan = BBox::new(vos.x0, vos.y0, vos.width, h.saturating_sub(vos.y0));

        let (x0, y0) = self.raw_xy_offset;
        let ix = if old_w == 0 { 0 } else { x0 / old_w };
        let iy = if old_h == 0 { 0 } else { y0 / old_h };
        self.raw_xy_offset = (ix * w, iy * h);
        self.raw_bbox = on_disk;

        Ok(true)
    }

    /// Raw segment placement in the untrimmed detector image.
    pub fn raw_placement(&self) -> BBox {
        BBox::new(
            self.raw_xy_offset.0,
            self.raw_xy_offset.1,
            self.raw_bbox.width,
            self.raw_bbox.height,
        )
    }
}

/// Nominal layout of one detector.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorGeometry {
    pub name: String,
    pub num: DetectorNum,
    /// Extent of the trimmed detector image.
    pub bbox: BBox,
    /// Amplifiers, indexed by amplifier number.
    pub amps: Vec<AmpGeometry>,
}

/// Sizes used by [`DetectorGeometry::grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmpLayout {
    pub data_width: usize,
    pub data_height: usize,
    pub prescan: usize,
    pub serial_overscan: usize,
    pub parallel_overscan: usize,
}

impl DetectorGeometry {
    /// Regular `nx` × `ny` grid of identical amplifiers.
    ///
    /// The bottom row is read from the lower-left corner and the top row from the
    /// upper-right corner, the usual arrangement of a two-sided CCD. Amplifier `i`
    /// sits at column `i % nx`, row `i / nx` and is named `C<row><column>`.
    pub fn grid(name: &str, num: DetectorNum, nx: usize, ny: usize, layout: AmpLayout) -> Self {
        let raw_w = layout.prescan + layout.data_width + layout.serial_overscan;
        let raw_h = layout.data_height + layout.parallel_overscan;

        let amps = (0..nx * ny)
            .map(|i| {
                let (ix, iy) = (i % nx, i / nx);
                AmpGeometry {
                    name: format!("C{iy}{ix}"),
                    bbox: BBox::new(
                        ix * layout.data_width,
                        iy * layout.data_height,
                        layout.data_width,
                        layout.data_height,
                    ),
                    readout_corner: if iy == 0 {
                        ReadoutCorner::LL
                    } else {
                        ReadoutCorner::UR
                    },
                    raw_bbox: BBox::from_dims(raw_w, raw_h),
                    raw_data_bbox: BBox::new(
                        layout.prescan,
                        0,
                        layout.data_width,
                        layout.data_height,
                    ),
                    raw_horizontal_overscan: BBox::new(
                        layout.prescan + layout.data_width,
                        0,
                        layout.serial_overscan,
                        layout.data_height,
                    ),
                    raw_vertical_overscan: BBox::new(
                        layout.prescan,
                        layout.data_height,
                        layout.data_width,
                        layout.parallel_overscan,
                    ),
                    raw_xy_offset: (ix * raw_w, iy * raw_h),
                }
            })
            .collect();

        DetectorGeometry {
            name: name.to_string(),
            num,
            bbox: BBox::from_dims(nx * layout.data_width, ny * layout.data_height),
            amps,
        }
    }

    /// Extent of the untrimmed detector image.
    pub fn raw_extent(&self) -> BBox {
        raw_extent(&self.amps)
    }
}

/// Smallest box at the origin holding every raw segment placement.
pub fn raw_extent(amps: &[AmpGeometry]) -> BBox {
    let (w, h) = amps.iter().fold((0, 0), |(w, h), amp| {
        let p = amp.raw_placement();
        (w.max(p.x_end()), h.max(p.y_end()))
    });
    BBox::from_dims(w, h)
}

/// Registered deviation of one amplifier from its nominal geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct AsBuiltCorrection {
    pub amp_index: usize,
    pub bbox: BBox,
    pub readout_corner: ReadoutCorner,
    /// Replacement data region within the raw segment, when it moved too.
    pub raw_data_bbox: Option<BBox>,
    /// Deviations up to this many pixels are ignored.
    pub tolerance: usize,
}

impl AsBuiltCorrection {
    pub fn new(amp_index: usize, bbox: BBox, readout_corner: ReadoutCorner) -> Self {
        AsBuiltCorrection {
            amp_index,
            bbox,
            readout_corner,
            raw_data_bbox: None,
            tolerance: 0,
        }
    }

    pub fn with_raw_data_bbox(mut self, raw_data_bbox: BBox) -> Self {
        self.raw_data_bbox = Some(raw_data_bbox);
        self
    }

    pub fn with_tolerance(mut self, tolerance: usize) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Substitute the corrected geometry into `amp` when it deviates from the
    /// nominal one by more than the tolerance. Returns `true` if `amp` changed.
    pub fn apply(&self, amp: &mut AmpGeometry) -> bool {
        let data_deviation = self
            .raw_data_bbox
            .map_or(0, |b| b.deviation(&amp.raw_data_bbox));
        let deviates = self.bbox.deviation(&amp.bbox).max(data_deviation) > self.tolerance
            || self.readout_corner != amp.readout_corner;
        if !deviates {
            return false;
        }

        amp.bbox = self.bbox;
        amp.readout_corner = self.readout_corner;
        if let Some(raw_data_bbox) = self.raw_data_bbox {
            amp.raw_data_bbox = raw_data_bbox;
        }
        true
    }
}

/// Source of detector layouts and as-built corrections.
pub trait GeometryCatalog {
    fn detector(&self, detector_num: DetectorNum) -> Option<&DetectorGeometry>;

    fn corrections(&self, _detector_num: DetectorNum) -> &[AsBuiltCorrection] {
        &[]
    }
}

/// In-memory [`GeometryCatalog`].
#[derive(Debug, Clone, Default)]
pub struct StaticGeometryCatalog {
    detectors: AHashMap<DetectorNum, DetectorGeometry>,
    corrections: AHashMap<DetectorNum, Vec<AsBuiltCorrection>>,
}

impl StaticGeometryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(mut self, detector: DetectorGeometry) -> Self {
        self.detectors.insert(detector.num, detector);
        self
    }

    pub fn with_correction(mut self, detector_num: DetectorNum, correction: AsBuiltCorrection) -> Self {
        self.corrections
            .entry(detector_num)
            .or_default()
            .push(correction);
        self
    }
}

impl GeometryCatalog for StaticGeometryCatalog {
    fn detector(&self, detector_num: DetectorNum) -> Option<&DetectorGeometry> {
        self.detectors.get(&detector_num)
    }

    fn corrections(&self, detector_num: DetectorNum) -> &[AsBuiltCorrection] {
        self.corrections
            .get(&detector_num)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
