use crate::{
    assembly::geometry::{AmpGeometry, BBox},
    constants::{DetectorNum, ImagePlane, MaskPlane},
    header::RawHeader,
};

/// Pixels of one amplifier as read from a raw file, in readout orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct AmplifierSegment {
    pub amp_index: usize,
    pub pixels: ImagePlane,
    pub mask: Option<MaskPlane>,
    pub variance: Option<ImagePlane>,
    /// Header of the amplifier extension (`DATASEC`, `DETSEC`, `BIASSEC`, ...).
    pub header: RawHeader,
}

impl AmplifierSegment {
    pub fn new(amp_index: usize, pixels: ImagePlane) -> Self {
        AmplifierSegment {
            amp_index,
            pixels,
            mask: None,
            variance: None,
            header: RawHeader::new(),
        }
    }

    pub fn with_mask(mut self, mask: MaskPlane) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_variance(mut self, variance: ImagePlane) -> Self {
        self.variance = Some(variance);
        self
    }

    pub fn with_header(mut self, header: RawHeader) -> Self {
        self.header = header;
        self
    }

    /// Extent of the segment as read.
    pub fn bbox(&self) -> BBox {
        BBox::from_dims(self.pixels.ncols(), self.pixels.nrows())
    }
}

/// Whether overscan regions are kept in the assembled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyMode {
    /// Data regions only, placed at their detector bounding boxes.
    #[default]
    Trimmed,
    /// Whole raw segments, placed at their raw offsets.
    Untrimmed,
}

/// Detector image built from amplifier segments.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledExposure {
    pub detector_name: String,
    pub detector_num: DetectorNum,
    pub mode: AssemblyMode,
    pub image: ImagePlane,
    pub mask: Option<MaskPlane>,
    pub variance: Option<ImagePlane>,
    /// Amplifier geometry actually used, after corrections and patching.
    pub amps: Vec<AmpGeometry>,
}

impl AssembledExposure {
    /// Image extent as `(width, height)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.image.ncols(), self.image.nrows())
    }
}
