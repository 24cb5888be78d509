//! Boundary with the geometric remapper and the panorama data model.
//!
//! The compositing core never projects images itself. It asks a [`Remapper`]
//! for images already transformed into canvas coordinates and reads canvas
//! geometry from a [`PanoramaSource`].

pub mod layers;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::FULL_CIRCLE_DEGREES;
use crate::error::{Result, StitchError};
use crate::geometry::Rect;
use crate::raster::{PixelDepth, Raster};

pub use layers::{Layer, LayerSet};

/// Index of a source image within the panorama.
pub type ImageId = usize;

/// Pixel layout of a source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFormat {
    pub depth: PixelDepth,
    pub channels: usize,
}

/// Output canvas description supplied by the panorama model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanoramaOptions {
    pub width: usize,
    pub height: usize,
    /// Horizontal field of view in degrees.
    #[serde(default = "default_hfov")]
    pub hfov: f64,
    /// Requested output depth; the source depth is used when unset.
    #[serde(default)]
    pub output_depth: Option<PixelDepth>,
    #[serde(default)]
    pub compression: Option<String>,
}

fn default_hfov() -> f64 {
    90.0
}

impl PanoramaOptions {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            hfov: default_hfov(),
            output_depth: None,
            compression: None,
        }
    }

    /// True for 360° panoramas whose left and right edges meet.
    pub fn wraparound(&self) -> bool {
        self.hfov >= FULL_CIRCLE_DEGREES
    }

    pub fn canvas_rect(&self) -> Rect {
        Rect::of_size(self.width, self.height)
    }

    /// Same panorama rendered `width` pixels wide, height scaled to match.
    pub fn scaled_to_width(&self, width: usize) -> PanoramaOptions {
        let factor = width as f64 / self.width.max(1) as f64;
        PanoramaOptions {
            width,
            height: ((self.height as f64 * factor).ceil() as usize).max(1),
            ..self.clone()
        }
    }
}

/// A source image projected into canvas space.
///
/// `image` and `alpha` cover exactly `bbox`. Alpha 0 marks pixels outside
/// the projected footprint.
#[derive(Clone, Debug)]
pub struct RemappedImage {
    pub id: ImageId,
    pub image: Raster,
    pub alpha: Array2<u8>,
    pub bbox: Rect,
    pub icc_profile: Vec<u8>,
}

impl RemappedImage {
    pub fn new(id: ImageId, image: Raster, alpha: Array2<u8>, bbox: Rect) -> Result<Self> {
        if alpha.dim() != (image.height(), image.width())
            || bbox.width() != image.width()
            || bbox.height() != image.height()
        {
            return Err(StitchError::Remap {
                image: id,
                reason: format!(
                    "buffer {}x{} does not match alpha {}x{} and bbox {}",
                    image.width(),
                    image.height(),
                    alpha.ncols(),
                    alpha.nrows(),
                    bbox
                ),
            });
        }
        Ok(Self {
            id,
            image,
            alpha,
            bbox,
            icc_profile: Vec::new(),
        })
    }

    /// Part of the bounding box that lies on the canvas.
    pub fn overlap(&self, canvas: &Rect) -> Rect {
        self.bbox.intersect(canvas)
    }

    /// Valid-alpha test in canvas coordinates. Outside `bbox` is invalid.
    pub fn alpha_at(&self, x: i64, y: i64) -> u8 {
        if !self.bbox.contains(x, y) {
            return 0;
        }
        self.alpha[[(y - self.bbox.top) as usize, (x - self.bbox.left) as usize]]
    }
}

/// Alpha-only remap result used for blend-order estimation.
#[derive(Clone, Debug)]
pub struct AlphaLayer {
    pub alpha: Array2<u8>,
    pub bbox: Rect,
}

impl AlphaLayer {
    pub fn alpha_at(&self, x: i64, y: i64) -> u8 {
        if !self.bbox.contains(x, y) {
            return 0;
        }
        self.alpha[[(y - self.bbox.top) as usize, (x - self.bbox.left) as usize]]
    }
}

/// Read side of the panorama data model.
pub trait PanoramaSource {
    fn options(&self) -> &PanoramaOptions;

    /// All image indices, in panorama order.
    fn image_ids(&self) -> Vec<ImageId>;

    fn image_format(&self, image: ImageId) -> Result<ImageFormat>;

    /// Predicted footprint of `image` on the canvas described by `options`.
    fn image_roi(&self, image: ImageId, options: &PanoramaOptions) -> Result<Rect>;
}

/// Produces remapped images on demand.
///
/// Implementations may run on a CPU interpolation kernel or on a GPU; calls for
/// different images are independent and may come from several threads.
pub trait Remapper: Sync {
    /// Project `image` onto the canvas, restricted to `roi`.
    fn remap(&self, image: ImageId, options: &PanoramaOptions, roi: Rect)
        -> Result<RemappedImage>;

    /// Project only the alpha of `image`, possibly at a reduced canvas size.
    fn remap_alpha(&self, image: ImageId, options: &PanoramaOptions) -> Result<AlphaLayer>;

    /// Hand a remapped image back once its contribution has been folded in.
    fn release(&self, _image: RemappedImage) {}
}
