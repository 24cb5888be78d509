use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StitchError};
use crate::geometry::Rect;

/// Sample precision of a raster, carried at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelDepth {
    U8,
    U16,
    F32,
}

impl PixelDepth {
    /// Largest integer code of the depth. Float rasters report 1.0.
    pub fn max_value(self) -> f32 {
        match self {
            Self::U8 => 255.0,
            Self::U16 => 65535.0,
            Self::F32 => 1.0,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Self::F32)
    }
}

impl std::fmt::Display for PixelDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit"),
            Self::U16 => write!(f, "16-bit"),
            Self::F32 => write!(f, "32-bit float"),
        }
    }
}

/// A multi-channel image with a runtime channel count.
///
/// Samples are f32, shape = (height, width, channels). Integer depths hold
/// normalized values in [0.0, 1.0]; `F32` rasters hold unbounded radiance.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    pub data: Array3<f32>,
    pub depth: PixelDepth,
}

impl Raster {
    pub fn new(data: Array3<f32>, depth: PixelDepth) -> Self {
        Self { data, depth }
    }

    pub fn zeros(width: usize, height: usize, channels: usize, depth: PixelDepth) -> Self {
        Self::new(Array3::zeros((height, width, channels)), depth)
    }

    /// Single-channel raster from a 2-D plane.
    pub fn from_gray(plane: Array2<f32>, depth: PixelDepth) -> Self {
        Self::new(plane.insert_axis(Axis(2)), depth)
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// One channel as a 2-D view.
    pub fn plane(&self, channel: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(2), channel)
    }

    /// All channels of one pixel.
    pub fn pixel(&self, row: usize, col: usize) -> ArrayView1<'_, f32> {
        self.data.slice(s![row, col, ..])
    }

    /// Re-tag with another depth, quantizing when the target is integer.
    pub fn convert_depth(&mut self, depth: PixelDepth) {
        if depth.is_integer() {
            let max = depth.max_value();
            self.data
                .mapv_inplace(|v| (v.clamp(0.0, 1.0) * max).round() / max);
        }
        self.depth = depth;
    }

    /// Copy of the pixels inside `rect` (raster-local coordinates).
    pub fn crop(&self, rect: &Rect) -> Raster {
        let r = rect.intersect(&Rect::of_size(self.width(), self.height()));
        let data = self
            .data
            .slice(s![
                r.top as usize..r.bottom as usize,
                r.left as usize..r.right as usize,
                ..
            ])
            .to_owned();
        Raster::new(data, self.depth)
    }
}

/// Output image plus its alpha, sized to the panorama.
#[derive(Clone, Debug, PartialEq)]
pub struct Canvas {
    pub image: Raster,
    pub alpha: Array2<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, channels: usize, depth: PixelDepth) -> Result<Self> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(StitchError::InvalidDimensions { width, height });
        }
        Ok(Self {
            image: Raster::zeros(width, height, channels, depth),
            alpha: Array2::zeros((height, width)),
        })
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }

    pub fn channels(&self) -> usize {
        self.image.channels()
    }

    pub fn bounds(&self) -> Rect {
        Rect::of_size(self.width(), self.height())
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.alpha[[row, col]] > 0
    }

    /// Number of pixels with non-zero alpha.
    pub fn valid_count(&self) -> usize {
        self.alpha.iter().filter(|&&a| a > 0).count()
    }

    /// Bounding box of all valid pixels, empty if none.
    pub fn valid_bounds(&self) -> Rect {
        let mut bounds = Rect::default();
        for ((row, col), &a) in self.alpha.indexed_iter() {
            if a > 0 {
                bounds = bounds.union(&Rect::from_origin_size(col as i64, row as i64, 1, 1));
            }
        }
        bounds
    }
}
