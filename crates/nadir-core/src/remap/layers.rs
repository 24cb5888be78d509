use ndarray::{s, Array2};
use tracing::debug;

use crate::error::{Result, StitchError};
use crate::geometry::Rect;
use crate::raster::Raster;

use super::{AlphaLayer, ImageFormat, ImageId, PanoramaOptions, PanoramaSource, RemappedImage, Remapper};

/// An image that is already in canvas space, placed at `(x, y)`.
#[derive(Clone, Debug)]
pub struct Layer {
    pub image: Raster,
    pub alpha: Array2<u8>,
    pub x: i64,
    pub y: i64,
    pub icc_profile: Vec<u8>,
}

impl Layer {
    /// Layer with every pixel valid.
    pub fn opaque(image: Raster, x: i64, y: i64) -> Self {
        let alpha = Array2::from_elem((image.height(), image.width()), u8::MAX);
        Self {
            image,
            alpha,
            x,
            y,
            icc_profile: Vec::new(),
        }
    }

    pub fn with_alpha(image: Raster, alpha: Array2<u8>, x: i64, y: i64) -> Self {
        Self {
            image,
            alpha,
            x,
            y,
            icc_profile: Vec::new(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.x, self.y, self.image.width(), self.image.height())
    }
}

/// Pre-remapped layers held in memory.
///
/// Serves as both the panorama model and the remapper when the geometric
/// projection happened elsewhere (e.g. layers written by an external remapper).
#[derive(Clone, Debug)]
pub struct LayerSet {
    options: PanoramaOptions,
    layers: Vec<Layer>,
}

impl LayerSet {
    pub fn new(options: PanoramaOptions) -> Self {
        Self {
            options,
            layers: Vec::new(),
        }
    }

    /// Append a layer, returning its image index.
    pub fn push(&mut self, layer: Layer) -> Result<ImageId> {
        if layer.alpha.dim() != (layer.image.height(), layer.image.width()) {
            return Err(StitchError::InvalidDimensions {
                width: layer.alpha.ncols(),
                height: layer.alpha.nrows(),
            });
        }
        self.layers.push(layer);
        Ok(self.layers.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, image: ImageId) -> Result<&Layer> {
        self.layers.get(image).ok_or_else(|| StitchError::Remap {
            image,
            reason: format!("no such layer (total: {})", self.layers.len()),
        })
    }

    fn scale_for(&self, options: &PanoramaOptions) -> f64 {
        options.width as f64 / self.options.width.max(1) as f64
    }
}

impl PanoramaSource for LayerSet {
    fn options(&self) -> &PanoramaOptions {
        &self.options
    }

    fn image_ids(&self) -> Vec<ImageId> {
        (0..self.layers.len()).collect()
    }

    fn image_format(&self, image: ImageId) -> Result<ImageFormat> {
        let layer = self.layer(image)?;
        Ok(ImageFormat {
            depth: layer.image.depth,
            channels: layer.image.channels(),
        })
    }

    fn image_roi(&self, image: ImageId, options: &PanoramaOptions) -> Result<Rect> {
        let layer = self.layer(image)?;
        Ok(layer
            .rect()
            .scaled(self.scale_for(options))
            .intersect(&options.canvas_rect()))
    }
}

impl Remapper for LayerSet {
    fn remap(&self, image: ImageId, options: &PanoramaOptions, roi: Rect) -> Result<RemappedImage> {
        let layer = self.layer(image)?;
        if options.width != self.options.width || options.height != self.options.height {
            return Err(StitchError::Remap {
                image,
                reason: format!(
                    "layers are fixed at {}x{}, requested {}x{}",
                    self.options.width, self.options.height, options.width, options.height
                ),
            });
        }

        let bbox = layer.rect().intersect(&roi);
        if bbox.is_empty() {
            let empty = Raster::zeros(0, 0, layer.image.channels(), layer.image.depth);
            return RemappedImage::new(image, empty, Array2::zeros((0, 0)), Rect::default());
        }
        let local = bbox.translate(-layer.x, -layer.y);
        let alpha = layer
            .alpha
            .slice(s![
                local.top as usize..local.bottom as usize,
                local.left as usize..local.right as usize
            ])
            .to_owned();

        let mut remapped = RemappedImage::new(image, layer.image.crop(&local), alpha, bbox)?;
        remapped.icc_profile = layer.icc_profile.clone();
        debug!(image, bbox = %bbox, "Layer remapped");
        Ok(remapped)
    }

    fn remap_alpha(&self, image: ImageId, options: &PanoramaOptions) -> Result<AlphaLayer> {
        let layer = self.layer(image)?;
        let scale = self.scale_for(options);
        let bbox = self.image_roi(image, options)?;

        // Nearest-neighbour sampling at the pixel centre of each target pixel.
        let mut alpha = Array2::<u8>::zeros((bbox.height(), bbox.width()));
        for ((row, col), a) in alpha.indexed_iter_mut() {
            let cx = ((bbox.left + col as i64) as f64 + 0.5) / scale;
            let cy = ((bbox.top + row as i64) as f64 + 0.5) / scale;
            let lx = cx.floor() as i64 - layer.x;
            let ly = cy.floor() as i64 - layer.y;
            if lx >= 0
                && ly >= 0
                && (lx as usize) < layer.image.width()
                && (ly as usize) < layer.image.height()
            {
                *a = layer.alpha[[ly as usize, lx as usize]];
            }
        }
        Ok(AlphaLayer { alpha, bbox })
    }
}
