use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{
    ColorType, DynamicImage, GrayImage, ImageBuffer, ImageDecoder, ImageFormat, ImageReader,
    ImageEncoder, LumaA, Rgba,
};
use ndarray::{Array2, Array3};
use tracing::{debug, warn};

use crate::consts::ALPHA_OPAQUE;
use crate::error::{Result, StitchError};
use crate::raster::{PixelDepth, Raster};
use crate::remap::{ImageId, Layer};
use crate::stitch::{CanvasWriter, StitchOutput};

/// A decoded image: samples, alpha and embedded ICC profile.
pub struct Decoded {
    pub raster: Raster,
    pub alpha: Array2<u8>,
    pub icc_profile: Vec<u8>,
}

fn depth_of(color: ColorType) -> PixelDepth {
    match color {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => PixelDepth::U8,
        ColorType::Rgb32F | ColorType::Rgba32F => PixelDepth::F32,
        _ => PixelDepth::U16,
    }
}

fn is_gray(color: ColorType) -> bool {
    matches!(
        color,
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16
    )
}

/// Decode an image file, keeping its depth, channel count and alpha.
///
/// Gray images load as one channel, everything else as RGB. Files without an
/// alpha channel are fully valid.
pub fn load_raster(path: &Path) -> Result<Decoded> {
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()?;
    let icc_profile = decoder.icc_profile()?.unwrap_or_default();
    let img = DynamicImage::from_decoder(decoder)?;
    let color = img.color();
    let depth = depth_of(color);
    let channels = if is_gray(color) { 1 } else { 3 };

    let rgba = img.to_rgba32f();
    let (w, h) = (rgba.width() as usize, rgba.height() as usize);
    let mut data = Array3::<f32>::zeros((h, w, channels));
    let mut alpha = Array2::<u8>::from_elem((h, w), ALPHA_OPAQUE);
    for (x, y, px) in rgba.enumerate_pixels() {
        let (row, col) = (y as usize, x as usize);
        for c in 0..channels {
            data[[row, col, c]] = px.0[c];
        }
        if color.has_alpha() {
            alpha[[row, col]] = (px.0[3].clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }

    debug!(
        path = %path.display(),
        width = w,
        height = h,
        channels,
        depth = %depth,
        icc = !icc_profile.is_empty(),
        "Image decoded"
    );
    Ok(Decoded {
        raster: Raster::new(data, depth),
        alpha,
        icc_profile,
    })
}

/// Load an 8-bit mask; non-zero marks valid pixels.
pub fn load_mask(path: &Path) -> Result<Array2<u8>> {
    let mask: GrayImage = image::open(path)?.to_luma8();
    let (w, h) = mask.dimensions();
    Array2::from_shape_vec((h as usize, w as usize), mask.into_raw())
        .map_err(|e| StitchError::Project(format!("mask {}: {e}", path.display())))
}

/// Load a pre-remapped layer placed at `(x, y)` on the canvas.
///
/// An explicit mask is combined with the image's own alpha by taking the
/// smaller of the two.
pub fn load_layer(image: &Path, mask: Option<&Path>, x: i64, y: i64) -> Result<Layer> {
    let decoded = load_raster(image)?;
    let mut alpha = decoded.alpha;
    if let Some(mask_path) = mask {
        let mask = load_mask(mask_path)?;
        if mask.dim() != alpha.dim() {
            return Err(StitchError::Project(format!(
                "mask {} is {}x{} but image {} is {}x{}",
                mask_path.display(),
                mask.ncols(),
                mask.nrows(),
                image.display(),
                alpha.ncols(),
                alpha.nrows()
            )));
        }
        alpha.zip_mut_with(&mask, |a, &m| *a = (*a).min(m));
    }
    let mut layer = Layer::with_alpha(decoded.raster, alpha, x, y);
    layer.icc_profile = decoded.icc_profile;
    Ok(layer)
}

fn quantize(v: f32, max: f32) -> f32 {
    (v.clamp(0.0, 1.0) * max).round()
}

/// Canvas plus alpha as an image buffer of the output depth.
fn to_dynamic(output: &StitchOutput) -> Result<DynamicImage> {
    let canvas = &output.canvas;
    let (w, h) = (canvas.width() as u32, canvas.height() as u32);
    let gray = canvas.channels() == 1;
    let sample = |row: usize, col: usize, c: usize| {
        canvas.image.data[[row, col, if gray { 0 } else { c }]]
    };
    let size_error = || StitchError::InvalidDimensions {
        width: w as usize,
        height: h as usize,
    };

    let img = match (output.depth, gray) {
        (PixelDepth::U8, true) => DynamicImage::ImageLumaA8(ImageBuffer::from_fn(w, h, |x, y| {
            let (row, col) = (y as usize, x as usize);
            LumaA([quantize(sample(row, col, 0), 255.0) as u8, canvas.alpha[[row, col]]])
        })),
        (PixelDepth::U8, false) => DynamicImage::ImageRgba8(ImageBuffer::from_fn(w, h, |x, y| {
            let (row, col) = (y as usize, x as usize);
            let q = |c| quantize(sample(row, col, c), 255.0) as u8;
            Rgba([q(0), q(1), q(2), canvas.alpha[[row, col]]])
        })),
        (PixelDepth::U16, true) => DynamicImage::ImageLumaA16(ImageBuffer::from_fn(w, h, |x, y| {
            let (row, col) = (y as usize, x as usize);
            let a = canvas.alpha[[row, col]] as u16 * 257;
            LumaA([quantize(sample(row, col, 0), 65535.0) as u16, a])
        })),
        (PixelDepth::U16, false) => DynamicImage::ImageRgba16(ImageBuffer::from_fn(w, h, |x, y| {
            let (row, col) = (y as usize, x as usize);
            let q = |c| quantize(sample(row, col, c), 65535.0) as u16;
            Rgba([q(0), q(1), q(2), canvas.alpha[[row, col]] as u16 * 257])
        })),
        (PixelDepth::F32, _) => {
            let mut pixels = Vec::with_capacity(w as usize * h as usize * 4);
            for ((row, col), &a) in canvas.alpha.indexed_iter() {
                pixels.extend_from_slice(&[
                    sample(row, col, 0),
                    sample(row, col, 1),
                    sample(row, col, 2),
                    a as f32 / 255.0,
                ]);
            }
            DynamicImage::ImageRgba32F(ImageBuffer::from_raw(w, h, pixels).ok_or_else(size_error)?)
        }
    };
    Ok(img)
}

/// Gray plus alpha as RGBA; most codecs other than PNG lack a gray-alpha layout.
fn without_gray_alpha(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLumaA8(_) => DynamicImage::ImageRgba8(img.to_rgba8()),
        DynamicImage::ImageLumaA16(_) => DynamicImage::ImageRgba16(img.to_rgba16()),
        other => other,
    }
}

fn png_compression(name: Option<&str>) -> CompressionType {
    match name {
        Some("none") => CompressionType::Uncompressed,
        Some("fast") => CompressionType::Fast,
        Some("best") => CompressionType::Best,
        _ => CompressionType::Default,
    }
}

/// Save a finished canvas with its alpha, choosing the format from the file
/// extension (TIFF when there is none).
///
/// PNG honours the compression setting and embeds the ICC profile; other
/// formats are written with the codec defaults.
pub fn save_canvas(output: &StitchOutput, path: &Path) -> Result<()> {
    let img = to_dynamic(output)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => {
            let file = BufWriter::new(File::create(path)?);
            let mut encoder = PngEncoder::new_with_quality(
                file,
                png_compression(output.compression.as_deref()),
                FilterType::Adaptive,
            );
            if !output.icc_profile.is_empty()
                && encoder.set_icc_profile(output.icc_profile.clone()).is_err()
            {
                warn!(path = %path.display(), "ICC profile not embedded");
            }
            img.write_with_encoder(encoder)?;
        }
        Some(_) => {
            if output.compression.is_some() || !output.icc_profile.is_empty() {
                debug!(path = %path.display(), "Compression and ICC profile use codec defaults");
            }
            without_gray_alpha(img).save(path)?;
        }
        None => without_gray_alpha(img).save_with_format(path, ImageFormat::Tiff)?,
    }
    debug!(path = %path.display(), depth = %output.depth, "Canvas written");
    Ok(())
}

/// Writes the canvas to `path` and layers next to it as
/// `<stem>_<index><ext>`.
#[derive(Clone, Debug)]
pub struct FileWriter {
    path: PathBuf,
    written: Vec<PathBuf>,
}

impl FileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: Vec::new(),
        }
    }

    /// Files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn layer_path(&self, image: ImageId) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("layer");
        let name = match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{stem}_{image:04}.{ext}"),
            None => format!("{stem}_{image:04}"),
        };
        self.path.with_file_name(name)
    }
}

impl CanvasWriter for FileWriter {
    fn write(&mut self, output: &StitchOutput) -> Result<()> {
        save_canvas(output, &self.path)?;
        self.written.push(self.path.clone());
        Ok(())
    }

    fn write_layer(&mut self, image: ImageId, output: &StitchOutput) -> Result<()> {
        let path = self.layer_path(image);
        save_canvas(output, &path)?;
        self.written.push(path);
        Ok(())
    }
}
