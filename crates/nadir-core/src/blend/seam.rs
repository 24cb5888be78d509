//! Multiband (Laplacian pyramid) blending.
//!
//! Every image is decomposed into a Laplacian pyramid and a Gaussian pyramid
//! of its mask. A canvas-sized accumulator pyramid keeps, per level and pixel,
//! the running weighted mean of all Laplacian values folded so far together
//! with the sum of their weights. Coarse levels therefore blend over a wide
//! area and fine levels only close to the seam. `finalize` collapses the
//! accumulator into the canvas.

use ndarray::{s, Array2, Array3, ArrayView1, ArrayViewMut1, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{ALPHA_OPAQUE, DEFAULT_SEAM_LEVELS, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{Result, StitchError};
use crate::geometry::Rect;
use crate::pyramid::{
    build_laplacian, collapse, filter_half_width, from_planes, max_levels, to_planes, Pyramid,
    PyramidLevel, PyramidValue,
};
use crate::raster::{Canvas, PixelDepth};
use crate::remap::RemappedImage;

use super::{overlap_window, BlendFunctor, Window};

/// Tuning for [`SeamBlender`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeamParams {
    /// Pyramid depth; `None` uses the default, both clamped to the canvas size.
    pub levels: Option<usize>,
}

impl Default for SeamParams {
    fn default() -> Self {
        Self { levels: None }
    }
}

impl SeamParams {
    /// Depth actually used on a `width x height` canvas.
    pub fn effective_levels(&self, width: usize, height: usize) -> usize {
        self.levels
            .unwrap_or(DEFAULT_SEAM_LEVELS)
            .clamp(1, max_levels(width, height).max(1))
    }
}

/// Accumulator pyramid in one numeric type.
struct Accumulator<T> {
    pyramid: Pyramid<T>,
    width: usize,
    height: usize,
}

impl<T: PyramidValue> Accumulator<T> {
    fn new(canvas: &Canvas, levels: usize, wraparound: bool) -> Self {
        Self {
            pyramid: Pyramid::zeros(
                canvas.width(),
                canvas.height(),
                canvas.channels(),
                levels,
                wraparound,
            ),
            width: canvas.width(),
            height: canvas.height(),
        }
    }

    /// Working window of an image: its overlap grown by the pyramid's filter
    /// reach and aligned so that every level maps onto the accumulator by an
    /// integer shift.
    fn work_rect(&self, overlap: &Rect) -> Rect {
        let levels = self.pyramid.len();
        let canvas = Rect::of_size(self.width, self.height);
        let block = 1i64 << (levels - 1);
        let margin = filter_half_width(levels) as i64;

        let align_down = |v: i64| v.div_euclid(block) * block;
        let align_up = |v: i64| (v + block - 1).div_euclid(block) * block;

        let mut rect = Rect::new(
            align_down((overlap.left - margin).max(0)),
            align_down((overlap.top - margin).max(0)),
            align_up(overlap.right + margin).min(canvas.right),
            align_up(overlap.bottom + margin).min(canvas.bottom),
        );
        if self.pyramid.wraparound() {
            rect.left = 0;
            rect.right = canvas.right;
        }
        if max_levels(rect.width(), rect.height()) < levels {
            rect = canvas;
        }
        rect
    }

    fn fold(&mut self, canvas: &mut Canvas, image: &RemappedImage, window: &Window) -> Result<()> {
        let work = self.work_rect(&window.canvas);
        let levels = self.pyramid.len();
        let channels = canvas.channels();

        let mut planes = Array3::<T>::zeros((channels, work.height(), work.width()));
        let mut alpha = Array2::<u8>::zeros((work.height(), work.width()));
        let inner = window.canvas.translate(-work.left, -work.top);
        let rows = inner.top as usize..inner.bottom as usize;
        let cols = inner.left as usize..inner.right as usize;
        planes
            .slice_mut(s![.., rows.clone(), cols.clone()])
            .assign(&to_planes::<T>(&image.image.crop(&window.local)));
        alpha.slice_mut(s![rows, cols]).assign(&image.alpha.slice(s![
            window.local.top as usize..window.local.bottom as usize,
            window.local.left as usize..window.local.right as usize
        ]));

        let laplacian = build_laplacian(&planes, alpha.view(), levels, self.pyramid.wraparound())?;
        if laplacian.len() != levels {
            return Err(StitchError::InvalidDimensions {
                width: work.width(),
                height: work.height(),
            });
        }
        debug!(image = image.id, work = %work, levels, "Folding Laplacian pyramid");

        for (k, (acc, incoming)) in self
            .pyramid
            .levels_mut()
            .iter_mut()
            .zip(laplacian.levels())
            .enumerate()
        {
            blend_level(acc, incoming, work.left >> k, work.top >> k)?;
        }

        let (ct, cl) = (window.canvas.top as usize, window.canvas.left as usize);
        Zip::from(canvas.alpha.slice_mut(s![
            ct..window.canvas.bottom as usize,
            cl..window.canvas.right as usize
        ]))
        .and(alpha.slice(s![
            inner.top as usize..inner.bottom as usize,
            inner.left as usize..inner.right as usize
        ]))
        .for_each(|dst, &a| {
            if a > 0 {
                *dst = ALPHA_OPAQUE;
            }
        });
        Ok(())
    }

    fn finalize(self, canvas: &mut Canvas) -> Result<()> {
        let depth = canvas.image.depth;
        let planes = collapse(self.pyramid)?;
        let raster = from_planes(&planes, depth);
        Zip::from(canvas.image.data.lanes_mut(Axis(2)))
            .and(raster.data.lanes(Axis(2)))
            .and(&canvas.alpha)
            .for_each(|mut dst, src, &a| {
                if a > 0 {
                    dst.assign(&src);
                } else {
                    dst.fill(0.0);
                }
            });
        Ok(())
    }
}

/// Fold one incoming level into the accumulator level at offset `(x0, y0)`.
///
/// Per pixel: `acc += (L - acc) * w / (W + w)` and `W += w`, i.e. a running
/// mean weighted by the incoming mask pyramid.
fn blend_level<T: PyramidValue>(
    acc: &mut PyramidLevel<T>,
    incoming: &PyramidLevel<T>,
    x0: i64,
    y0: i64,
) -> Result<()> {
    let (x0, y0) = (x0 as usize, y0 as usize);
    let (w, h) = (incoming.width(), incoming.height());
    if x0 + w > acc.width() || y0 + h > acc.height() {
        return Err(StitchError::InvalidDimensions {
            width: x0 + w,
            height: y0 + h,
        });
    }

    let mut acc_image = acc.image.slice_mut(s![.., y0..y0 + h, x0..x0 + w]);
    let mut acc_weight = acc.weight.slice_mut(s![y0..y0 + h, x0..x0 + w]);
    let zip = Zip::from(acc_image.lanes_mut(Axis(0)))
        .and(&mut acc_weight)
        .and(incoming.image.lanes(Axis(0)))
        .and(&incoming.weight);

    if w * h >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_for_each(blend_pixel::<T>);
    } else {
        zip.for_each(blend_pixel::<T>);
    }
    Ok(())
}

fn blend_pixel<T: PyramidValue>(
    mut dst: ArrayViewMut1<'_, T>,
    total: &mut f32,
    src: ArrayView1<'_, T>,
    weight: &f32,
) {
    let weight = *weight;
    if weight <= 0.0 {
        return;
    }
    let ratio = weight as f64 / (*total as f64 + weight as f64);
    dst.zip_mut_with(&src, |d, &l| {
        let current = d.to_f64();
        *d = T::from_f64(current + (l.to_f64() - current) * ratio);
    });
    *total += weight;
}

enum SeamState {
    Fixed32(Accumulator<i32>),
    Fixed64(Accumulator<i64>),
    Float(Accumulator<f64>),
}

/// Multiband blender. The accumulator's numeric type follows the canvas
/// depth: 32-bit fixed point for 8-bit, 64-bit fixed point for 16-bit and
/// f64 for float canvases.
#[derive(Default)]
pub struct SeamBlender {
    params: SeamParams,
    state: Option<SeamState>,
}

impl SeamBlender {
    pub fn new(params: SeamParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    /// Depth of the accumulator pyramid, once prepared.
    pub fn levels(&self) -> Option<usize> {
        self.state.as_ref().map(|state| match state {
            SeamState::Fixed32(acc) => acc.pyramid.len(),
            SeamState::Fixed64(acc) => acc.pyramid.len(),
            SeamState::Float(acc) => acc.pyramid.len(),
        })
    }
}

impl BlendFunctor for SeamBlender {
    fn name(&self) -> &'static str {
        "seam"
    }

    fn prepare(&mut self, canvas: &Canvas, wraparound: bool) -> Result<()> {
        let levels = self
            .params
            .effective_levels(canvas.width(), canvas.height());
        info!(
            levels,
            width = canvas.width(),
            height = canvas.height(),
            wraparound,
            "Preparing seam accumulator"
        );
        self.state = Some(match canvas.image.depth {
            PixelDepth::U8 => SeamState::Fixed32(Accumulator::new(canvas, levels, wraparound)),
            PixelDepth::U16 => SeamState::Fixed64(Accumulator::new(canvas, levels, wraparound)),
            PixelDepth::F32 => SeamState::Float(Accumulator::new(canvas, levels, wraparound)),
        });
        Ok(())
    }

    fn fold_image(&mut self, canvas: &mut Canvas, image: &RemappedImage) -> Result<()> {
        let Some(window) = overlap_window(canvas, image) else {
            return Ok(());
        };
        match self.state.as_mut() {
            Some(SeamState::Fixed32(acc)) => acc.fold(canvas, image, &window),
            Some(SeamState::Fixed64(acc)) => acc.fold(canvas, image, &window),
            Some(SeamState::Float(acc)) => acc.fold(canvas, image, &window),
            None => Err(StitchError::Configuration(
                "seam blender used before prepare".into(),
            )),
        }
    }

    fn finalize(&mut self, canvas: &mut Canvas) -> Result<()> {
        match self.state.take() {
            Some(SeamState::Fixed32(acc)) => acc.finalize(canvas),
            Some(SeamState::Fixed64(acc)) => acc.finalize(canvas),
            Some(SeamState::Float(acc)) => acc.finalize(canvas),
            None => Ok(()),
        }
    }
}
