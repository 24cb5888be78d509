use ndarray::{stack, Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::debug;

use crate::consts::MAX_PYRAMID_LEVELS;
use crate::error::{Result, StitchError};

use super::expand::expand;
use super::reduce::{reduce, reduce_masked};
use super::value::PyramidValue;

/// One resolution of a pyramid.
///
/// `image` is shaped (channels, height, width). `weight` holds the blend
/// weight of every pixel at this resolution.
#[derive(Clone, Debug)]
pub struct PyramidLevel<T> {
    pub image: Array3<T>,
    pub weight: Array2<f32>,
}

impl<T> PyramidLevel<T> {
    pub fn width(&self) -> usize {
        self.image.dim().2
    }

    pub fn height(&self) -> usize {
        self.image.dim().1
    }
}

/// Level 0 is full resolution; each following level is `ceil(w/2) x ceil(h/2)`.
#[derive(Clone, Debug)]
pub struct Pyramid<T> {
    levels: Vec<PyramidLevel<T>>,
    wraparound: bool,
}

impl<T: PyramidValue> Pyramid<T> {
    /// Zero-filled pyramid of `levels` levels for a `width x height` image.
    pub fn zeros(
        width: usize,
        height: usize,
        channels: usize,
        levels: usize,
        wraparound: bool,
    ) -> Self {
        let mut out = Vec::with_capacity(levels);
        let (mut w, mut h) = (width, height);
        for _ in 0..levels {
            out.push(PyramidLevel {
                image: Array3::zeros((channels, h, w)),
                weight: Array2::zeros((h, w)),
            });
            w = w.div_ceil(2);
            h = h.div_ceil(2);
        }
        Self {
            levels: out,
            wraparound,
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn wraparound(&self) -> bool {
        self.wraparound
    }

    pub fn levels(&self) -> &[PyramidLevel<T>] {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> &mut [PyramidLevel<T>] {
        &mut self.levels
    }

    pub fn level(&self, k: usize) -> &PyramidLevel<T> {
        &self.levels[k]
    }
}

/// Number of levels a `width x height` image supports.
///
/// Levels are added while both dimensions of the current level exceed one,
/// so the coarsest level is never smaller than 1x1.
pub fn max_levels(width: usize, height: usize) -> usize {
    if width == 0 || height == 0 {
        return 0;
    }
    let (mut w, mut h) = (width, height);
    let mut levels = 1;
    while w > 1 && h > 1 && levels < MAX_PYRAMID_LEVELS {
        w = w.div_ceil(2);
        h = h.div_ceil(2);
        levels += 1;
    }
    levels
}

/// Distance in full-resolution pixels over which a `levels`-deep pyramid
/// spreads a single pixel.
pub fn filter_half_width(levels: usize) -> usize {
    let levels = levels.clamp(1, MAX_PYRAMID_LEVELS);
    (1usize << (levels + 1)) - 4
}

fn clamp_levels(requested: usize, width: usize, height: usize) -> Result<usize> {
    let limit = max_levels(width, height);
    if limit == 0 {
        return Err(StitchError::InvalidDimensions { width, height });
    }
    let levels = requested.clamp(1, limit);
    if levels != requested {
        debug!(requested, levels, width, height, "Pyramid depth clamped");
    }
    Ok(levels)
}

/// Gaussian pyramid of one plane under `alpha`, returned finest first.
fn gaussian_plane<T: PyramidValue>(
    plane: ArrayView2<'_, T>,
    alpha: ArrayView2<'_, u8>,
    levels: usize,
    wraparound: bool,
) -> Result<(Vec<Array2<T>>, Vec<Array2<u8>>)> {
    let mut base = plane.to_owned();
    base.zip_mut_with(&alpha, |v, &a| {
        if a == 0 {
            *v = T::zero();
        }
    });

    let mut images = vec![base];
    let mut alphas = vec![alpha.to_owned()];
    for k in 1..levels {
        let (image, mask) = reduce_masked(wraparound, images[k - 1].view(), alphas[k - 1].view())?;
        images.push(image);
        alphas.push(mask);
    }
    Ok((images, alphas))
}

/// Replace each level but the coarsest with `G[k] - expand(G[k+1])`.
fn laplacian_in_place<T: PyramidValue>(levels: &mut [Array2<T>], wraparound: bool) -> Result<()> {
    for k in 0..levels.len().saturating_sub(1) {
        let (fine, coarse) = levels.split_at_mut(k + 1);
        expand(false, wraparound, coarse[0].view(), fine[k].view_mut())?;
    }
    Ok(())
}

fn stack_levels<T: PyramidValue>(per_channel: &[Vec<Array2<T>>], level: usize) -> Result<Array3<T>> {
    let views: Vec<ArrayView2<'_, T>> = per_channel.iter().map(|c| c[level].view()).collect();
    stack(Axis(0), &views).map_err(|e| StitchError::Configuration(e.to_string()))
}

/// Alpha-aware Gaussian pyramid of `image` (channels, height, width).
///
/// Every level carries its validity mask in `weight` (1.0 valid, 0.0 not).
pub fn build_gaussian<T: PyramidValue>(
    image: &Array3<T>,
    alpha: ArrayView2<'_, u8>,
    levels: usize,
    wraparound: bool,
) -> Result<Pyramid<T>> {
    let (_, height, width) = image.dim();
    let levels = clamp_levels(levels, width, height)?;

    let planes: Vec<(Vec<Array2<T>>, Vec<Array2<u8>>)> = image
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|plane| gaussian_plane(plane, alpha, levels, wraparound))
        .collect::<Result<_>>()?;

    // Every channel sees the same alpha, so the first channel's masks serve all.
    let mut per_channel = Vec::with_capacity(planes.len());
    let mut alphas = Vec::new();
    for (images, masks) in planes {
        if alphas.is_empty() {
            alphas = masks;
        }
        per_channel.push(images);
    }
    if per_channel.is_empty() {
        return Err(StitchError::InvalidDimensions { width, height });
    }

    let mut out = Vec::with_capacity(levels);
    for (k, mask) in alphas.iter().enumerate() {
        out.push(PyramidLevel {
            image: stack_levels(&per_channel, k)?,
            weight: mask.mapv(|a| if a > 0 { 1.0 } else { 0.0 }),
        });
    }
    Ok(Pyramid {
        levels: out,
        wraparound,
    })
}

/// Gaussian pyramid of blend weights (no alpha; values are smoothed).
pub fn build_weights(weights: Array2<f32>, levels: usize, wraparound: bool) -> Result<Vec<Array2<f32>>> {
    let mut out = Vec::with_capacity(levels);
    out.push(weights);
    for k in 1..levels {
        let next = reduce(wraparound, out[k - 1].view())?;
        out.push(next);
    }
    Ok(out)
}

/// Laplacian pyramid of `image` (channels, height, width) with the Gaussian
/// pyramid of `alpha / 255` as per-level weights.
///
/// The coarsest level keeps its Gaussian values. `levels` is clamped to what
/// the image size supports.
pub fn build_laplacian<T: PyramidValue>(
    image: &Array3<T>,
    alpha: ArrayView2<'_, u8>,
    levels: usize,
    wraparound: bool,
) -> Result<Pyramid<T>> {
    let (_, height, width) = image.dim();
    if alpha.dim() != (height, width) {
        return Err(StitchError::InvalidDimensions {
            width: alpha.ncols(),
            height: alpha.nrows(),
        });
    }
    let levels = clamp_levels(levels, width, height)?;

    let per_channel: Vec<Vec<Array2<T>>> = image
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|plane| {
            let (mut images, _) = gaussian_plane(plane, alpha, levels, wraparound)?;
            laplacian_in_place(&mut images, wraparound)?;
            Ok(images)
        })
        .collect::<Result<_>>()?;
    if per_channel.is_empty() {
        return Err(StitchError::InvalidDimensions { width, height });
    }

    let weights = build_weights(alpha.mapv(|a| a as f32 / 255.0), levels, wraparound)?;
    let mut out = Vec::with_capacity(levels);
    for (k, weight) in weights.into_iter().enumerate() {
        out.push(PyramidLevel {
            image: stack_levels(&per_channel, k)?,
            weight,
        });
    }
    Ok(Pyramid {
        levels: out,
        wraparound,
    })
}

/// Sum a Laplacian pyramid back into a full-resolution image.
pub fn collapse<T: PyramidValue>(pyramid: Pyramid<T>) -> Result<Array3<T>> {
    let wraparound = pyramid.wraparound;
    let mut levels = pyramid.levels;
    for k in (0..levels.len().saturating_sub(1)).rev() {
        let (fine, coarse) = levels.split_at_mut(k + 1);
        let target = &mut fine[k].image;
        let source = &coarse[0].image;
        for (src, dst) in source.axis_iter(Axis(0)).zip(target.axis_iter_mut(Axis(0))) {
            expand(true, wraparound, src, dst)?;
        }
    }
    levels
        .into_iter()
        .next()
        .map(|level| level.image)
        .ok_or(StitchError::EmptySequence)
}
