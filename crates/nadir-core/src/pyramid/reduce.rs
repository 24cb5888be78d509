use ndarray::{Array2, ArrayView2};

use crate::consts::{ALPHA_OPAQUE, KERNEL_SUM};
use crate::error::{Result, StitchError};

use super::skipsm::{reduce_pass, EdgePolicy, Plain, Weighted};
use super::value::PyramidValue;

/// Destination size of one reduce step: `ceil(w/2) x ceil(h/2)`.
pub fn reduced_dim(width: usize, height: usize) -> (usize, usize) {
    (width.div_ceil(2), height.div_ceil(2))
}

fn horizontal_policy(wraparound: bool, width: usize, fallback: EdgePolicy) -> EdgePolicy {
    if wraparound && width >= 2 {
        EdgePolicy::Wrap
    } else {
        fallback
    }
}

fn check_source(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(StitchError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Alpha-aware Gaussian reduce (normalized convolution).
///
/// Source pixels with zero alpha contribute neither value nor weight. Each
/// output pixel is the kernel-weighted mean of its valid taps; when it has no
/// valid taps it is zero with alpha 0, otherwise alpha is fully opaque. Taps
/// beyond the border are invalid, except across the left/right edge when
/// `wraparound` is set.
pub fn reduce_masked<T: PyramidValue>(
    wraparound: bool,
    image: ArrayView2<'_, T>,
    alpha: ArrayView2<'_, u8>,
) -> Result<(Array2<T>, Array2<u8>)> {
    let (height, width) = image.dim();
    check_source(width, height)?;
    if alpha.dim() != image.dim() {
        return Err(StitchError::InvalidDimensions {
            width: alpha.ncols(),
            height: alpha.nrows(),
        });
    }

    let (dst_w, dst_h) = reduced_dim(width, height);
    let mut dst = Array2::<T>::zeros((dst_h, dst_w));
    let mut dst_alpha = Array2::<u8>::zeros((dst_h, dst_w));

    reduce_pass(
        width,
        height,
        horizontal_policy(wraparound, width, EdgePolicy::Invalid),
        EdgePolicy::Invalid,
        |row, col| Weighted::sample(image[[row, col]], alpha[[row, col]] > 0),
        |row, col, sum: Weighted<T>| {
            if sum.weight > 0 {
                dst[[row, col]] = sum.value / T::constant(sum.weight);
                dst_alpha[[row, col]] = ALPHA_OPAQUE;
            }
        },
    );

    Ok((dst, dst_alpha))
}

/// Gaussian reduce without alpha.
///
/// Used for weight pyramids, where the values themselves are smoothed. Edge
/// samples are replicated beyond the border; `wraparound` makes the x axis
/// circular instead.
pub fn reduce<T: PyramidValue>(wraparound: bool, src: ArrayView2<'_, T>) -> Result<Array2<T>> {
    let (height, width) = src.dim();
    check_source(width, height)?;

    let (dst_w, dst_h) = reduced_dim(width, height);
    let mut dst = Array2::<T>::zeros((dst_h, dst_w));
    let kernel_sum = T::constant(KERNEL_SUM);

    reduce_pass(
        width,
        height,
        horizontal_policy(wraparound, width, EdgePolicy::Replicate),
        EdgePolicy::Replicate,
        |row, col| Plain(src[[row, col]]),
        |row, col, sum: Plain<T>| dst[[row, col]] = sum.0 / kernel_sum,
    );

    Ok(dst)
}

/// Apply [`reduce_masked`] `n` times. `n == 0` returns copies of the inputs.
pub fn reduce_n_times<T: PyramidValue>(
    wraparound: bool,
    image: ArrayView2<'_, T>,
    alpha: ArrayView2<'_, u8>,
    n: usize,
) -> Result<(Array2<T>, Array2<u8>)> {
    let mut current = (image.to_owned(), alpha.to_owned());
    for _ in 0..n {
        current = reduce_masked(wraparound, current.0.view(), current.1.view())?;
    }
    Ok(current)
}
