//! Gaussian expand, the SKIPSM counterpart of reduce.
//!
//! Every source pixel visit produces four destination phases: `00` (even row,
//! even column), `10` (even row, odd column), `01` (odd row, even column) and
//! `11` (odd row, odd column). Border pixels feed fewer taps, so each phase is
//! normalized by the product of a column factor and a row factor chosen from
//! the pixel's position in the source.

use ndarray::{ArrayView2, ArrayViewMut2};

use crate::error::{Result, StitchError};

use super::value::PyramidValue;

/// Position of a source row or column relative to the borders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    /// First output pair of a source with more than one sample.
    First,
    Interior,
    /// Extra pair after the last sample of a source with more than one sample.
    Last,
    /// The single sample of a one-wide source.
    Only,
}

/// Kernel weight reaching the (even, odd) output columns.
///
/// Even columns take taps 1-6-1, odd columns 4-4. Missing taps at the borders
/// lower the sum unless the row wraps around.
pub(crate) fn column_factors(phase: Phase, wraparound: bool) -> (u32, u32) {
    match (phase, wraparound) {
        (Phase::Only, _) => (6, 4),
        (Phase::Interior, _) | (Phase::First | Phase::Last, true) => (8, 8),
        (Phase::First, false) => (7, 8),
        (Phase::Last, false) => (7, 4),
    }
}

/// Kernel weight reaching the (even, odd) output rows.
///
/// Even rows take taps 1-6-1, odd rows 1-1. Rows never wrap.
pub(crate) fn row_factors(phase: Phase) -> (u32, u32) {
    match phase {
        Phase::First => (7, 2),
        Phase::Interior => (8, 2),
        Phase::Last => (7, 1),
        Phase::Only => (6, 1),
    }
}

/// Divisors for the `00`, `10`, `01` and `11` output phases.
fn divisors(row: Phase, column: Phase, wraparound: bool) -> [u32; 4] {
    let (even_col, odd_col) = column_factors(column, wraparound);
    let (even_row, odd_row) = row_factors(row);
    [
        even_col * even_row,
        odd_col * even_row,
        even_col * odd_row,
        odd_col * odd_row,
    ]
}

fn column_phase(x: usize, width: usize) -> Phase {
    if width == 1 {
        Phase::Only
    } else if x == 1 {
        Phase::First
    } else if x == width {
        Phase::Last
    } else {
        Phase::Interior
    }
}

/// Per-column register file. Index `x` holds the horizontal sums centred on
/// source column `x - 1`: `a` for the even output column, `b` for the odd one.
struct ColumnState<T> {
    a0: Vec<T>,
    b0: Vec<T>,
    a1: Vec<T>,
    b1: Vec<T>,
}

impl<T: PyramidValue> ColumnState<T> {
    fn new(width: usize) -> Self {
        Self {
            a0: vec![T::zero(); width + 1],
            b0: vec![T::zero(); width + 1],
            a1: vec![T::zero(); width + 1],
            b1: vec![T::zero(); width + 1],
        }
    }
}

/// Horizontal sums of one source row for columns `1..=width`.
fn horizontal_sums<T: PyramidValue>(
    src: ArrayView2<'_, T>,
    y: usize,
    wraparound: bool,
    mut visit: impl FnMut(usize, T, T),
) {
    let width = src.ncols();
    let six = T::constant(6);
    let four = T::constant(4);
    let mut sr0 = src[[y, 0]];
    let mut sr1 = if wraparound { src[[y, width - 1]] } else { T::zero() };

    for x in 1..=width {
        let current = if x < width {
            src[[y, x]]
        } else if wraparound {
            src[[y, 0]]
        } else {
            T::zero()
        };
        visit(x, sr1 + six * sr0 + current, four * (sr0 + current));
        sr1 = sr0;
        sr0 = current;
    }
}

/// Expand `src` into `dst`, adding (`add == true`) or subtracting the result.
///
/// `dst` must have the exact size `src` was reduced from, i.e. each dimension
/// is `2n - 1` or `2n` for a source dimension `n`.
pub fn expand<T: PyramidValue>(
    add: bool,
    wraparound: bool,
    src: ArrayView2<'_, T>,
    mut dst: ArrayViewMut2<'_, T>,
) -> Result<()> {
    let (src_h, src_w) = src.dim();
    let (dst_h, dst_w) = dst.dim();
    if src_w == 0
        || src_h == 0
        || dst_w.div_ceil(2) != src_w
        || dst_h.div_ceil(2) != src_h
    {
        return Err(StitchError::InvalidDimensions {
            width: dst_w,
            height: dst_h,
        });
    }

    let wraparound = wraparound && src_w >= 2;
    let six = T::constant(6);
    let mut state = ColumnState::<T>::new(src_w);

    let mut write = |row: usize, col: usize, value: T, divisor: u32| {
        if row < dst_h && col < dst_w {
            let v = value / T::constant(divisor);
            let d = &mut dst[[row, col]];
            *d = if add { *d + v } else { *d - v };
        }
    };

    // Prime the registers with the first row; nothing is emitted yet.
    horizontal_sums(src, 0, wraparound, |x, a, b| {
        state.a0[x] = a;
        state.b0[x] = b;
    });

    for y in 1..src_h {
        let row_phase = if y == 1 { Phase::First } else { Phase::Interior };
        let (dy, dyy) = (2 * y - 2, 2 * y - 1);
        horizontal_sums(src, y, wraparound, |x, a, b| {
            let [d00, d10, d01, d11] = divisors(row_phase, column_phase(x, src_w), wraparound);
            let (dx, dxx) = (2 * x - 2, 2 * x - 1);
            let out00 = state.a1[x] + six * state.a0[x] + a;
            let out10 = state.b1[x] + six * state.b0[x] + b;
            let out01 = state.a0[x] + a;
            let out11 = state.b0[x] + b;
            state.a1[x] = state.a0[x];
            state.b1[x] = state.b0[x];
            state.a0[x] = a;
            state.b0[x] = b;
            write(dy, dx, out00, d00);
            write(dy, dxx, out10, d10);
            write(dyy, dx, out01, d01);
            write(dyy, dxx, out11, d11);
        });
    }

    // Extra row below the last source row.
    let row_phase = if src_h == 1 { Phase::Only } else { Phase::Last };
    let (dy, dyy) = (2 * src_h - 2, 2 * src_h - 1);
    for x in 1..=src_w {
        let [d00, d10, d01, d11] = divisors(row_phase, column_phase(x, src_w), wraparound);
        let (dx, dxx) = (2 * x - 2, 2 * x - 1);
        write(dy, dx, state.a1[x] + six * state.a0[x], d00);
        write(dy, dxx, state.b1[x] + six * state.b0[x], d10);
        write(dyy, dx, state.a0[x], d01);
        write(dyy, dxx, state.b0[x], d11);
    }

    Ok(())
}
