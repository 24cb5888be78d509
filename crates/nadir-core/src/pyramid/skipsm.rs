//! Streaming state machine shared by the reduce variants.
//!
//! SKIPSM evaluates the separable [1, 4, 6, 4, 1] kernel at every other source
//! pixel in one top-to-bottom, left-to-right pass. Three horizontal registers
//! (`sr0`, `sr1`, `srp`) carry partial row sums, and three per-column arrays
//! (`sc0`, `sc1`, `scp`) carry partial column sums, so memory stays O(width)
//! and each interior source pixel is read once.

use super::value::PyramidValue;

/// Quantity carried through the SKIPSM registers.
pub(crate) trait Lane: Copy + Send + Sync {
    fn zero() -> Self;
    fn plus(self, other: Self) -> Self;
    fn times(self, k: u32) -> Self;
    /// Exact inverse of `times(4)`.
    fn quarter(self) -> Self;
}

/// Bare value lane used when there is no alpha.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Plain<T>(pub T);

impl<T: PyramidValue> Lane for Plain<T> {
    fn zero() -> Self {
        Self(T::zero())
    }

    fn plus(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    fn times(self, k: u32) -> Self {
        Self(self.0 * T::constant(k))
    }

    fn quarter(self) -> Self {
        Self(self.0 / T::constant(4))
    }
}

/// Pixel sum paired with the kernel weight of the valid samples behind it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Weighted<T> {
    pub value: T,
    pub weight: u32,
}

impl<T: PyramidValue> Weighted<T> {
    pub fn sample(value: T, valid: bool) -> Self {
        if valid {
            Self { value, weight: 1 }
        } else {
            Self::zero()
        }
    }
}

impl<T: PyramidValue> Lane for Weighted<T> {
    fn zero() -> Self {
        Self {
            value: T::zero(),
            weight: 0,
        }
    }

    fn plus(self, other: Self) -> Self {
        Self {
            value: self.value + other.value,
            weight: self.weight + other.weight,
        }
    }

    fn times(self, k: u32) -> Self {
        Self {
            value: self.value * T::constant(k),
            weight: self.weight * k,
        }
    }

    fn quarter(self) -> Self {
        Self {
            value: self.value / T::constant(4),
            weight: self.weight / 4,
        }
    }
}

/// What lies beyond the edge of the source along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EdgePolicy {
    /// Nothing: out-of-range taps contribute zero value and zero weight.
    Invalid,
    /// The edge sample repeats.
    Replicate,
    /// The opposite edge continues the row (x axis only).
    Wrap,
}

impl EdgePolicy {
    /// Horizontal registers `(sr0, sr1, srp)` before the first pixel of a row.
    fn row_start<L: Lane>(self, px: &impl Fn(usize) -> L, width: usize) -> (L, L, L) {
        match self {
            Self::Invalid => (L::zero(), L::zero(), L::zero()),
            Self::Replicate => {
                let first = px(0);
                (first, L::zero(), first.times(4))
            }
            Self::Wrap => (px(width - 2), L::zero(), px(width - 1).times(4)),
        }
    }

    /// Taps past the right edge for the last output column. `last_even` is
    /// true when the final source column has an even index.
    fn row_tail<L: Lane>(self, sr0: L, srp: L, px: &impl Fn(usize) -> L, last_even: bool) -> L {
        match (self, last_even) {
            (Self::Invalid, _) => L::zero(),
            (Self::Replicate, true) => sr0.times(5),
            (Self::Replicate, false) => srp.quarter(),
            (Self::Wrap, true) => px(0).times(4).plus(px(1)),
            (Self::Wrap, false) => px(0),
        }
    }

    /// `sc1` seed for the first source row.
    fn first_row_seed<L: Lane>(self, hsum: L) -> L {
        match self {
            Self::Replicate => hsum.times(5),
            Self::Invalid | Self::Wrap => L::zero(),
        }
    }

    /// Output for the last destination row once all source rows are consumed.
    fn last_row<L: Lane>(self, sc0: L, sc1: L, scp: L, last_even: bool) -> L {
        let base = sc1.plus(sc0.times(6));
        match (self, last_even) {
            (Self::Replicate, true) => base.plus(sc0.times(5)),
            (Self::Replicate, false) => base.plus(scp).plus(scp.quarter()),
            (_, true) => base,
            (_, false) => base.plus(scp),
        }
    }
}

/// Horizontal 5-tap sums at every even source column of one row.
///
/// `emit(dst_col, sum)` is called in increasing column order.
fn horizontal_pass<L: Lane>(
    width: usize,
    policy: EdgePolicy,
    px: impl Fn(usize) -> L,
    mut emit: impl FnMut(usize, L),
) {
    let dst_w = width.div_ceil(2);
    let (mut sr0, mut sr1, mut srp) = policy.row_start(&px, width);

    for x in 0..width {
        let current = px(x);
        if x % 2 == 0 {
            if x >= 2 {
                emit(x / 2 - 1, sr1.plus(sr0.times(6)).plus(srp).plus(current));
            }
            sr1 = sr0.plus(srp);
            sr0 = current;
        } else {
            srp = current.times(4);
        }
    }

    let last_even = (width - 1) % 2 == 0;
    let mut sum = sr1.plus(sr0.times(6));
    if !last_even {
        sum = sum.plus(srp);
    }
    emit(dst_w - 1, sum.plus(policy.row_tail(sr0, srp, &px, last_even)));
}

/// Run the reduce state machine over a `width x height` source.
///
/// `sample(row, col)` supplies source lanes. `emit(row, col, sum)` receives the
/// unnormalized 2-D kernel sum of every destination pixel, row by row.
pub(crate) fn reduce_pass<L: Lane>(
    width: usize,
    height: usize,
    horizontal: EdgePolicy,
    vertical: EdgePolicy,
    sample: impl Fn(usize, usize) -> L,
    mut emit: impl FnMut(usize, usize, L),
) {
    let dst_w = width.div_ceil(2);
    let dst_h = height.div_ceil(2);
    let mut sc0 = vec![L::zero(); dst_w];
    let mut sc1 = vec![L::zero(); dst_w];
    let mut scp = vec![L::zero(); dst_w];

    for y in 0..height {
        let px = |x: usize| sample(y, x);
        if y == 0 {
            horizontal_pass(width, horizontal, px, |d, hsum| {
                sc1[d] = vertical.first_row_seed(hsum);
                sc0[d] = hsum;
            });
        } else if y % 2 == 1 {
            horizontal_pass(width, horizontal, px, |d, hsum| {
                scp[d] = hsum.times(4);
            });
        } else {
            horizontal_pass(width, horizontal, px, |d, hsum| {
                let out = sc1[d].plus(sc0[d].times(6)).plus(scp[d]).plus(hsum);
                sc1[d] = sc0[d].plus(scp[d]);
                sc0[d] = hsum;
                emit(y / 2 - 1, d, out);
            });
        }
    }

    let last_even = (height - 1) % 2 == 0;
    for d in 0..dst_w {
        emit(dst_h - 1, d, vertical.last_row(sc0[d], sc1[d], scp[d], last_even));
    }
}
