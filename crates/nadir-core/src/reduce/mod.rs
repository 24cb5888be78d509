//! Per-pixel reduce functors for the reduce stitcher.

pub mod difference;
pub mod hdr;

use ndarray::ArrayView1;

pub use difference::DifferenceReducer;
pub use hdr::HdrMergeReducer;

/// One image's sample at the pixel being reduced.
#[derive(Clone, Debug)]
pub struct Contribution<'a> {
    pub value: ArrayView1<'a, f32>,
    /// Non-zero alpha (or exposure weight) of the sample.
    pub alpha: u8,
}

/// Combines every image's value at one canvas pixel into a single value.
///
/// `contributions` holds only valid samples and is never empty; `out` has one
/// slot per channel.
pub trait PixelReducer: Send + Sync {
    fn name(&self) -> &'static str;

    fn reduce(&self, contributions: &[Contribution<'_>], out: &mut [f32]);
}
