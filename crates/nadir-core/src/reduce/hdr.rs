use crate::consts::EPSILON;

use super::{Contribution, PixelReducer};

/// Merges bracketed exposures into one radiance value.
///
/// Each sample's exposure level `e` is its largest channel value, normalized to
/// the depth maximum, and is weighted with the hat function `0.5 - |e - 0.5|`.
/// Mid-tones are trusted and samples near under- or overexposure are not. The
/// alpha only decides whether a sample takes part. When every sample is
/// saturated the brightest one is returned.
#[derive(Clone, Debug, Default)]
pub struct HdrMergeReducer;

impl HdrMergeReducer {
    /// Hat weight of a normalized exposure level.
    pub fn weight(level: f32) -> f32 {
        let e = level.clamp(0.0, 1.0);
        0.5 - (e - 0.5).abs()
    }

    fn level(sample: &Contribution<'_>) -> f32 {
        sample.value.iter().copied().fold(0.0, f32::max)
    }
}

impl PixelReducer for HdrMergeReducer {
    fn name(&self) -> &'static str {
        "hdr"
    }

    fn reduce(&self, contributions: &[Contribution<'_>], out: &mut [f32]) {
        out.fill(0.0);
        let mut total = 0.0f32;
        let mut max_weight = 0.0f32;
        let mut brightest: Option<&Contribution<'_>> = None;
        let mut brightest_level = f32::NEG_INFINITY;

        for sample in contributions {
            let level = Self::level(sample);
            let w = Self::weight(level);
            for (o, &v) in out.iter_mut().zip(sample.value.iter()) {
                *o += w * v;
            }
            total += w;
            max_weight = max_weight.max(w);
            if level > brightest_level {
                brightest_level = level;
                brightest = Some(sample);
            }
        }

        if max_weight < EPSILON {
            if let Some(sample) = brightest {
                for (o, &v) in out.iter_mut().zip(sample.value.iter()) {
                    *o = v;
                }
            }
            return;
        }
        for o in out.iter_mut() {
            *o /= total;
        }
    }
}
