use super::{Contribution, PixelReducer};

/// Sum of absolute deviations from the per-channel mean.
///
/// Zero where all images agree; large where they disagree, so the output maps
/// ghosting and misregistration. A lone sample passes through unchanged.
#[derive(Clone, Debug, Default)]
pub struct DifferenceReducer;

impl PixelReducer for DifferenceReducer {
    fn name(&self) -> &'static str {
        "difference"
    }

    fn reduce(&self, contributions: &[Contribution<'_>], out: &mut [f32]) {
        out.fill(0.0);
        if let [single] = contributions {
            for (o, &v) in out.iter_mut().zip(single.value.iter()) {
                *o = v;
            }
            return;
        }

        let n = contributions.len() as f32;
        for (c, o) in out.iter_mut().enumerate() {
            let mean = contributions.iter().map(|s| s.value[c]).sum::<f32>() / n;
            *o = contributions.iter().map(|s| (s.value[c] - mean).abs()).sum();
        }
    }
}
