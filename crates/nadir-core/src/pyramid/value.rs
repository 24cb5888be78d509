use std::fmt::Debug;

use num_traits::Num;

use crate::consts::PYRAMID_FRACTION_BITS;
use crate::raster::PixelDepth;

/// Numeric type a pyramid is computed in.
///
/// Integer implementations are fixed point with [`PYRAMID_FRACTION_BITS`]
/// fractional bits over the integer sample code, so an 8-bit sample of 255
/// becomes `255 << 8`. The accumulator width is chosen per depth such that
/// `KERNEL_SUM * max_sample` always fits.
pub trait PyramidValue: Num + Copy + Debug + PartialOrd + Send + Sync + 'static {
    /// A small non-negative constant such as a kernel weight or divisor.
    fn constant(k: u32) -> Self;

    /// Convert a raster sample of the given depth.
    fn from_sample(sample: f32, depth: PixelDepth) -> Self;

    /// Convert back to a raster sample, clamped and rounded to the depth's codes.
    fn to_sample(self, depth: PixelDepth) -> f32;

    fn to_f64(self) -> f64;

    /// Convert from f64, rounding to nearest for integer types.
    fn from_f64(value: f64) -> Self;
}

const FIXED_ONE: f64 = (1u64 << PYRAMID_FRACTION_BITS) as f64;

macro_rules! fixed_point_value {
    ($t:ty) => {
        impl PyramidValue for $t {
            fn constant(k: u32) -> Self {
                k as $t
            }

            fn from_sample(sample: f32, depth: PixelDepth) -> Self {
                let code = (sample.clamp(0.0, 1.0) as f64 * depth.max_value() as f64).round();
                (code * FIXED_ONE) as $t
            }

            fn to_sample(self, depth: PixelDepth) -> f32 {
                let max = depth.max_value() as f64;
                let code = (self as f64 / FIXED_ONE).round().clamp(0.0, max);
                (code / max) as f32
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                value.round() as $t
            }
        }
    };
}

macro_rules! float_value {
    ($t:ty) => {
        impl PyramidValue for $t {
            fn constant(k: u32) -> Self {
                k as $t
            }

            fn from_sample(sample: f32, _depth: PixelDepth) -> Self {
                sample as $t
            }

            fn to_sample(self, depth: PixelDepth) -> f32 {
                if depth.is_integer() {
                    (self as f32).clamp(0.0, 1.0)
                } else {
                    self as f32
                }
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                value as $t
            }
        }
    };
}

fixed_point_value!(i32);
fixed_point_value!(i64);
float_value!(f32);
float_value!(f64);
