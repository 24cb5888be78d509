/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Width of the low-resolution masks used to estimate the blend order.
pub const BLEND_ORDER_MASK_WIDTH: usize = 400;

/// Sum of the separable [1, 4, 6, 4, 1] binomial kernel in 2-D.
pub const KERNEL_SUM: u32 = 256;

/// Fractional bits carried by fixed-point pyramid values.
pub const PYRAMID_FRACTION_BITS: u32 = 8;

/// Deepest pyramid that still has a representable filter half width.
pub const MAX_PYRAMID_LEVELS: usize = 29;

/// Pyramid depth used by the seam blender when none is configured.
pub const DEFAULT_SEAM_LEVELS: usize = 6;

/// Alpha value written for fully valid canvas pixels.
pub const ALPHA_OPAQUE: u8 = 255;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f32 = 1e-10;

/// Horizontal field of view at which the panorama wraps around.
pub const FULL_CIRCLE_DEGREES: f64 = 360.0;

/// Compression names accepted by the canvas writer.
pub const SUPPORTED_COMPRESSIONS: &[&str] = &["none", "fast", "default", "best"];
