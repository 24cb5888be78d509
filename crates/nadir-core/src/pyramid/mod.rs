//! Burt–Adelson pyramids computed with streaming SKIPSM kernels.

pub mod builder;
pub mod expand;
pub mod reduce;
pub(crate) mod skipsm;
pub mod value;

use ndarray::Array3;

use crate::raster::{PixelDepth, Raster};

pub use builder::{
    build_gaussian, build_laplacian, build_weights, collapse, filter_half_width, max_levels,
    Pyramid, PyramidLevel,
};
pub use expand::expand;
pub use reduce::{reduce, reduce_masked, reduce_n_times, reduced_dim};
pub use value::PyramidValue;

/// Convert a raster (height, width, channels) into pyramid planes
/// (channels, height, width).
pub fn to_planes<T: PyramidValue>(raster: &Raster) -> Array3<T> {
    let depth = raster.depth;
    let mut planes = raster.data.mapv(|v| T::from_sample(v, depth));
    planes.swap_axes(0, 2);
    planes.swap_axes(1, 2);
    planes.as_standard_layout().into_owned()
}

/// Convert pyramid planes back into a raster of the given depth.
pub fn from_planes<T: PyramidValue>(planes: &Array3<T>, depth: PixelDepth) -> Raster {
    let mut data = planes.mapv(|v| v.to_sample(depth));
    data.swap_axes(0, 1);
    data.swap_axes(1, 2);
    Raster::new(data.as_standard_layout().into_owned(), depth)
}
