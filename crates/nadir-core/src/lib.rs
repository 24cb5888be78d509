pub mod blend;
pub mod consts;
pub mod error;
pub mod geometry;
pub mod io;
pub mod pyramid;
pub mod raster;
pub mod reduce;
pub mod remap;
pub mod stitch;
