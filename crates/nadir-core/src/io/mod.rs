pub mod image_io;
pub mod project;

pub use image_io::{load_layer, load_mask, load_raster, save_canvas, Decoded, FileWriter};
pub use project::{load_project, Project, ProjectLayer};
