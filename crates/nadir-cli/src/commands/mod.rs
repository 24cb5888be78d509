pub mod config;
pub mod info;
pub mod order;
pub mod stitch;
