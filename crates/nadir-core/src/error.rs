use thiserror::Error;

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Remapping image {image} failed: {reason}")]
    Remap { image: usize, reason: String },

    #[error("Invalid project file: {0}")]
    Project(String),

    #[error("Empty image set")]
    EmptySequence,
}

impl From<toml::de::Error> for StitchError {
    fn from(err: toml::de::Error) -> Self {
        Self::Project(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StitchError>;
