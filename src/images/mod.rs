pub mod source;
pub mod tools;

use std::path::Path;

use image::ImageFormat;
use thiserror::Error;

pub use source::SourceResolver;
pub use tools::{resize_dimensions, ImageCrateEngine};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Unsupported format: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Destination size of a derivative and the source rectangle it is cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitDimensions {
    pub width: u32,
    pub height: u32,
    pub src_x: u32,
    pub src_y: u32,
    pub src_width: u32,
    pub src_height: u32,
}

/// Decoding and resizing collaborator. Implementations must be thread-safe;
/// resolutions call into the engine from many threads at once.
pub trait ImageEngine: Send + Sync {
    /// Read dimensions and format, failing for anything that is not a readable image.
    fn read_metadata(&self, path: &Path) -> Result<ImageMetadata, EngineError>;

    /// Fully decode the file. Truncated or corrupt bodies fail here even when
    /// their header reads fine.
    fn validate(&self, path: &Path) -> Result<ImageMetadata, EngineError>;

    fn fit_dimensions(
        &self,
        orig_width: u32,
        orig_height: u32,
        width: u32,
        height: Option<u32>,
        crop: bool,
    ) -> Option<FitDimensions> {
        resize_dimensions(orig_width, orig_height, width, height, crop)
    }

    /// Produce encoded bytes of `path` cut and scaled to `fit`, in the source's format.
    fn resize(&self, path: &Path, fit: &FitDimensions) -> Result<Vec<u8>, EngineError>;
}
