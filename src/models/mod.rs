use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A source image resolved under the upload directory.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub path: PathBuf,
    /// Path relative to the upload directory, `/`-separated.
    pub relative: String,
    pub width: u32,
    pub height: u32,
    pub extension: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    #[default]
    Url,
    Record,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResizeRequest {
    pub width: u32,
    pub height: Option<u32>,
    #[serde(default = "default_crop")]
    pub crop: bool,
    #[serde(default)]
    pub shape: OutputShape,
}

fn default_crop() -> bool {
    true
}

impl ResizeRequest {
    pub fn new(width: u32, height: Option<u32>) -> Self {
        Self {
            width,
            height,
            crop: default_crop(),
            shape: OutputShape::default(),
        }
    }

    pub fn with_crop(mut self, crop: bool) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_shape(mut self, shape: OutputShape) -> Self {
        self.shape = shape;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A valid derivative was already stored.
    CacheHit,
    /// The derivative was produced by this request.
    Generated,
    /// Resizing was unnecessary; the source itself is returned.
    Original,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Resolved {
    pub url: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resized(Resolved),
    /// Resizing is disabled or the URL is not local; the URL is returned untouched.
    Passthrough(String),
}

/// What callers of `Resolver::resize_image` receive.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResizeOutput {
    Url(String),
    Record { url: String, width: u32, height: u32 },
}

impl ResizeOutput {
    pub fn url(&self) -> &str {
        match self {
            ResizeOutput::Url(url) => url,
            ResizeOutput::Record { url, .. } => url,
        }
    }
}
