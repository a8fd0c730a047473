//! On-the-fly image resizing with a persistent derivative cache.
//!
//! A derivative of `uploads/photos/dog.jpg` at 400x300 is stored next to its
//! source as `uploads/photos/dog-400x300.jpg` and reused by every later request
//! for the same size.

pub mod cache;
pub mod config;
pub mod error;
pub mod images;
pub mod models;
pub mod resolver;

pub use crate::cache::CacheKey;
pub use crate::config::ResizerConfig;
pub use crate::error::ResizeError;
pub use crate::models::{OutputShape, Outcome, Resolution, Resolved, ResizeOutput, ResizeRequest};
pub use crate::resolver::Resolver;
