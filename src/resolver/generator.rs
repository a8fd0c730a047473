use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::cache::Store;
use crate::error::ResizeError;
use crate::images::{FitDimensions, ImageEngine};
use crate::models::{ResizeRequest, SourceImage};

/// Produces derivatives through the image engine and persists them.
pub struct DerivativeGenerator {
    engine: Arc<dyn ImageEngine>,
    store: Arc<dyn Store>,
}

impl DerivativeGenerator {
    pub fn new(engine: Arc<dyn ImageEngine>, store: Arc<dyn Store>) -> Self {
        Self { engine, store }
    }

    /// Derived dimensions for `request`, or `None` when resizing is unnecessary.
    pub fn plan(&self, source: &SourceImage, request: &ResizeRequest) -> Option<FitDimensions> {
        self.engine
            .fit_dimensions(source.width, source.height, request.width, request.height, request.crop)
    }

    pub fn generate(&self, source: &SourceImage, fit: &FitDimensions, dest: &Path) -> Result<(), ResizeError> {
        let bytes = self.engine.resize(&source.path, fit)?;

        self.store.write(dest, &bytes).map_err(|e| {
            ResizeError::Generation(format!("Failed to persist {}: {}", dest.display(), e))
        })?;

        info!(
            "Generated {}x{} derivative of {} ({} bytes)",
            fit.width,
            fit.height,
            source.relative,
            bytes.len()
        );
        Ok(())
    }
}
