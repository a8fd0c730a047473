pub mod generator;

use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use crate::cache::{scoped_relative_path, CacheKey, CacheProber, FlightMap, FsStore, Probe, Store};
use crate::config::ResizerConfig;
use crate::error::ResizeError;
use crate::images::{FitDimensions, ImageCrateEngine, ImageEngine, SourceResolver};
use crate::models::{OutputShape, Outcome, Resolution, Resolved, ResizeOutput, ResizeRequest, SourceImage};

pub use generator::DerivativeGenerator;

/// Resolves (source, request) pairs to derivative references, generating and
/// storing derivatives on a cache miss.
pub struct Resolver {
    config: ResizerConfig,
    source: SourceResolver,
    engine: Arc<dyn ImageEngine>,
    prober: CacheProber,
    generator: DerivativeGenerator,
    flights: FlightMap,
}

impl Resolver {
    pub fn new(config: ResizerConfig) -> Self {
        let engine = Arc::new(ImageCrateEngine::new(config.jpeg_quality));
        Self::with_backends(config, engine, Arc::new(FsStore::new()))
    }

    pub fn with_backends(config: ResizerConfig, engine: Arc<dyn ImageEngine>, store: Arc<dyn Store>) -> Self {
        Self {
            source: SourceResolver::new(&config),
            prober: CacheProber::new(Arc::clone(&store), Arc::clone(&engine)),
            generator: DerivativeGenerator::new(Arc::clone(&engine), store),
            engine,
            flights: FlightMap::new(),
            config,
        }
    }

    /// Resize the image at `url`. `None` means the image is unavailable and
    /// the caller should fall back to the original asset.
    pub fn resize_image(&self, url: &str, request: &ResizeRequest) -> Option<ResizeOutput> {
        match self.resolve_url(url, request) {
            Ok(Resolution::Passthrough(url)) => Some(ResizeOutput::Url(url)),
            Ok(Resolution::Resized(resolved)) => Some(match request.shape {
                OutputShape::Url => ResizeOutput::Url(resolved.url),
                OutputShape::Record => ResizeOutput::Record {
                    url: resolved.url,
                    width: resolved.width,
                    height: resolved.height,
                },
            }),
            Err(e) => {
                warn!("Could not resize {}: {}", url, e);
                None
            }
        }
    }

    pub fn resolve_url(&self, url: &str, request: &ResizeRequest) -> Result<Resolution, ResizeError> {
        // Resizing switched off entirely
        if self.config.disabled {
            return Ok(Resolution::Passthrough(url.to_string()));
        }

        // Images hosted elsewhere are never touched
        if !self.source.is_local(url) {
            debug!("Not resizing non-local image {}", url);
            return Ok(Resolution::Passthrough(url.to_string()));
        }

        if url.is_empty() {
            return Err(ResizeError::InvalidRequest("empty url".to_string()));
        }
        Self::validate_request(request)?;

        let url = self.source.normalize_url(url);
        let relative = self.source.url_to_relative(&url)?;
        let mut resolved = self.resolve_path(Path::new(&relative), request)?;

        // Nothing to resize: hand back the caller's URL as given
        if resolved.outcome == Outcome::Original {
            resolved.url = url;
        }

        Ok(Resolution::Resized(resolved))
    }

    /// Resolve a source given as a path, absolute or relative to the upload
    /// directory.
    pub fn resolve_path(&self, source_path: &Path, request: &ResizeRequest) -> Result<Resolved, ResizeError> {
        Self::validate_request(request)?;

        // Scope check, existence and header read of the source
        let source = self.load_source(source_path)?;

        // Derived size decides the key, so it comes before the cache lookup
        let fit = match self.generator.plan(&source, request) {
            Some(fit) => fit,
            None => {
                debug!(
                    "No resize needed for {} at {}x{:?}",
                    source.relative, request.width, request.height
                );
                return Ok(Resolved {
                    url: self.source.relative_to_url(&source.relative),
                    width: source.width,
                    height: source.height,
                    path: source.path,
                    outcome: Outcome::Original,
                });
            }
        };

        let key = CacheKey::from_relative(&source.relative, fit.width, fit.height)?;
        let key_path = key.path_in(self.source.upload_dir());

        // Reuse a stored derivative or produce one
        let outcome = match self.prober.probe(&key_path) {
            Probe::Hit(_) => {
                debug!("Cache hit for {}", key);
                Outcome::CacheHit
            }
            Probe::Miss => {
                debug!("Cache miss for {}", key);
                self.generate(&key, &key_path, &source, &fit)?
            }
        };

        Ok(Resolved {
            url: self.source.relative_to_url(&key.relative_path()),
            path: key_path,
            width: fit.width,
            height: fit.height,
            outcome,
        })
    }

    fn validate_request(request: &ResizeRequest) -> Result<(), ResizeError> {
        if request.width == 0 {
            return Err(ResizeError::InvalidRequest("width must be greater than zero".to_string()));
        }
        Ok(())
    }

    fn load_source(&self, source_path: &Path) -> Result<SourceImage, ResizeError> {
        let relative = scoped_relative_path(self.source.upload_dir(), source_path)?;
        let path = self.source.relative_to_path(&relative);

        // Missing sources are invalid, not out of scope
        if !self.source.exists(&relative) {
            return Err(ResizeError::InvalidSource(format!("{} does not exist", path.display())));
        }

        let meta = self
            .engine
            .read_metadata(&path)
            .map_err(|e| ResizeError::InvalidSource(format!("{}: {}", path.display(), e)))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string)
            .ok_or_else(|| ResizeError::InvalidSource(format!("{} has no file extension", path.display())))?;

        Ok(SourceImage {
            path,
            relative,
            width: meta.width,
            height: meta.height,
            extension,
        })
    }

    fn generate(
        &self,
        key: &CacheKey,
        key_path: &Path,
        source: &SourceImage,
        fit: &FitDimensions,
    ) -> Result<Outcome, ResizeError> {
        // Without single-flight concurrent misses may both generate; the atomic write keeps that safe
        if !self.config.single_flight {
            return self
                .generator
                .generate(source, fit, key_path)
                .map(|_| Outcome::Generated);
        }

        let (result, led) = self.flights.run(key, || {
            // Another leader may have finished between our probe and joining
            if let Probe::Hit(_) = self.prober.probe(key_path) {
                return Ok(Outcome::CacheHit);
            }
            self.generator
                .generate(source, fit, key_path)
                .map(|_| Outcome::Generated)
        });

        // Waiters reused the leader's derivative
        match result {
            Ok(_) if !led => Ok(Outcome::CacheHit),
            other => other,
        }
    }
}
