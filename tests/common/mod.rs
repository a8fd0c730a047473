#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgb, RgbImage};
use image_resizer::cache::{FsStore, Store};
use image_resizer::images::{EngineError, FitDimensions, ImageCrateEngine, ImageEngine, ImageMetadata};
use image_resizer::{Resolver, ResizerConfig};
use tempfile::TempDir;

pub const UPLOAD_URL: &str = "http://example.com/wp-content/uploads";
pub const SITE_URL: &str = "http://example.com";

/// Wraps the real engine and counts resize calls.
pub struct CountingEngine {
    pub inner: ImageCrateEngine,
    pub resizes: AtomicUsize,
    pub fail_resize: bool,
    pub delay: Duration,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self {
            inner: ImageCrateEngine::default(),
            resizes: AtomicUsize::new(0),
            fail_resize: false,
            delay: Duration::ZERO,
        }
    }

    pub fn resize_count(&self) -> usize {
        self.resizes.load(Ordering::SeqCst)
    }
}

impl ImageEngine for CountingEngine {
    fn read_metadata(&self, path: &Path) -> Result<ImageMetadata, EngineError> {
        self.inner.read_metadata(path)
    }

    fn validate(&self, path: &Path) -> Result<ImageMetadata, EngineError> {
        self.inner.validate(path)
    }

    fn resize(&self, path: &Path, fit: &FitDimensions) -> Result<Vec<u8>, EngineError> {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if self.fail_resize {
            return Err(EngineError::Encode("encoder exploded".to_string()));
        }
        self.inner.resize(path, fit)
    }
}

/// Wraps the filesystem store and counts every access.
#[derive(Default)]
pub struct CountingStore {
    pub inner: FsStore,
    pub calls: AtomicUsize,
    pub fail_writes: bool,
}

impl CountingStore {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Store for CountingStore {
    fn exists(&self, path: &Path) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only store"));
        }
        self.inner.write(path, bytes)
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub engine: Arc<CountingEngine>,
    pub store: Arc<CountingStore>,
    pub resolver: Resolver,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(CountingEngine::new(), CountingStore::default(), |_| {})
    }

    pub fn build(engine: CountingEngine, store: CountingStore, tweak: impl FnOnce(&mut ResizerConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        write_image(&dir.path().join("photos/dog.jpg"), 800, 600);

        let mut config = ResizerConfig::new(dir.path(), UPLOAD_URL, SITE_URL);
        tweak(&mut config);

        let engine = Arc::new(engine);
        let store = Arc::new(store);
        let resolver = Resolver::with_backends(config, engine.clone(), store.clone());
        Self {
            dir,
            engine,
            store,
            resolver,
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{}/{}", UPLOAD_URL, relative)
    }
}

pub fn write_image(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64]))
        .save(path)
        .unwrap();
}
