use std::path::Path;
use std::sync::Arc;

use crate::cache::Store;
use crate::images::{ImageEngine, ImageMetadata};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Hit(ImageMetadata),
    Miss,
}

/// Decides whether a valid derivative is stored at a path.
///
/// A file that is present but does not read as an image is a miss, so the
/// caller regenerates over it.
pub struct CacheProber {
    store: Arc<dyn Store>,
    engine: Arc<dyn ImageEngine>,
}

impl CacheProber {
    pub fn new(store: Arc<dyn Store>, engine: Arc<dyn ImageEngine>) -> Self {
        Self { store, engine }
    }

    pub fn probe(&self, path: &Path) -> Probe {
        if !self.store.exists(path) {
            return Probe::Miss;
        }

        // Decode the whole entry; a readable header alone is not enough
        match self.engine.validate(path) {
            Ok(meta) => Probe::Hit(meta),
            Err(e) => {
                log::debug!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                Probe::Miss
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FsStore;
    use crate::images::ImageCrateEngine;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn prober() -> CacheProber {
        CacheProber::new(Arc::new(FsStore::new()), Arc::new(ImageCrateEngine::default()))
    }

    #[test]
    fn missing_file_is_miss() {
        let dir = TempDir::new().unwrap();
        assert_eq!(prober().probe(&dir.path().join("dog-10x10.jpg")), Probe::Miss);
    }

    #[test]
    fn zero_byte_and_garbage_files_are_misses() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty-10x10.png");
        let garbage = dir.path().join("garbage-10x10.png");
        std::fs::write(&empty, b"").unwrap();
        std::fs::write(&garbage, b"<html>403</html>").unwrap();

        assert_eq!(prober().probe(&empty), Probe::Miss);
        assert_eq!(prober().probe(&garbage), Probe::Miss);
    }

    #[test]
    fn truncated_image_is_miss() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dog-300x200.png");
        RgbImage::from_fn(300, 200, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8]))
            .save(&path)
            .unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 3]).unwrap();

        assert_eq!(prober().probe(&path), Probe::Miss);
    }

    #[test]
    fn valid_image_is_hit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dog-12x8.png");
        RgbImage::from_pixel(12, 8, Rgb([1, 2, 3])).save(&path).unwrap();

        match prober().probe(&path) {
            Probe::Hit(meta) => assert_eq!((meta.width, meta.height), (12, 8)),
            Probe::Miss => panic!("expected a hit"),
        }
    }
}
