use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Persistent byte store for derivatives.
pub trait Store: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Write `bytes` at `path`. Readers never observe a partially written file.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Filesystem store writing through a temp file and rename.
#[derive(Debug, Clone, Default)]
pub struct FsStore;

impl FsStore {
    pub fn new() -> Self {
        Self
    }

    // Hidden sibling of `path`, unique per write
    fn temp_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.{:016x}.tmp", name, rand::random::<u64>()))
    }

    fn write_temp(temp_path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }
}

impl Store for FsStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        // Derivatives may land in a year/month folder that does not exist yet
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target, then swap it in with a rename
        let temp_path = Self::temp_path(path);
        let result = Self::write_temp(&temp_path, bytes).and_then(|_| fs::rename(&temp_path, path));

        // Never leave a stray temp file behind
        if result.is_err() {
            if let Err(e) = fs::remove_file(&temp_path) {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("Failed to remove temp file {}: {}", temp_path.display(), e);
                }
            }
        }

        result
    }
}
