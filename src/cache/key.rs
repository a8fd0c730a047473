use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::ResizeError;

/// Location of a derivative: the source's relative path without extension,
/// a `-{width}x{height}` suffix, then the source's extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    stem: String,
    extension: String,
}

impl CacheKey {
    /// Derive the key for `source` resized to `width`x`height`. No I/O.
    pub fn derive(base_dir: &Path, source: &Path, width: u32, height: u32) -> Result<Self, ResizeError> {
        let relative = scoped_relative_path(base_dir, source)?;
        Self::from_relative(&relative, width, height)
    }

    pub fn from_relative(relative: &str, width: u32, height: u32) -> Result<Self, ResizeError> {
        let (base, extension) = split_extension(relative)
            .ok_or_else(|| ResizeError::InvalidSource(format!("{} has no file extension", relative)))?;

        Ok(Self {
            stem: format!("{}-{}x{}", base, width, height),
            extension: extension.to_string(),
        })
    }

    /// The key without its extension, e.g. `photos/dog-400x300`.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn relative_path(&self) -> String {
        format!("{}.{}", self.stem, self.extension)
    }

    pub fn path_in(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(self.relative_path())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stem, self.extension)
    }
}

/// Resolve `source` to a `/`-separated path relative to `base_dir`, lexically.
///
/// Relative sources are taken relative to `base_dir`. `..` may not climb above
/// the base, and absolute sources must start with it.
pub fn scoped_relative_path(base_dir: &Path, source: &Path) -> Result<String, ResizeError> {
    // Windows-style separators are treated as plain path separators
    let unix = source.to_string_lossy().replace('\\', "/");
    let source = Path::new(&unix);

    let remainder = if source.is_absolute() {
        source.strip_prefix(base_dir).map_err(|_| {
            ResizeError::OutOfScope(format!("{} is not under {}", source.display(), base_dir.display()))
        })?
    } else {
        source
    };

    // Walk the remainder, refusing to climb above the base
    let mut parts: Vec<&str> = Vec::new();
    for component in remainder.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| ResizeError::InvalidSource(format!("{} is not valid UTF-8", source.display())))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(ResizeError::OutOfScope(format!(
                        "{} escapes {}",
                        source.display(),
                        base_dir.display()
                    )));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ResizeError::OutOfScope(format!(
                    "{} is not under {}",
                    source.display(),
                    base_dir.display()
                )));
            }
        }
    }

    if parts.is_empty() {
        return Err(ResizeError::InvalidSource(format!("{} names no file", source.display())));
    }

    Ok(parts.join("/"))
}

// Split off the final extension of the file name, never an interior one
fn split_extension(relative: &str) -> Option<(&str, &str)> {
    let name_start = relative.rfind('/').map(|i| i + 1).unwrap_or(0);
    let dot = relative[name_start..].rfind('.')?;
    if dot == 0 {
        return None;
    }
    let dot = name_start + dot;
    let extension = &relative[dot + 1..];
    if extension.is_empty() {
        return None;
    }
    Some((&relative[..dot], extension))
}
