use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResizerConfig {
    /// Directory the cache is scoped to; sources and derivatives live under it.
    pub upload_dir: PathBuf,
    /// Public URL that `upload_dir` is served from.
    pub upload_url: String,
    /// Only URLs under this site are considered local.
    pub site_url: String,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_single_flight")]
    pub single_flight: bool,
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_single_flight() -> bool {
    true
}

impl ResizerConfig {
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        upload_url: impl Into<String>,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            upload_url: upload_url.into(),
            site_url: site_url.into(),
            ssl: false,
            disabled: false,
            jpeg_quality: default_jpeg_quality(),
            single_flight: default_single_flight(),
        }
    }

    // Load from an optional TOML file layered with RESIZER_* environment variables
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("RESIZER"))
            .build()?;

        let config = settings.try_deserialize::<ResizerConfig>()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload_url.trim().is_empty() {
            return Err(ConfigError::Invalid("upload_url must not be empty".to_string()));
        }
        if self.site_url.trim().is_empty() {
            return Err(ConfigError::Invalid("site_url must not be empty".to_string()));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::Invalid(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_file_with_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("App.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "upload_dir = \"/var/www/uploads\"\nupload_url = \"http://example.com/uploads\"\nsite_url = \"http://example.com\""
        )
        .unwrap();

        let config = ResizerConfig::load(&path).unwrap();
        assert_eq!(config.upload_dir, PathBuf::from("/var/www/uploads"));
        assert_eq!(config.jpeg_quality, 90);
        assert!(config.single_flight);
        assert!(!config.ssl);
        assert!(!config.disabled);
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let mut config = ResizerConfig::new("/tmp", "http://a/uploads", "http://a");
        config.jpeg_quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
