use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::ResizerConfig;
use crate::error::ResizeError;

lazy_static! {
    static ref HTTP_SCHEME: Regex = Regex::new(r"^http://").unwrap();
    static ref ANY_SCHEME: Regex = Regex::new(r"(?i)^https?://").unwrap();
}

/// Translates public URLs under the upload base URL to paths under the
/// upload directory and back.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    upload_dir: PathBuf,
    upload_url: String,
    site_url: String,
    ssl: bool,
}

impl SourceResolver {
    pub fn new(config: &ResizerConfig) -> Self {
        let upload_url = config.upload_url.trim_end_matches('/').to_string();
        let upload_url = if config.ssl {
            HTTP_SCHEME.replace(&upload_url, "https://").into_owned()
        } else {
            upload_url
        };

        Self {
            upload_dir: config.upload_dir.clone(),
            upload_url,
            site_url: config.site_url.trim_end_matches('/').to_string(),
            ssl: config.ssl,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Whether the URL belongs to the configured site, ignoring the scheme.
    pub fn is_local(&self, url: &str) -> bool {
        let site = strip_scheme(&self.site_url);
        let url = strip_scheme(url);
        match url.strip_prefix(site) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Apply the SSL rewrite policy to a URL.
    pub fn normalize_url(&self, url: &str) -> String {
        if self.ssl {
            HTTP_SCHEME.replace(url, "https://").into_owned()
        } else {
            url.to_string()
        }
    }

    /// Map a URL under the upload base URL to a `/`-separated path relative to
    /// the upload directory. Query strings and fragments are ignored.
    pub fn url_to_relative(&self, url: &str) -> Result<String, ResizeError> {
        let url = self.normalize_url(url);
        let url = url.split(['?', '#']).next().unwrap_or_default();

        let rest = strip_scheme(url)
            .strip_prefix(strip_scheme(&self.upload_url))
            .ok_or_else(|| ResizeError::OutOfScope(format!("{} is not under {}", url, self.upload_url)))?;

        if !rest.starts_with('/') {
            return Err(ResizeError::OutOfScope(format!(
                "{} is not under {}",
                url, self.upload_url
            )));
        }

        Ok(rest.trim_start_matches('/').to_string())
    }

    pub fn relative_to_url(&self, relative: &str) -> String {
        format!("{}/{}", self.upload_url, relative.trim_start_matches('/'))
    }

    pub fn relative_to_path(&self, relative: &str) -> PathBuf {
        self.upload_dir.join(relative)
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.relative_to_path(relative).is_file()
    }
}

fn strip_scheme(url: &str) -> &str {
    match ANY_SCHEME.find(url) {
        Some(m) => &url[m.end()..],
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(ssl: bool) -> SourceResolver {
        let mut config = ResizerConfig::new(
            "/srv/uploads",
            "http://example.com/wp-content/uploads/",
            "http://example.com",
        );
        config.ssl = ssl;
        SourceResolver::new(&config)
    }

    #[test]
    fn local_check_ignores_scheme() {
        let resolver = resolver(false);
        assert!(resolver.is_local("https://example.com/wp-content/uploads/a.jpg"));
        assert!(resolver.is_local("http://example.com"));
        assert!(!resolver.is_local("http://example.com.evil.net/a.jpg"));
        assert!(!resolver.is_local("http://cdn.example.org/a.jpg"));
    }

    #[test]
    fn maps_urls_to_relative_paths_and_back() {
        let resolver = resolver(false);
        let rel = resolver
            .url_to_relative("http://example.com/wp-content/uploads/2013/05/dog.jpg?ver=2")
            .unwrap();
        assert_eq!(rel, "2013/05/dog.jpg");
        assert_eq!(
            resolver.relative_to_url(&rel),
            "http://example.com/wp-content/uploads/2013/05/dog.jpg"
        );
        assert_eq!(resolver.relative_to_path(&rel), PathBuf::from("/srv/uploads/2013/05/dog.jpg"));
    }

    #[test]
    fn rejects_urls_outside_upload_base() {
        let resolver = resolver(false);
        assert!(matches!(
            resolver.url_to_relative("http://example.com/wp-content/themes/logo.png"),
            Err(ResizeError::OutOfScope(_))
        ));
        assert!(matches!(
            resolver.url_to_relative("http://example.com/wp-content/uploads-old/a.png"),
            Err(ResizeError::OutOfScope(_))
        ));
    }

    #[test]
    fn ssl_rewrites_upload_url() {
        let resolver = resolver(true);
        assert_eq!(resolver.upload_url(), "https://example.com/wp-content/uploads");
        assert_eq!(
            resolver.normalize_url("http://example.com/wp-content/uploads/a.jpg"),
            "https://example.com/wp-content/uploads/a.jpg"
        );
        let rel = resolver
            .url_to_relative("http://example.com/wp-content/uploads/a.jpg")
            .unwrap();
        assert_eq!(resolver.relative_to_url(&rel), "https://example.com/wp-content/uploads/a.jpg");
    }
}
