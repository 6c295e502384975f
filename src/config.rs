use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// What to scan: a seed URL and the keyword to look for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTarget {
    /// URL of the page to scan (normalized to carry a scheme)
    pub url: String,

    /// Keyword to search for, compared verbatim (case-sensitive)
    pub keyword: String,
}

impl ScanTarget {
    /// Create a target, prepending `https://` when the URL has no scheme.
    pub fn new(url: &str, keyword: &str) -> Self {
        let url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        };

        Self {
            url,
            keyword: keyword.to_string(),
        }
    }

    /// Parse the seed URL, surfacing a fatal error if it is not a valid URL.
    pub fn parsed_url(&self) -> Result<Url, ScanError> {
        Url::parse(&self.url).map_err(|source| ScanError::InvalidSeedUrl {
            url: self.url.clone(),
            source,
        })
    }
}

/// Configuration for a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// The scan target (seed URL + keyword)
    pub target: ScanTarget,

    /// Timeout for each navigation, in seconds
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Path to a Chromium/Chrome binary; when unset, the browser is
    /// auto-detected from the usual install locations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_binary: Option<PathBuf>,
}

impl ScanConfig {
    /// Create a configuration with default values
    pub fn new(url: &str, keyword: &str) -> Self {
        Self {
            target: ScanTarget::new(url, keyword),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            chrome_binary: None,
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let contents =
            std::fs::read_to_string(path.as_ref()).map_err(|source| ScanError::ConfigRead {
                path: path.as_ref().to_path_buf(),
                source,
            })?;

        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

/// Default value for navigation_timeout_secs
fn default_navigation_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_is_prepended_when_missing() {
        let target = ScanTarget::new("example.com", "foo");
        assert_eq!(target.url, "https://example.com");
    }

    #[test]
    fn test_existing_scheme_is_kept() {
        let target = ScanTarget::new("http://example.com", "foo");
        assert_eq!(target.url, "http://example.com");

        let target = ScanTarget::new("https://example.com/page", "foo");
        assert_eq!(target.url, "https://example.com/page");
    }

    #[test]
    fn test_invalid_seed_url_is_fatal() {
        let target = ScanTarget::new("https://", "foo");
        assert!(target.parsed_url().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        std::fs::write(
            &path,
            r#"{"target": {"url": "https://example.com", "keyword": "foo"},
                "navigation_timeout_secs": 10}"#,
        )
        .unwrap();

        let config = ScanConfig::from_file(&path).unwrap();
        assert_eq!(config.target.keyword, "foo");
        assert_eq!(config.navigation_timeout_secs, 10);

        assert!(ScanConfig::from_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: ScanConfig = serde_json::from_str(
            r#"{"target": {"url": "https://example.com", "keyword": "foo"}}"#,
        )
        .unwrap();
        assert_eq!(config.navigation_timeout_secs, 30);
        assert!(config.chrome_binary.is_none());
    }
}
