use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort a scan.
///
/// Only fatal conditions are represented here. Subpage navigation failures
/// are logged and skipped by the traversal driver, and undecodable response
/// bodies are absorbed by the network observer; neither ever becomes a
/// `ScanError`.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("seed navigation failed for {url}: {reason}")]
    SeedNavigation { url: String, reason: String },

    #[error("seed navigation timed out for {url} after {timeout_secs}s")]
    SeedNavigationTimeout { url: String, timeout_secs: u64 },

    #[error("in-page evaluation failed: {0}")]
    Evaluate(String),

    #[error("failed to retrieve page content: {0}")]
    PageContent(#[source] chromiumoxide::error::CdpError),

    #[error("invalid seed URL {url}: {source}")]
    InvalidSeedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("failed to attach channel observer: {0}")]
    ObserverAttach(#[source] chromiumoxide::error::CdpError),
}
