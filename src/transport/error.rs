use std::path::PathBuf;
use thiserror::Error;

/// Why a single remote call failed. Every fetch returns either its data or one of these,
/// so callers decide explicitly whether the failure is fatal or skippable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("Request to {0} timed out")]
    Timeout(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    // Covers errors while streaming a body to disk
    #[error("Download of {url} to '{path}' failed")]
    DownloadIo {
        url: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON from {0}")]
    JsonParse(String, #[source] serde_json::Error),

    /// Reported by transports that are not backed by HTTP.
    #[error("{url} is unavailable: {reason}")]
    Unavailable { url: String, reason: String },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(url.to_string(), e)
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus {
                url: url.to_string(),
                status,
                source: e,
            }
        } else {
            FetchError::NetworkRequest(url.to_string(), e)
        }
    }
}
