//! The network seam. Every remote source (station registry, daily CSVs, MODIS JSON,
//! the bulk statistics archive) is reached through a [`Transport`], so the pipeline can
//! be driven by an HTTP client in production and by fixtures in tests.

pub mod error;
mod http;

pub use error::FetchError;
pub use http::HttpTransport;

use log::info;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Success-with-data or failure-with-reason for one remote call.
pub type FetchResult<T> = Result<T, FetchError>;

#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Fetches the whole body of `url`.
    async fn get(&self, url: &str) -> FetchResult<Vec<u8>>;

    /// Streams the body of `url` into the file at `dest` and returns the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> FetchResult<u64>;

    /// Fetches `url` and decodes the body as JSON.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> FetchResult<T> {
        let bytes = self.get(url).await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::JsonParse(url.to_string(), e))
    }
}

/// Downloads `url` to `dest` unless `dest` already exists.
///
/// The body is written to a `.part` sibling first and renamed on success, so an
/// interrupted download is never mistaken for a cached artifact on the next run.
pub async fn fetch_cached<T: Transport>(transport: &T, url: &str, dest: &Path) -> FetchResult<()> {
    if tokio::fs::metadata(dest).await.is_ok() {
        info!("Cache hit for {} at {}", url, dest.display());
        return Ok(());
    }
    let io_error = |source: std::io::Error| FetchError::DownloadIo {
        url: url.to_string(),
        path: dest.to_path_buf(),
        source,
    };
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    let mut partial = dest.as_os_str().to_owned();
    partial.push(".part");
    let partial = Path::new(&partial).to_path_buf();

    match transport.download(url, &partial).await {
        Ok(bytes) => {
            tokio::fs::rename(&partial, dest).await.map_err(io_error)?;
            info!("Downloaded {} bytes from {}", bytes, url);
            Ok(())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            Err(e)
        }
    }
}

/// File name for a bulk artifact: the last non-empty path segment of its URL.
pub fn artifact_name(url: &str) -> &str {
    let path = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("dataset")
}
