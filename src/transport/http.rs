use crate::transport::error::FetchError;
use crate::transport::{FetchResult, Transport};
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// [`Transport`] backed by a shared `reqwest` client with a per-call timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self { client })
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> FetchResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        match response.error_for_status() {
            Ok(resp) => Ok(resp),
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e.status());
                Err(FetchError::from_reqwest(url, e))
            }
        }
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> FetchResult<Vec<u8>> {
        let response = self.send(self.client.get(url), url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok(bytes.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> FetchResult<T> {
        let request = self.client.get(url).header(ACCEPT, "application/json");
        let response = self.send(request, url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::JsonParse(url.to_string(), e))
    }

    async fn download(&self, url: &str, dest: &Path) -> FetchResult<u64> {
        info!("Downloading {} to {}", url, dest.display());
        let response = self.send(self.client.get(url), url).await?;

        let io_error = |source: std::io::Error| FetchError::DownloadIo {
            url: url.to_string(),
            path: dest.to_path_buf(),
            source,
        };
        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let reader = StreamReader::new(stream);
        tokio::pin!(reader);
        let mut file = tokio::fs::File::create(dest).await.map_err(io_error)?;
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(io_error)?;
        file.flush().await.map_err(io_error)?;
        Ok(written)
    }
}
