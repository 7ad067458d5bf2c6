use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;

use super::http_errors::HttpErrorInfo;

/// Why a byte transfer stopped early
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("transfer cancelled")]
    Cancelled,

    #[error("{}", .0.format())]
    Status(HttpErrorInfo),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid request header: {0}")]
    Header(String),
}

pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client with default timeouts
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        Self::with_timeouts(user_agent, Duration::from_secs(30), Duration::from_secs(300))
    }

    pub fn with_timeouts(
        user_agent: &str,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(network: &crate::app::config::NetworkConfig) -> Result<Self, reqwest::Error> {
        Self::with_timeouts(
            &network.user_agent,
            Duration::from_secs(network.connect_timeout_secs),
            Duration::from_secs(network.timeout_secs),
        )
    }

    /// GET a small API document; returns status and body text
    pub async fn fetch_text(&self, url: &str) -> Result<(u16, String), reqwest::Error> {
        tracing::trace!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::trace!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok((status, body))
    }

    /// Stream `url` into `path`, honoring `cancel` while waiting for the
    /// response and between every body chunk.
    ///
    /// The file is created before the request goes out so the caller always
    /// owns a path to clean up. Returns the number of bytes written.
    pub async fn download_to_file<F>(
        &self,
        url: &str,
        path: &Path,
        headers: &HashMap<String, String>,
        cancel: &CancellationToken,
        mut progress_callback: F,
    ) -> Result<u64, TransferError>
    where
        F: FnMut(u64, Option<u64>) + Send,
    {
        tracing::trace!("Starting transfer: url={}, path={:?}", url, path);
        let headers = Self::build_headers(headers)?;
        let file = File::create(path).await?;

        let request = self.client.get(url).headers(headers).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            response = request => response?,
        };
        tracing::trace!("Received response with status: {}", response.status());

        if !response.status().is_success() {
            return Err(TransferError::Status(HttpErrorInfo::from_status(
                response.status().as_u16(),
            )));
        }

        let total = response.content_length();
        let mut file = BufWriter::with_capacity(64 * 1024, file);
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress_callback(downloaded, total);
        }

        file.flush().await?;
        file.into_inner().sync_all().await?;

        Ok(downloaded)
    }

    /// Build request headers from plain key/value pairs
    pub fn build_headers(custom_headers: &HashMap<String, String>) -> Result<HeaderMap, TransferError> {
        let mut headers = HeaderMap::new();
        for (key, value) in custom_headers {
            let name: HeaderName = key
                .parse()
                .map_err(|_| TransferError::Header(key.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| TransferError::Header(key.clone()))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}
