use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{error, info};

use crate::domain::error::{AppError, Result};

/// Retrieves the full content behind a source URL.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("tabclean/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        info!(url, "Downloading file...");
        let start = Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(url, error = %e, "Download request failed");
            AppError::DownloadFailure(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(url, %status, "Download returned error status");
            return Err(AppError::DownloadFailure(format!("HTTP {}", status)));
        }

        let bytes = response.bytes().await.map_err(|e| {
            error!(url, error = %e, "Failed to read download body");
            AppError::DownloadFailure(format!("Failed to read response body: {}", e))
        })?;

        info!(
            size_mb = %format!("{:.2}", bytes.len() as f64 / (1024.0 * 1024.0)),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Downloaded file"
        );

        Ok(bytes.to_vec())
    }
}
