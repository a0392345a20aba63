use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::HttpConfig;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    pub final_url: String, // After redirects
    pub body: String,
}

/// Shared HTTP client for vendor pages and product images.
///
/// Every request is bounded by the configured timeout; a non-success status is
/// reported as a network error.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Self::with_timeout(&config.user_agent, config.timeout())
    }

    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| AppError::network("<client>", format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        let start_time = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::network(url, describe(&e)))?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(AppError::network(url, format!("unexpected status {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::network(url, format!("error reading response: {}", describe(&e))))?;

        tracing::debug!(
            url,
            final_url = %final_url,
            status = status.as_u16(),
            bytes = body.len(),
            "Fetched page in {}ms",
            start_time.elapsed().as_millis()
        );

        Ok(FetchedPage { final_url, body })
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::network(url, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::network(url, format!("unexpected status {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::network(url, format!("error reading response: {}", describe(&e))))?;

        Ok(bytes.to_vec())
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    }
}
