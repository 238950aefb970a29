// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP client used for chunk downloads.
//!
//! This is a thin wrapper over a pooled `reqwest` client. Retrying transport
//! failures (connection resets, throttling, request signing) is the job of the
//! caller's HTTP layer; a failed request surfaces here as an `Io` error.

use crate::error::{ErrorHelper, Result};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// Configuration for the HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpClientConfig {
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Read timeout duration.
    pub read_timeout: Duration,
    /// Maximum number of idle connections per host.
    pub max_connections_per_host: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            max_connections_per_host: 100,
            user_agent: format!("warehouse-results/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Pooled HTTP client for object-store GETs.
#[derive(Debug)]
pub struct ChunkHttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl ChunkHttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .pool_max_idle_per_host(config.max_connections_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ErrorHelper::io().message(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Issue a GET with the given headers. Non-2xx responses become errors.
    pub async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<Response> {
        let mut request_builder = self.client.get(url);
        for (name, value) in headers {
            request_builder = request_builder.header(name.as_str(), value.as_str());
        }

        let request = request_builder.build().map_err(|e| {
            ErrorHelper::io().message(format!("Failed to build download request: {}", e))
        })?;

        debug!("GET {} ({} headers)", url, headers.len());

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| ErrorHelper::io().message(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ErrorHelper::io().message(format!(
                "HTTP {} - {}",
                status.as_u16(),
                error_body
            )));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_config_default() {
        let config = HttpClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.read_timeout, Duration::from_secs(60));
        assert_eq!(config.max_connections_per_host, 100);
        assert!(config.user_agent.starts_with("warehouse-results/"));
    }

    #[tokio::test]
    async fn test_http_client_creation() {
        let client = ChunkHttpClient::new(HttpClientConfig::default()).unwrap();
        assert_eq!(client.config().max_connections_per_host, 100);
    }
}
