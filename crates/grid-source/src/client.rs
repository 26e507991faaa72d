//! HTTP fetcher with bounded timeouts and retry on transient failures.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::config::SourceConfig;
use crate::credentials::CredentialProvider;
use crate::error::{SourceError, SourceResult};

/// Fetches response bodies as text.
///
/// A request succeeds only with a 2xx status and a non-blank body. Network
/// failures, timeouts, 5xx and 429 are retried with exponential backoff;
/// anything else fails immediately.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    config: SourceConfig,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl HttpFetcher {
    pub fn new(config: SourceConfig) -> SourceResult<Self> {
        config.validate().map_err(SourceError::Config)?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| SourceError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            credentials: None,
        })
    }

    /// Attach a credential provider for authorized requests.
    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// GET `url` and return the body.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_text(&self, url: &str) -> SourceResult<String> {
        self.fetch_with_retry(url, false).await
    }

    /// GET `url` and decode the body as JSON.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> SourceResult<T> {
        let body = self.fetch_with_retry(url, false).await?;
        decode_json(url, &body)
    }

    /// GET `url` with a bearer token from the credential provider.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_json_authorized<T: DeserializeOwned>(&self, url: &str) -> SourceResult<T> {
        let body = self.fetch_with_retry(url, true).await?;
        decode_json(url, &body)
    }

    async fn fetch_with_retry(&self, url: &str, authorized: bool) -> SourceResult<String> {
        let mut retry_count = 0;
        let mut delay = self.config.initial_retry_delay();

        loop {
            match self.fetch_once(url, authorized).await {
                Ok(body) => {
                    debug!(bytes = body.len(), retries = retry_count, "Fetched");
                    return Ok(body);
                }
                Err(e) if e.is_transient() && retry_count < self.config.max_retries => {
                    retry_count += 1;

                    warn!(
                        error = %e,
                        retry = retry_count,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Request failed, retrying"
                    );

                    tokio::time::sleep(delay).await;

                    // Exponential backoff
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay());
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str, authorized: bool) -> SourceResult<String> {
        let mut request = self.client.get(url);

        if authorized {
            let provider = self.credentials.as_ref().ok_or_else(|| {
                SourceError::Credential("no credential provider configured".to_string())
            })?;
            request = request.bearer_auth(provider.bearer_token().await?);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::status(url, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::request(url, e))?;

        if body.trim().is_empty() {
            return Err(SourceError::empty_body(url));
        }

        Ok(body)
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("config", &self.config)
            .field("authorized", &self.credentials.is_some())
            .finish()
    }
}

fn decode_json<T: DeserializeOwned>(url: &str, body: &str) -> SourceResult<T> {
    serde_json::from_str(body).map_err(|e| SourceError::Json {
        url: url.to_string(),
        message: e.to_string(),
    })
}
