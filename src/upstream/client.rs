//! HTTP client for one Flussonic media server
//!
//! Every call is bounded by the configured request timeout (15s by default)
//! and every failure is folded into [`UpstreamError`]. The client never
//! retries; callers own the retry policy.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::UpstreamApi;
use crate::config::UpstreamConfig;
use crate::errors::{UpstreamError, UpstreamResult};
use crate::models::{MediaListing, TrafficReport, UpstreamStream};
use crate::utils::url::UrlUtils;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Settings shared by every client built from the same configuration
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub api_prefix: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            api_prefix: crate::config::defaults::DEFAULT_UPSTREAM_API_PREFIX.to_string(),
        }
    }
}

impl ClientSettings {
    pub fn from_config(config: &UpstreamConfig) -> anyhow::Result<Self> {
        Ok(Self {
            timeout: config.request_timeout()?,
            api_prefix: config.api_prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Build the pooled reqwest client carrying the request timeout
    pub fn build_http_client(&self) -> UpstreamResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| UpstreamError::configuration(format!("Failed to create HTTP client: {e}")))
    }
}

pub struct FlussonicClient {
    http: Client,
    base_url: String,
    api_prefix: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for FlussonicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlussonicClient")
            .field("base_url", &self.base_url)
            .field("api_prefix", &self.api_prefix)
            .field("username", &self.username)
            .finish()
    }
}

impl FlussonicClient {
    /// Create a client with its own connection pool
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        settings: &ClientSettings,
    ) -> UpstreamResult<Self> {
        let http = settings.build_http_client()?;
        Self::with_http_client(http, base_url, username, password, settings)
    }

    /// Create a client reusing an existing reqwest pool
    ///
    /// The pool's own timeout applies; build it with
    /// [`ClientSettings::build_http_client`].
    pub fn with_http_client(
        http: Client,
        base_url: &str,
        username: &str,
        password: &str,
        settings: &ClientSettings,
    ) -> UpstreamResult<Self> {
        let base_url = UrlUtils::normalize_base_url(base_url).map_err(UpstreamError::configuration)?;

        Ok(Self {
            http,
            base_url,
            api_prefix: settings.api_prefix.clone(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    /// Send a request and decode the JSON body.
    ///
    /// `Ok(None)` means the server answered 2xx with no content (204 or an
    /// empty body).
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> UpstreamResult<Option<T>> {
        let target = UrlUtils::obfuscate_credentials(url);
        debug!("Upstream request: {}", target);

        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| transport_error(&target, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            warn!("Upstream {} answered HTTP {}", target, status);
            return Err(UpstreamError::rejected(format!(
                "{} returned HTTP {}{}",
                target,
                status.as_u16(),
                if snippet.is_empty() {
                    String::new()
                } else {
                    format!(": {snippet}")
                }
            )));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&target, e))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| UpstreamError::malformed(format!("Unexpected response from {target}: {e}")))
    }
}

fn transport_error(target: &str, error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::unavailable(format!("Request to {target} timed out"))
    } else if error.is_connect() {
        UpstreamError::unavailable(format!("Could not connect to {target}: {error}"))
    } else {
        UpstreamError::unavailable(format!("Request to {target} failed: {error}"))
    }
}

#[async_trait]
impl UpstreamApi for FlussonicClient {
    async fn list_streams(&self) -> UpstreamResult<Vec<UpstreamStream>> {
        let url = self.endpoint("/media");
        let listing: Option<MediaListing> = self.execute(self.http.get(&url), &url).await?;
        Ok(listing.map(|l| l.streams).unwrap_or_default())
    }

    async fn update_stream_config(
        &self,
        name: &str,
        partial_config: Value,
    ) -> UpstreamResult<Option<Value>> {
        let url = self.endpoint(&format!("/save_stream/{}", urlencoding::encode(name)));
        self.execute(self.http.post(&url).json(&partial_config), &url)
            .await
    }

    async fn get_traffic_report(
        &self,
        stream_names: &[String],
        since_unix_seconds: i64,
    ) -> UpstreamResult<TrafficReport> {
        let url = self.endpoint("/get_traffic_reports");
        let request = self.http.get(&url).query(&[
            ("streams", stream_names.join(",")),
            ("from", since_unix_seconds.to_string()),
        ]);
        let report: Option<TrafficReport> = self.execute(request, &url).await?;
        Ok(report.unwrap_or_default())
    }
}
