//! Media server API abstraction
//!
//! [`UpstreamApi`] is the contract the reconciliation engine and the push
//! mediator are written against. [`FlussonicClient`] is the HTTP
//! implementation; tests substitute in-memory fakes or a mock HTTP server.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{UpstreamError, UpstreamResult};
use crate::models::{StreamConfig, TrafficReport, UpstreamStream};

pub mod client;

pub use client::FlussonicClient;

#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// All streams configured on the server
    async fn list_streams(&self) -> UpstreamResult<Vec<UpstreamStream>>;

    /// Editable configuration of one stream
    ///
    /// The media server has no single-stream read, so the default
    /// implementation scans the full listing (O(n) per lookup).
    async fn get_stream_config(&self, name: &str) -> UpstreamResult<StreamConfig> {
        self.list_streams()
            .await?
            .into_iter()
            .find(|stream| stream.name.as_deref() == Some(name))
            .map(|stream| stream.config)
            .ok_or_else(|| UpstreamError::not_found(name))
    }

    /// Send only the changed keys; the server merges them into the stream.
    /// Returns the updated config when the server echoes one.
    async fn update_stream_config(
        &self,
        name: &str,
        partial_config: Value,
    ) -> UpstreamResult<Option<Value>>;

    /// Traffic samples per stream since `since_unix_seconds`
    async fn get_traffic_report(
        &self,
        stream_names: &[String],
        since_unix_seconds: i64,
    ) -> UpstreamResult<TrafficReport>;
}
