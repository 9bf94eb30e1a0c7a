//! Read-modify-write mediation of a stream's push destinations
//!
//! The media server is the only source of truth for the `pushes` list. Every
//! operation re-reads the stream configuration, edits the list locally and
//! writes the whole list back as `{"pushes": [...]}`.
//!
//! There is no concurrency token on the upstream side: two mediators editing
//! the same stream at the same time race and the last write wins.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::errors::{AppError, AppResult, UpstreamError};
use crate::models::{PushDestination, StreamConfig};
use crate::upstream::UpstreamApi;

const PUSHES_KEY: &str = "pushes";

pub struct PushConfigMediator {
    client: Arc<dyn UpstreamApi>,
}

impl PushConfigMediator {
    pub fn new(client: Arc<dyn UpstreamApi>) -> Self {
        Self { client }
    }

    /// Current push destinations; entries without a URL are not listed
    pub async fn list(&self, stream_name: &str) -> AppResult<Vec<PushDestination>> {
        let pushes = self.current_pushes(stream_name).await?;
        Ok(pushes.iter().filter_map(push_url).map(destination).collect())
    }

    /// Append `url` unless an entry with the same URL exists
    ///
    /// Fails with `Conflict` without writing anything upstream when the URL
    /// is already configured.
    pub async fn add(&self, stream_name: &str, url: &str) -> AppResult<Vec<PushDestination>> {
        let url = validate_url(url)?;
        let mut pushes = self.current_pushes(stream_name).await?;

        if pushes.iter().any(|push| push_url(push) == Some(url)) {
            return Err(AppError::conflict(format!(
                "Push URL already exists for stream '{stream_name}'"
            )));
        }

        pushes.push(json!({ "url": url }));
        self.write_pushes(stream_name, &pushes).await?;
        info!("Added push destination to stream '{}'", stream_name);

        Ok(pushes.iter().filter_map(push_url).map(destination).collect())
    }

    /// Drop every entry whose URL equals `url`
    ///
    /// Fails with `NotFound` without writing anything upstream when no entry
    /// matches.
    pub async fn remove(&self, stream_name: &str, url: &str) -> AppResult<Vec<PushDestination>> {
        let url = validate_url(url)?;
        let pushes = self.current_pushes(stream_name).await?;
        let before = pushes.len();

        let remaining: Vec<Value> = pushes
            .into_iter()
            .filter(|push| push_url(push) != Some(url))
            .collect();

        if remaining.len() == before {
            return Err(AppError::not_found("push destination", url));
        }

        self.write_pushes(stream_name, &remaining).await?;
        info!("Removed push destination from stream '{}'", stream_name);

        Ok(remaining.iter().filter_map(push_url).map(destination).collect())
    }

    /// Raw `pushes` entries; unknown keys inside an entry are kept intact
    async fn current_pushes(&self, stream_name: &str) -> AppResult<Vec<Value>> {
        let config = self.client.get_stream_config(stream_name).await?;
        Ok(pushes_of(&config)?)
    }

    async fn write_pushes(&self, stream_name: &str, pushes: &[Value]) -> AppResult<()> {
        let mut partial = Map::new();
        partial.insert(PUSHES_KEY.to_string(), Value::Array(pushes.to_vec()));
        self.client
            .update_stream_config(stream_name, Value::Object(partial))
            .await?;
        Ok(())
    }
}

fn pushes_of(config: &StreamConfig) -> Result<Vec<Value>, UpstreamError> {
    match config.get(PUSHES_KEY) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => Ok(entries.clone()),
        Some(other) => Err(UpstreamError::malformed(format!(
            "stream config '{PUSHES_KEY}' is not a list: {other}"
        ))),
    }
}

fn push_url(push: &Value) -> Option<&str> {
    push.get("url").and_then(Value::as_str)
}

fn destination(url: &str) -> PushDestination {
    PushDestination {
        url: url.to_string(),
    }
}

fn validate_url(url: &str) -> AppResult<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::validation("Push URL must not be empty"));
    }
    Ok(url)
}
