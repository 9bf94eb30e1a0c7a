//! Server registration and live stream listing

use std::sync::Arc;
use tracing::info;

use crate::credentials::CredentialStore;
use crate::errors::{AppError, AppResult, RepositoryError};
use crate::models::{Server, ServerCreateRequest, UpstreamStream};
use crate::repositories::{QueryParams, Repository, ServerRepository};
use crate::utils::url::UrlUtils;

#[derive(Clone)]
pub struct ServerService {
    servers: ServerRepository,
    credentials: Arc<dyn CredentialStore>,
}

impl ServerService {
    pub fn new(servers: ServerRepository, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            servers,
            credentials,
        }
    }

    /// Register a server after proving the credentials work
    ///
    /// The URL is checked before any network I/O. The server must answer a
    /// stream listing before anything is persisted.
    pub async fn create(&self, mut request: ServerCreateRequest) -> AppResult<Server> {
        request.name = request.name.trim().to_string();
        if request.name.is_empty() {
            return Err(AppError::validation("Server name must not be empty"));
        }
        request.url = UrlUtils::normalize_base_url(&request.url).map_err(AppError::configuration)?;

        if self.servers.find_by_url(&request.url).await?.is_some() {
            return Err(AppError::conflict(format!(
                "A server with URL '{}' is already registered",
                request.url
            )));
        }

        let client = self
            .credentials
            .connect(&request.url, &request.username, &request.password)?;
        let streams = client.list_streams().await?;
        info!(
            "Verified media server {} ({} stream(s))",
            UrlUtils::obfuscate_credentials(&request.url),
            streams.len()
        );

        let server = self.servers.create(request).await.map_err(|e| match e {
            RepositoryError::ConstraintViolation { .. } => {
                AppError::conflict("A server with this URL is already registered")
            }
            other => other.into(),
        })?;
        info!("Registered media server {} as '{}'", server.id, server.name);
        Ok(server)
    }

    /// One page of servers plus the total count
    pub async fn list(&self, query: QueryParams) -> AppResult<(Vec<Server>, u64)> {
        let servers = self.servers.find_all(query).await?;
        let total = self.servers.count().await?;
        Ok((servers, total))
    }

    /// Streams as currently reported by the media server
    pub async fn live_streams(&self, server_id: i64) -> AppResult<Vec<UpstreamStream>> {
        let server = self
            .servers
            .find_by_id(server_id)
            .await?
            .ok_or_else(|| AppError::not_found("server", server_id.to_string()))?;
        let client = self.credentials.client_for(&server)?;
        Ok(client.list_streams().await?)
    }
}
