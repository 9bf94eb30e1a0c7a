//! Registered servers and the clients built from their credentials
//!
//! The reconciliation engine and the web services never construct upstream
//! clients themselves; they ask a [`CredentialStore`], which keeps the URL
//! and credentials in one place and lets tests hand out fakes.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use crate::errors::{RepositoryResult, UpstreamError};
use crate::models::Server;
use crate::repositories::{QueryParams, Repository, ServerRepository};
use crate::upstream::client::ClientSettings;
use crate::upstream::{FlussonicClient, UpstreamApi};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Every registered server, ordered by id
    async fn registered_servers(&self) -> RepositoryResult<Vec<Server>>;

    async fn server(&self, id: i64) -> RepositoryResult<Option<Server>>;

    /// Client for arbitrary credentials, used to probe a server before it
    /// is registered; fails with a configuration error on a bad URL
    fn connect(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<Arc<dyn UpstreamApi>, UpstreamError>;

    /// Client for one registered server
    fn client_for(&self, server: &Server) -> Result<Arc<dyn UpstreamApi>, UpstreamError> {
        self.connect(&server.url, &server.username, &server.password)
    }
}

/// Credential store backed by the `servers` table
///
/// All clients share one reqwest connection pool.
#[derive(Clone)]
pub struct DatabaseCredentialStore {
    servers: ServerRepository,
    settings: ClientSettings,
    http: Client,
}

impl DatabaseCredentialStore {
    pub fn new(servers: ServerRepository, settings: ClientSettings) -> Result<Self, UpstreamError> {
        let http = settings.build_http_client()?;
        Ok(Self {
            servers,
            settings,
            http,
        })
    }
}

#[async_trait]
impl CredentialStore for DatabaseCredentialStore {
    async fn registered_servers(&self) -> RepositoryResult<Vec<Server>> {
        self.servers.find_all(QueryParams::new()).await
    }

    async fn server(&self, id: i64) -> RepositoryResult<Option<Server>> {
        self.servers.find_by_id(id).await
    }

    fn connect(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<Arc<dyn UpstreamApi>, UpstreamError> {
        let client = FlussonicClient::with_http_client(
            self.http.clone(),
            url,
            username,
            password,
            &self.settings,
        )?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::errors::UpstreamErrorKind;
    use chrono::Utc;

    #[tokio::test]
    async fn test_client_for_rejects_bad_url() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let store =
            DatabaseCredentialStore::new(ServerRepository::new(db.pool()), ClientSettings::default())
                .unwrap();

        let server = Server {
            id: 1,
            name: "broken".to_string(),
            url: "ftp://edge".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
            created_at: Utc::now(),
        };
        let err = store.client_for(&server).err().unwrap();
        assert_eq!(err.kind, UpstreamErrorKind::Configuration);
        assert!(store.registered_servers().await.unwrap().is_empty());
    }
}
