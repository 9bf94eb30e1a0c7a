//! User accounts and stream assignments

use tracing::info;

use super::auth::hash_password;
use crate::errors::{AppError, AppResult, RepositoryError};
use crate::models::{StreamBinding, User, UserCreateRequest};
use crate::repositories::{QueryParams, Repository, ServerRepository, StreamBindingRepository, UserRepository};

#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
    servers: ServerRepository,
    bindings: StreamBindingRepository,
}

impl UserService {
    pub fn new(
        users: UserRepository,
        servers: ServerRepository,
        bindings: StreamBindingRepository,
    ) -> Self {
        Self {
            users,
            servers,
            bindings,
        }
    }

    pub async fn create(&self, username: &str, password: &str, is_admin: bool) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::validation("Username must not be empty"));
        }
        if password.is_empty() {
            return Err(AppError::validation("Password must not be empty"));
        }

        let password_hash = hash_password(password).await?;
        let user = self
            .users
            .create(UserCreateRequest {
                username: username.to_string(),
                password_hash,
                is_admin,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::ConstraintViolation { .. } => {
                    AppError::conflict(format!("Username '{username}' is already taken"))
                }
                other => other.into(),
            })?;

        info!(
            "Created {} user '{}' ({})",
            if user.is_admin { "admin" } else { "client" },
            user.username,
            user.id
        );
        Ok(user)
    }

    pub async fn list(&self, query: QueryParams) -> AppResult<(Vec<User>, u64)> {
        let users = self.users.find_all(query).await?;
        let total = self.users.count().await?;
        Ok((users, total))
    }

    /// Grant `user_id` access to a stream on a server
    pub async fn assign_stream(
        &self,
        user_id: i64,
        server_id: i64,
        stream_name: &str,
    ) -> AppResult<StreamBinding> {
        let stream_name = stream_name.trim();
        if stream_name.is_empty() {
            return Err(AppError::validation("Stream name must not be empty"));
        }
        self.require_user(user_id).await?;
        if !self.servers.exists(server_id).await? {
            return Err(AppError::not_found("server", server_id.to_string()));
        }

        let binding = StreamBinding {
            user_id,
            server_id,
            stream_name: stream_name.to_string(),
        };
        self.bindings.create(&binding).await.map_err(|e| match e {
            RepositoryError::ConstraintViolation { .. } => AppError::conflict(format!(
                "Stream '{stream_name}' on server {server_id} is already assigned to user {user_id}"
            )),
            other => other.into(),
        })
    }

    pub async fn streams_of(&self, user_id: i64) -> AppResult<Vec<StreamBinding>> {
        self.require_user(user_id).await?;
        Ok(self.bindings.find_for_user(user_id).await?)
    }

    pub async fn unassign_stream(
        &self,
        user_id: i64,
        server_id: i64,
        stream_name: &str,
    ) -> AppResult<()> {
        let binding = StreamBinding {
            user_id,
            server_id,
            stream_name: stream_name.trim().to_string(),
        };
        if !self.bindings.delete(&binding).await? {
            return Err(AppError::not_found(
                "stream binding",
                format!("{user_id}/{server_id}/{}", binding.stream_name),
            ));
        }
        Ok(())
    }

    async fn require_user(&self, user_id: i64) -> AppResult<()> {
        if !self.users.exists(user_id).await? {
            return Err(AppError::not_found("user", user_id.to_string()));
        }
        Ok(())
    }
}
