//! Stream-scoped authorization
//!
//! Every client operation on a stream resolves the caller's binding first.
//! A missing binding is always `Forbidden`, whether or not the stream exists
//! anywhere, so unauthorized callers learn nothing about other streams.

use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::models::{StreamBinding, User};
use crate::repositories::StreamBindingRepository;

pub const ACCESS_DENIED_MESSAGE: &str = "You do not have access to this stream.";

#[derive(Clone)]
pub struct AccessGate {
    bindings: StreamBindingRepository,
}

impl AccessGate {
    pub fn new(bindings: StreamBindingRepository) -> Self {
        Self { bindings }
    }

    /// Resolve the binding that authorizes `user` on `stream_name`
    ///
    /// `server_id` narrows the lookup when the same name is bound on several
    /// servers; without it such a name is rejected as ambiguous.
    pub async fn authorize(
        &self,
        user: &User,
        stream_name: &str,
        server_id: Option<i64>,
    ) -> AppResult<StreamBinding> {
        let mut bindings = self
            .bindings
            .find_for_user_stream(user.id, stream_name, server_id)
            .await?;

        match bindings.len() {
            0 => {
                debug!("User {} denied access to stream '{}'", user.id, stream_name);
                Err(AppError::forbidden(ACCESS_DENIED_MESSAGE))
            }
            1 => Ok(bindings.remove(0)),
            _ => Err(AppError::validation(format!(
                "Stream '{stream_name}' is assigned on several servers; specify server_id"
            ))),
        }
    }

    /// Forbidden unless `user` is bound to `stream_name` on some server
    pub async fn ensure_bound(&self, user: &User, stream_name: &str) -> AppResult<()> {
        let bindings = self
            .bindings
            .find_for_user_stream(user.id, stream_name, None)
            .await?;
        if bindings.is_empty() {
            debug!("User {} denied access to stream '{}'", user.id, stream_name);
            return Err(AppError::forbidden(ACCESS_DENIED_MESSAGE));
        }
        Ok(())
    }
}
