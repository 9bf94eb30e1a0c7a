//! Operations available to stream owners
//!
//! Each stream-scoped call passes the [`AccessGate`] before touching the
//! database or the media server.

use chrono::NaiveDate;
use std::sync::Arc;

use super::access::AccessGate;
use super::push_config::PushConfigMediator;
use crate::credentials::CredentialStore;
use crate::errors::{AppError, AppResult};
use crate::models::{DailyTraffic, PushDestination, StreamBinding, StreamInfo, User};
use crate::repositories::{StreamBindingRepository, UsageStore};

#[derive(Clone)]
pub struct ClientService {
    gate: AccessGate,
    bindings: StreamBindingRepository,
    credentials: Arc<dyn CredentialStore>,
    usage: Arc<dyn UsageStore>,
}

impl ClientService {
    pub fn new(
        bindings: StreamBindingRepository,
        credentials: Arc<dyn CredentialStore>,
        usage: Arc<dyn UsageStore>,
    ) -> Self {
        Self {
            gate: AccessGate::new(bindings.clone()),
            bindings,
            credentials,
            usage,
        }
    }

    pub async fn my_streams(&self, user: &User) -> AppResult<Vec<StreamInfo>> {
        Ok(self.bindings.list_streams_for_user(user.id).await?)
    }

    /// Gate check for requests whose parameters could not be parsed
    ///
    /// Callers without a binding get `Forbidden`, everyone else gets the
    /// validation error.
    pub async fn reject_malformed(
        &self,
        user: &User,
        stream_name: &str,
        reason: String,
    ) -> AppError {
        match self.gate.ensure_bound(user, stream_name).await {
            Ok(()) => AppError::validation(reason),
            Err(e) => e,
        }
    }

    /// Daily byte totals for the inclusive date range
    pub async fn traffic(
        &self,
        user: &User,
        stream_name: &str,
        server_id: Option<i64>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<DailyTraffic>> {
        let binding = self.gate.authorize(user, stream_name, server_id).await?;
        if start_date > end_date {
            return Err(AppError::validation("start_date must not be after end_date"));
        }
        Ok(self
            .usage
            .daily_usage(binding.server_id, &binding.stream_name, start_date, end_date)
            .await?)
    }

    pub async fn list_pushes(
        &self,
        user: &User,
        stream_name: &str,
        server_id: Option<i64>,
    ) -> AppResult<Vec<PushDestination>> {
        let (mediator, binding) = self.mediator(user, stream_name, server_id).await?;
        mediator.list(&binding.stream_name).await
    }

    pub async fn add_push(
        &self,
        user: &User,
        stream_name: &str,
        server_id: Option<i64>,
        url: &str,
    ) -> AppResult<Vec<PushDestination>> {
        let (mediator, binding) = self.mediator(user, stream_name, server_id).await?;
        mediator.add(&binding.stream_name, url).await
    }

    pub async fn remove_push(
        &self,
        user: &User,
        stream_name: &str,
        server_id: Option<i64>,
        url: &str,
    ) -> AppResult<Vec<PushDestination>> {
        let (mediator, binding) = self.mediator(user, stream_name, server_id).await?;
        mediator.remove(&binding.stream_name, url).await
    }

    async fn mediator(
        &self,
        user: &User,
        stream_name: &str,
        server_id: Option<i64>,
    ) -> AppResult<(PushConfigMediator, StreamBinding)> {
        let binding = self.gate.authorize(user, stream_name, server_id).await?;
        let server = self
            .credentials
            .server(binding.server_id)
            .await?
            .ok_or_else(|| AppError::not_found("server", binding.server_id.to_string()))?;
        let client = self.credentials.client_for(&server)?;
        Ok((PushConfigMediator::new(client), binding))
    }
}
