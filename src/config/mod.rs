use anyhow::{anyhow, Result};
use cron::Schedule;
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub mod defaults;

use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret; normally supplied through `SECRET_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_access_token_expire_minutes")]
    pub access_token_expire_minutes: i64,
}

/// Settings applied to every media server client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_request_timeout")]
    pub request_timeout: String,
    #[serde(default = "default_upstream_api_prefix")]
    pub api_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression (with seconds field) driving the periodic pass
    #[serde(default = "default_sync_schedule")]
    pub schedule: String,
    /// How far back each pass asks the traffic report to go
    #[serde(default = "default_sync_lookback")]
    pub lookback: String,
    #[serde(default = "default_sync_max_concurrent_servers")]
    pub max_concurrent_servers: usize,
    #[serde(default)]
    pub run_on_startup: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_jwt_algorithm() -> String {
    DEFAULT_JWT_ALGORITHM.to_string()
}

fn default_access_token_expire_minutes() -> i64 {
    DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES
}

fn default_upstream_request_timeout() -> String {
    DEFAULT_UPSTREAM_REQUEST_TIMEOUT.to_string()
}

fn default_upstream_api_prefix() -> String {
    DEFAULT_UPSTREAM_API_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

fn default_sync_schedule() -> String {
    DEFAULT_SYNC_SCHEDULE.to_string()
}

fn default_sync_lookback() -> String {
    DEFAULT_SYNC_LOOKBACK.to_string()
}

fn default_sync_max_concurrent_servers() -> usize {
    DEFAULT_SYNC_MAX_CONCURRENT_SERVERS
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_upstream_request_timeout(),
            api_prefix: default_upstream_api_prefix(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: default_sync_schedule(),
            lookback: default_sync_lookback(),
            max_concurrent_servers: default_sync_max_concurrent_servers(),
            run_on_startup: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: Some(DEFAULT_MAX_CONNECTIONS),
            },
            web: WebConfig {
                host: default_host(),
                port: default_port(),
            },
            auth: AuthConfig {
                secret_key: None,
                algorithm: default_jwt_algorithm(),
                access_token_expire_minutes: default_access_token_expire_minutes(),
            },
            upstream: UpstreamConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.request_timeout).map_err(|e| {
            anyhow!(
                "Invalid upstream.request_timeout '{}': {}",
                self.request_timeout,
                e
            )
        })
    }
}

impl SyncConfig {
    pub fn lookback(&self) -> Result<Duration> {
        humantime::parse_duration(&self.lookback)
            .map_err(|e| anyhow!("Invalid sync.lookback '{}': {}", self.lookback, e))
    }

    pub fn schedule(&self) -> Result<Schedule> {
        Schedule::from_str(&self.schedule)
            .map_err(|e| anyhow!("Invalid sync.schedule '{}': {}", self.schedule, e))
    }
}

impl AuthConfig {
    pub fn algorithm(&self) -> Result<Algorithm> {
        match Algorithm::from_str(&self.algorithm) {
            Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
            Ok(other) => Err(anyhow!(
                "Unsupported token algorithm {:?}: only HS256, HS384 and HS512 are accepted",
                other
            )),
            Err(_) => Err(anyhow!("Unknown token algorithm '{}'", self.algorithm)),
        }
    }

    /// Signing secret, guaranteed non-empty after [`Config::validate`]
    pub fn secret(&self) -> Result<&str> {
        match self.secret_key.as_deref() {
            Some(secret) if !secret.trim().is_empty() => Ok(secret),
            _ => Err(anyhow!(
                "Signing secret is not set (configure auth.secret_key or {})",
                ENV_SECRET_KEY
            )),
        }
    }
}

impl Config {
    /// Load the TOML file (writing defaults when it does not exist), then
    /// apply process environment overrides.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let mut config = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database.url = url;
        }
        if let Some(secret) = lookup(ENV_SECRET_KEY) {
            self.auth.secret_key = Some(secret);
        }
        if let Some(algorithm) = lookup(ENV_JWT_ALGORITHM) {
            self.auth.algorithm = algorithm;
        }
        if let Some(minutes) = lookup(ENV_ACCESS_TOKEN_EXPIRE_MINUTES) {
            match minutes.trim().parse() {
                Ok(value) => self.auth.access_token_expire_minutes = value,
                // Left for validate() to reject
                Err(_) => self.auth.access_token_expire_minutes = 0,
            }
        }
    }

    /// Fail fast on anything that would otherwise surface at first use
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(anyhow!(
                "Database URL is not set (configure database.url or {})",
                ENV_DATABASE_URL
            ));
        }
        self.auth.secret()?;
        self.auth.algorithm()?;
        if self.auth.access_token_expire_minutes <= 0 {
            return Err(anyhow!(
                "Token TTL must be a positive number of minutes ({})",
                ENV_ACCESS_TOKEN_EXPIRE_MINUTES
            ));
        }
        let timeout = self.upstream.request_timeout()?;
        if timeout.is_zero() {
            return Err(anyhow!("upstream.request_timeout must be greater than zero"));
        }
        if !self.upstream.api_prefix.starts_with('/') {
            return Err(anyhow!(
                "upstream.api_prefix must start with '/': '{}'",
                self.upstream.api_prefix
            ));
        }
        self.sync.lookback()?;
        self.sync.schedule()?;
        if self.sync.max_concurrent_servers == 0 {
            return Err(anyhow!("sync.max_concurrent_servers must be at least 1"));
        }
        Ok(())
    }
}
