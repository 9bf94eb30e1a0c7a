//! Default values shared by the configuration structs

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./flussonic-manager.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_JWT_ALGORITHM: &str = "HS256";
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;

pub const DEFAULT_UPSTREAM_REQUEST_TIMEOUT: &str = "15s";
pub const DEFAULT_UPSTREAM_API_PREFIX: &str = "/flussonic/api";

/// Top of every hour (cron with a seconds field)
pub const DEFAULT_SYNC_SCHEDULE: &str = "0 0 * * * *";
pub const DEFAULT_SYNC_LOOKBACK: &str = "24h";
pub const DEFAULT_SYNC_MAX_CONCURRENT_SERVERS: usize = 4;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_SECRET_KEY: &str = "SECRET_KEY";
pub const ENV_JWT_ALGORITHM: &str = "JWT_ALGORITHM";
pub const ENV_ACCESS_TOKEN_EXPIRE_MINUTES: &str = "ACCESS_TOKEN_EXPIRE_MINUTES";
