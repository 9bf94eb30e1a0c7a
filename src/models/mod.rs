use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use std::collections::BTreeMap;

/// A registered media server
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerCreateRequest {
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Password is hashed by the service layer before it reaches the repository
#[derive(Debug, Clone)]
pub struct UserCreateRequest {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Grants one user read access to one stream on one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StreamBinding {
    pub user_id: i64,
    pub server_id: i64,
    pub stream_name: String,
}

/// Exact de-duplication key of a usage fact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsageKey {
    pub server_id: i64,
    pub stream_name: String,
    /// Canonical epoch seconds (see `utils::time::canonical_timestamp`)
    pub recorded_at: i64,
}

/// One traffic fact as collected from the upstream report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    pub server_id: i64,
    pub stream_name: String,
    pub recorded_at: DateTime<Utc>,
    pub bytes_used: i64,
}

impl UsageRecord {
    pub fn key(&self) -> UsageKey {
        UsageKey {
            server_id: self.server_id,
            stream_name: self.stream_name.clone(),
            recorded_at: self.recorded_at.timestamp(),
        }
    }
}

/// Traffic aggregated per calendar day (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTraffic {
    pub date: NaiveDate,
    pub bytes_used: i64,
}

/// Editable stream configuration as held by the media server
pub type StreamConfig = Map<String, Value>;

/// One stream entry from the upstream media listing
///
/// Only `name` and `config` are interpreted; every other key is kept so the
/// admin listing returns what the server reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamStream {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: StreamConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaListing {
    #[serde(default)]
    pub streams: Vec<UpstreamStream>,
}

/// A `[timestamp_ms, bytes]` pair from the traffic report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrafficSample {
    pub timestamp_ms: i64,
    pub bytes: i64,
}

impl<'de> Deserialize<'de> for TrafficSample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values: Vec<Value> = Vec::deserialize(deserializer)?;
        if values.len() < 2 {
            return Err(de::Error::invalid_length(
                values.len(),
                &"a [timestamp_ms, bytes] pair",
            ));
        }
        let timestamp_ms = integral(&values[0])
            .ok_or_else(|| de::Error::custom("traffic timestamp is not an integer"))?;
        let bytes =
            integral(&values[1]).ok_or_else(|| de::Error::custom("traffic bytes is not a number"))?;
        Ok(Self {
            timestamp_ms,
            bytes,
        })
    }
}

/// Accept integers and integral floats (`1024` and `1024.0`)
fn integral(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}

/// Stream name -> ordered samples
pub type TrafficReport = BTreeMap<String, Vec<TrafficSample>>;

/// A push destination as exposed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushDestination {
    pub url: String,
}

/// A stream the caller is bound to, enriched with the server name
#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub name: String,
    pub server_id: i64,
    pub server_name: String,
}
