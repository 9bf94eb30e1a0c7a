#![allow(dead_code)]

use flussonic_manager::database::Database;
use flussonic_manager::models::{Server, ServerCreateRequest};
use flussonic_manager::repositories::{Repository, ServerRepository};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_PREFIX: &str = "/flussonic/api";
pub const UPSTREAM_USER: &str = "flussonic";
pub const UPSTREAM_PASSWORD: &str = "letmein";

/// Fresh migrated in-memory database
pub async fn test_database() -> Database {
    let db = Database::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    db
}

pub async fn register_server(db: &Database, name: &str, url: &str) -> Server {
    ServerRepository::new(db.pool())
        .create(ServerCreateRequest {
            name: name.to_string(),
            url: url.to_string(),
            username: UPSTREAM_USER.to_string(),
            password: UPSTREAM_PASSWORD.to_string(),
        })
        .await
        .unwrap()
}

/// `{"streams": [...]}` body with one entry per `(name, pushes)` pair
pub fn media_listing(streams: &[(&str, &[&str])]) -> Value {
    let streams: Vec<Value> = streams
        .iter()
        .map(|(name, pushes)| {
            let pushes: Vec<Value> = pushes.iter().map(|url| json!({ "url": url })).collect();
            json!({
                "name": name,
                "config": { "pushes": pushes, "title": format!("{name} title") },
                "stats": { "alive": true }
            })
        })
        .collect();
    json!({ "streams": streams })
}

pub async fn mount_media(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/media")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_traffic(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/get_traffic_reports")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Fails the test on drop if anything is written upstream
pub async fn forbid_writes(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

pub async fn usage_rows(db: &Database) -> Vec<(i64, String, i64, i64)> {
    sqlx::query_as(
        "SELECT server_id, stream_name, recorded_at, bytes_used FROM traffic_usage
         ORDER BY server_id, stream_name, recorded_at",
    )
    .fetch_all(&db.pool())
    .await
    .unwrap()
}
