mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::*;
use flussonic_manager::config::Config;
use flussonic_manager::database::Database;
use flussonic_manager::models::{TrafficSample, UsageRecord};
use flussonic_manager::repositories::{QueryParams, SqliteUsageStore, UsageStore, UsageUnit};
use flussonic_manager::utils::time::canonical_timestamp;
use flussonic_manager::web::{AppState, WebServer};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestApp {
    app: Router,
    state: AppState,
    db: Database,
}

async fn setup() -> TestApp {
    let db = test_database().await;
    let mut config = Config::default();
    config.auth.secret_key = Some("test-secret".to_string());
    config.upstream.request_timeout = "2s".to_string();

    let state = AppState::new(db.clone(), &config).unwrap();
    state.users.create("admin", "admin-pw", true).await.unwrap();
    state.users.create("viewer", "viewer-pw", false).await.unwrap();

    TestApp {
        app: WebServer::create_router(state.clone()),
        state,
        db,
    }
}

// Helper function to send requests to the app
async fn send_request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request_builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request_builder = request_builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = if let Some(body) = body {
        request_builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["token_type"], "bearer");
    json["access_token"].as_str().unwrap().to_string()
}

async fn bind(state: &AppState, username: &str, server_id: i64, stream: &str) {
    let (users, _) = state
        .users
        .list(QueryParams::new())
        .await
        .unwrap();
    let user = users.iter().find(|u| u.username == username).unwrap();
    state.users.assign_stream(user.id, server_id, stream).await.unwrap();
}

#[tokio::test]
async fn test_health() {
    let test = setup().await;
    let (status, body) = send_request(&test.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_token_issuance() {
    let test = setup().await;
    login(&test.app, "viewer", "viewer-pw").await;

    let (status, body) = send_request(
        &test.app,
        Method::POST,
        "/api/auth/token",
        None,
        Some(json!({"username": "admin", "password": "admin-pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    let (status, body) = send_request(
        &test.app,
        Method::POST,
        "/api/auth/token",
        None,
        Some(json!({"username": "admin", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_authentication_required() {
    let test = setup().await;
    let (status, _) =
        send_request(&test.app, Method::GET, "/api/client/streams", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_request(
        &test.app,
        Method::GET,
        "/api/client/streams",
        Some("not-a-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_clients() {
    let test = setup().await;
    let token = login(&test.app, "viewer", "viewer-pw").await;
    for (method, uri) in [
        (Method::GET, "/api/admin/servers"),
        (Method::GET, "/api/admin/users"),
        (Method::POST, "/api/admin/sync"),
    ] {
        let (status, _) = send_request(&test.app, method, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn test_unbound_stream_is_forbidden_everywhere() {
    let test = setup().await;
    let upstream = MockServer::start().await;
    // cam1 exists upstream; the caller must still not learn that
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(media_listing(&[("cam1", &["rtmp://a"])])),
        )
        .expect(0)
        .mount(&upstream)
        .await;
    forbid_writes(&upstream).await;
    register_server(&test.db, "edge", &upstream.uri()).await;

    let token = login(&test.app, "viewer", "viewer-pw").await;
    let push = Some(json!({"url": "rtmp://b"}));
    for stream in ["cam1", "does-not-exist"] {
        let cases = [
            (
                Method::GET,
                format!("/api/client/streams/{stream}/traffic?start_date=2023-11-14&end_date=2023-11-15"),
                None,
            ),
            (Method::GET, format!("/api/client/streams/{stream}/pushes"), None),
            (Method::POST, format!("/api/client/streams/{stream}/pushes"), push.clone()),
            (Method::DELETE, format!("/api/client/streams/{stream}/pushes"), push.clone()),
        ];
        for (method, uri, body) in cases {
            let (status, json) = send_request(&test.app, method, &uri, Some(&token), body).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(json["error"], "You do not have access to this stream.");
        }
    }
}

#[tokio::test]
async fn test_push_management_for_bound_stream() {
    let test = setup().await;
    let upstream = MockServer::start().await;
    mount_media(&upstream, media_listing(&[("cam1", &["rtmp://a"])])).await;
    Mock::given(method("POST"))
        .and(path("/flussonic/api/save_stream/cam1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&upstream)
        .await;
    let server = register_server(&test.db, "edge", &upstream.uri()).await;
    bind(&test.state, "viewer", server.id, "cam1").await;
    let token = login(&test.app, "viewer", "viewer-pw").await;

    let (status, body) = send_request(
        &test.app,
        Method::GET,
        "/api/client/streams/cam1/pushes",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([{"url": "rtmp://a"}]));

    // Duplicate and missing URLs are rejected before any write
    let (status, _) = send_request(
        &test.app,
        Method::POST,
        "/api/client/streams/cam1/pushes",
        Some(&token),
        Some(json!({"url": "rtmp://a"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send_request(
        &test.app,
        Method::DELETE,
        "/api/client/streams/cam1/pushes",
        Some(&token),
        Some(json!({"url": "rtmp://missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_request(
        &test.app,
        Method::POST,
        "/api/client/streams/cam1/pushes",
        Some(&token),
        Some(json!({"url": "rtmp://b"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"], json!([{"url": "rtmp://a"}, {"url": "rtmp://b"}]));
}

#[tokio::test]
async fn test_ambiguous_stream_needs_server_id() {
    let test = setup().await;
    let mut upstreams = Vec::new();
    for name in ["a", "b"] {
        let upstream = MockServer::start().await;
        mount_media(&upstream, media_listing(&[("cam1", &[])])).await;
        let server = register_server(&test.db, name, &upstream.uri()).await;
        bind(&test.state, "viewer", server.id, "cam1").await;
        upstreams.push((server, upstream));
    }
    let token = login(&test.app, "viewer", "viewer-pw").await;

    let (status, _) = send_request(
        &test.app,
        Method::GET,
        "/api/client/streams/cam1/pushes",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/client/streams/cam1/pushes?server_id={}", upstreams[1].0.id);
    let (status, body) = send_request(&test.app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, body) =
        send_request(&test.app, Method::GET, "/api/client/streams", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_traffic_is_aggregated_per_day() {
    let test = setup().await;
    let upstream = MockServer::start().await;
    let server = register_server(&test.db, "edge", &upstream.uri()).await;
    bind(&test.state, "viewer", server.id, "cam1").await;

    let store = SqliteUsageStore::new(test.db.pool());
    let mut unit = store.begin_unit().await.unwrap();
    for sample in [
        TrafficSample { timestamp_ms: 1_700_000_000_000, bytes: 100 },
        TrafficSample { timestamp_ms: 1_700_003_600_000, bytes: 50 },
        TrafficSample { timestamp_ms: 1_700_007_200_000, bytes: 7 },
    ] {
        unit.insert(&UsageRecord {
            server_id: server.id,
            stream_name: "cam1".to_string(),
            recorded_at: canonical_timestamp(sample.timestamp_ms).unwrap(),
            bytes_used: sample.bytes,
        })
        .await
        .unwrap();
    }
    unit.commit().await.unwrap();

    let token = login(&test.app, "viewer", "viewer-pw").await;
    let (status, body) = send_request(
        &test.app,
        Method::GET,
        "/api/client/streams/cam1/traffic?start_date=2023-11-14&end_date=2023-11-15",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            {"date": "2023-11-14", "bytes_used": 150},
            {"date": "2023-11-15", "bytes_used": 7}
        ])
    );

    let (status, _) = send_request(
        &test.app,
        Method::GET,
        "/api/client/streams/cam1/traffic?start_date=2023-11-16&end_date=2023-11-15",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_server_registration() {
    let test = setup().await;
    let token = login(&test.app, "admin", "admin-pw").await;

    let (status, _) = send_request(
        &test.app,
        Method::POST,
        "/api/admin/servers",
        Some(&token),
        Some(json!({"name": "x", "url": "edge.local:8080", "username": "u", "password": "p"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let rejecting = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&rejecting)
        .await;
    let (status, _) = send_request(
        &test.app,
        Method::POST,
        "/api/admin/servers",
        Some(&token),
        Some(json!({"name": "x", "url": rejecting.uri(), "username": "u", "password": "bad"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let upstream = MockServer::start().await;
    mount_media(&upstream, media_listing(&[("cam1", &[])])).await;
    let request = json!({
        "name": "edge",
        "url": format!("{}/", upstream.uri()),
        "username": UPSTREAM_USER,
        "password": UPSTREAM_PASSWORD
    });
    let (status, body) = send_request(
        &test.app,
        Method::POST,
        "/api/admin/servers",
        Some(&token),
        Some(request.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["url"], upstream.uri());
    assert!(body["data"].get("password").is_none());
    let server_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = send_request(
        &test.app,
        Method::POST,
        "/api/admin/servers",
        Some(&token),
        Some(request),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) =
        send_request(&test.app, Method::GET, "/api/admin/servers?page=1&limit=10", Some(&token), None)
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let uri = format!("/api/admin/servers/{server_id}/streams");
    let (status, body) = send_request(&test.app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "cam1");

    let (status, _) =
        send_request(&test.app, Method::GET, "/api/admin/servers/999/streams", Some(&token), None)
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_and_binding_management() {
    let test = setup().await;
    let token = login(&test.app, "admin", "admin-pw").await;
    let upstream = MockServer::start().await;
    let server = register_server(&test.db, "edge", &upstream.uri()).await;

    let (status, body) = send_request(
        &test.app,
        Method::POST,
        "/api/admin/users",
        Some(&token),
        Some(json!({"username": "carol", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["is_admin"], false);
    assert!(body["data"].get("password_hash").is_none());
    let user_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = send_request(
        &test.app,
        Method::POST,
        "/api/admin/users",
        Some(&token),
        Some(json!({"username": "carol", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/admin/users/{user_id}/streams");
    let binding = json!({"server_id": server.id, "stream_name": "cam1"});
    let (status, _) =
        send_request(&test.app, Method::POST, &uri, Some(&token), Some(binding.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) =
        send_request(&test.app, Method::POST, &uri, Some(&token), Some(binding.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send_request(&test.app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["stream_name"], "cam1");

    let (status, _) =
        send_request(&test.app, Method::DELETE, &uri, Some(&token), Some(binding.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) =
        send_request(&test.app, Method::DELETE, &uri, Some(&token), Some(binding)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_request(
        &test.app,
        Method::POST,
        "/api/admin/users/999/streams",
        Some(&token),
        Some(json!({"server_id": server.id, "stream_name": "cam1"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_sync_and_last_report() {
    let test = setup().await;
    let token = login(&test.app, "admin", "admin-pw").await;

    let (status, _) =
        send_request(&test.app, Method::GET, "/api/admin/sync/last", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let upstream = MockServer::start().await;
    mount_media(&upstream, media_listing(&[("cam1", &[])])).await;
    mount_traffic(&upstream, json!({"cam1": [[1700000000000i64, 10]]})).await;
    register_server(&test.db, "edge", &upstream.uri()).await;

    let (status, body) =
        send_request(&test.app, Method::POST, "/api/admin/sync", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["trigger"], "manual");
    assert_eq!(body["data"]["servers"][0]["status"], "synced");
    assert_eq!(body["data"]["servers"][0]["inserted"], 1);

    let (status, body) =
        send_request(&test.app, Method::GET, "/api/admin/sync/last", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["servers"][0]["server_name"], "edge");
}

#[tokio::test]
async fn test_malformed_requests_still_pass_the_gate_first() {
    let test = setup().await;
    let upstream = MockServer::start().await;
    forbid_writes(&upstream).await;
    let server = register_server(&test.db, "edge", &upstream.uri()).await;
    bind(&test.state, "viewer", server.id, "cam1").await;
    let token = login(&test.app, "viewer", "viewer-pw").await;

    let cases = [
        (Method::GET, "traffic"),
        (Method::GET, "traffic?start_date=yesterday&end_date=2023-11-15"),
        (Method::GET, "pushes?server_id=abc"),
        (Method::POST, "pushes"),
        (Method::DELETE, "pushes"),
    ];

    // Unbound stream: always the 403 envelope, never a parse error
    for (method, suffix) in cases.clone() {
        let uri = format!("/api/client/streams/cam2/{suffix}");
        let (status, json) = send_request(&test.app, method, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(json["error"], "You do not have access to this stream.");
    }

    // Bound stream: a validation error in the standard envelope
    for (method, suffix) in cases {
        let uri = format!("/api/client/streams/cam1/{suffix}");
        let (status, json) = send_request(&test.app, method, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }

    let (status, _) = send_request(
        &test.app,
        Method::POST,
        "/api/client/streams/cam1/pushes",
        Some(&token),
        Some(json!({"address": "rtmp://b"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
