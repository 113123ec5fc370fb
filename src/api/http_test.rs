use super::*;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use serde_json::json;

// =============================================================================
// Test server
// =============================================================================

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/")
}

fn timeouts() -> Timeouts {
    Timeouts { request_secs: 5, connect_secs: 2 }
}

async fn student_login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let nim = body.get("nim").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    if nim == "2201001" && password == "secret" {
        (
            StatusCode::OK,
            Json(json!({ "status": "success", "token": "tok-1", "message": "ok", "data": { "nim": nim } })),
        )
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "status": "error", "message": "bad credentials" })))
    }
}

async fn admin_login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let username = body.get("username").and_then(Value::as_str).unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "token": "admin-tok", "data": { "username": username } })),
    )
}

async fn check_delay(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "waiting", "data": { "remaining_seconds": 7, "echo": id } })),
    )
}

async fn profile(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth == "Bearer tok-1" {
        (StatusCode::OK, Json(json!({ "status": "success", "data": { "nim": "2201001" } })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "token invalid" })))
    }
}

async fn logout(headers: HeaderMap) -> StatusCode {
    if headers.contains_key("authorization") {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

fn app() -> Router {
    Router::new()
        .route("/api/auth/login", post(student_login))
        .route("/api/auth-admin/login", post(admin_login))
        .route("/api/auth/login/check-delay/{id}", get(check_delay))
        .route("/api/auth/profile", get(profile))
        .route("/api/auth/logout", post(logout))
}

// =============================================================================
// HttpAuthApi
// =============================================================================

#[test]
fn new_trims_trailing_slash() {
    let api = HttpAuthApi::new("http://example.test/api///", timeouts()).unwrap();
    assert_eq!(api.base_url(), "http://example.test/api");
}

#[test]
fn login_body_uses_role_identifier_field() {
    let student = login_body(Role::Student, "2201001", "pw");
    assert_eq!(student, json!({ "nim": "2201001", "password": "pw" }));
    let admin = login_body(Role::Admin, "root", "pw");
    assert_eq!(admin, json!({ "username": "root", "password": "pw" }));
}

#[test]
fn check_delay_url_escapes_token() {
    let api = HttpAuthApi::new("http://example.test/api", timeouts()).unwrap();
    let url = api.check_delay_url("a/b c").unwrap();
    assert_eq!(url.as_str(), "http://example.test/api/auth/login/check-delay/a%2Fb%20c");
}

#[tokio::test]
async fn login_returns_status_and_body() {
    let base = spawn_server(app()).await;
    let api = HttpAuthApi::new(base, timeouts()).unwrap();

    let ok = api.login(Role::Student, "2201001", "secret").await.unwrap();
    assert_eq!(ok.status, 200);
    assert!(ok.body.contains("tok-1"));

    let bad = api.login(Role::Student, "2201001", "wrong").await.unwrap();
    assert_eq!(bad.status, 401);
    assert!(bad.body.contains("bad credentials"));
}

#[tokio::test]
async fn admin_login_posts_username() {
    let base = spawn_server(app()).await;
    let api = HttpAuthApi::new(base, timeouts()).unwrap();

    let raw = api.login(Role::Admin, "root", "pw").await.unwrap();
    assert_eq!(raw.status, 200);
    assert!(raw.body.contains("\"username\":\"root\""));
}

#[tokio::test]
async fn check_delay_hits_token_path() {
    let base = spawn_server(app()).await;
    let api = HttpAuthApi::new(base, timeouts()).unwrap();

    let raw = api.check_delay("42").await.unwrap();
    assert_eq!(raw.status, 202);
    let body: Value = serde_json::from_str(&raw.body).unwrap();
    assert_eq!(body["data"]["echo"], "42");
    assert_eq!(body["data"]["remaining_seconds"], 7);
}

#[tokio::test]
async fn profile_sends_bearer_token() {
    let base = spawn_server(app()).await;
    let api = HttpAuthApi::new(base, timeouts()).unwrap();

    assert_eq!(api.profile(Role::Student, "tok-1").await.unwrap().status, 200);
    assert_eq!(api.profile(Role::Student, "stale").await.unwrap().status, 401);
}

#[tokio::test]
async fn logout_sends_bearer_token() {
    let base = spawn_server(app()).await;
    let api = HttpAuthApi::new(base, timeouts()).unwrap();

    let raw = api.logout(Role::Student, "tok-1").await.unwrap();
    assert!(raw.is_success());
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpAuthApi::new(format!("http://{addr}/api"), timeouts()).unwrap();
    let err = api.login(Role::Student, "2201001", "secret").await.unwrap_err();
    assert!(matches!(err, AuthError::Transport(_)), "unexpected error: {err:?}");
    assert_eq!(err.error_code(), "E_TRANSPORT");
}
