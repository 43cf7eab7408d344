// tests/auth_api.rs

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use common::{MANAGER, PASSWORD, TestApp};

#[tokio::test]
async fn login_returns_profile_and_token_pair() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "employeeId": "1001", "password": PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["employeeId"], "1001");
    assert_eq!(body["user"]["roleCode"], 1);
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(*app.workers.logins.lock().unwrap(), vec![MANAGER]);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = TestApp::new();

    let (unknown_status, _, unknown_body) = app
        .send(
            Method::POST,
            "/workers/login",
            None,
            Some(json!({ "employeeId": "9999", "password": PASSWORD })),
        )
        .await;
    let (wrong_status, _, wrong_body) = app
        .send(
            Method::POST,
            "/workers/login",
            None,
            Some(json!({ "employeeId": "1001", "password": "not-the-password" })),
        )
        .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_body, wrong_body);
    assert_eq!(unknown_body["success"], false);
}

#[tokio::test]
async fn login_requires_both_fields() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(Method::POST, "/auth/login", None, Some(json!({ "employeeId": "1001" })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["details"]["password"].is_array());
}

#[tokio::test]
async fn protected_routes_distinguish_missing_and_bad_tokens() {
    let app = TestApp::new();

    let (status, _, body) = app.send(Method::GET, "/workers/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access token required");

    let (status, _, _) = app
        .send(Method::GET, "/workers/me", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A refresh token is not an access token
    let refresh = app.session(MANAGER).refresh_token;
    let (status, _, _) = app.send(Method::GET, "/programs", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn me_returns_the_current_worker() {
    let app = TestApp::new();

    let (status, body) = app.get("/workers/me", MANAGER).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], MANAGER);
}

#[tokio::test]
async fn refresh_without_token_is_unauthorized() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(Method::POST, "/auth/refresh", None, Some(json!({})))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Refresh token required");
}

#[tokio::test]
async fn logout_always_succeeds_and_revokes_the_refresh_token() {
    let app = TestApp::new();

    let (status, _, body) = app.send(Method::POST, "/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let refresh = app.session(MANAGER).refresh_token;
    let (status, _, _) = app
        .send(
            Method::POST,
            "/workers/logout",
            None,
            Some(json!({ "refreshToken": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app
        .send(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refreshToken": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn correlation_id_is_echoed_or_minted() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/workers/me")
        .header("x-correlation-id", "trace-42")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-correlation-id"], "trace-42");

    let (_, headers, _) = app.send(Method::GET, "/nowhere", None, None).await;
    assert!(headers.contains_key("x-correlation-id"));
}

#[tokio::test]
async fn unknown_routes_get_the_json_fallback() {
    let app = TestApp::new();

    let (status, _, body) = app.send(Method::GET, "/nowhere", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["path"], "/nowhere");
}

#[tokio::test]
async fn requests_over_the_limit_are_throttled() {
    let app = TestApp::with_rate_limit(2);

    for _ in 0..2 {
        let (status, _, _) = app.send(Method::GET, "/nowhere", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, _, body) = app.send(Method::GET, "/nowhere", None, None).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
}
