//! API 集成测试
//!
//! 通过路由测试认证与设备端点（内存存储）

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use blog_platform::routes::create_router;
use common::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "198.51.100.7")
        .header(header::USER_AGENT, "api-test")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn cookie_request(method: Method, uri: &str, refresh_token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("refreshToken={}", refresh_token))
        .body(Body::empty())
        .unwrap()
}

fn bearer_request(method: Method, uri: &str, access_token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("missing Set-Cookie")
        .to_str()
        .unwrap()
        .to_string()
}

fn refresh_token_from(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("refreshToken="))
        .unwrap()
        .to_string()
}

struct LoggedIn {
    access_token: String,
    refresh_token: String,
}

async fn login(app: &Router, login: &str, password: &str, user_agent: &str) -> LoggedIn {
    let mut request = json_request(
        Method::POST,
        "/api/auth/login",
        json!({"login": login, "password": password}),
    );
    request
        .headers_mut()
        .insert(header::USER_AGENT, user_agent.parse().unwrap());

    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let refresh_token = refresh_token_from(&set_cookie(&response));
    let body = body_json(response).await;

    LoggedIn {
        access_token: body["accessToken"].as_str().unwrap().to_string(),
        refresh_token,
    }
}

#[tokio::test]
async fn test_register_confirm_login_refresh_logout() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/registration",
            json!({"login": "alice", "password": "secret1", "email": "alice@example.com"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let code = ctx.emails.last_code("confirmation", "alice@example.com").await.unwrap();
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/registration-confirmation",
            json!({"code": code}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // 登录：cookie 的 Max-Age 与刷新令牌有效期一致
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            json!({"login": "alice", "password": "secret1"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response);
    assert!(cookie.contains("Max-Age=20"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Secure"));
    let first_refresh = refresh_token_from(&cookie);
    let body = body_json(response).await;
    assert!(body["accessToken"].is_string());

    let device_id = ctx
        .state
        .jwt_service
        .verify(&first_refresh)
        .unwrap()
        .device_id
        .unwrap();

    // 刷新：同一设备
    let response = send(
        &app,
        cookie_request(Method::POST, "/api/auth/refresh-token", &first_refresh),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second_refresh = refresh_token_from(&set_cookie(&response));
    assert_eq!(
        ctx.state.jwt_service.verify(&second_refresh).unwrap().device_id,
        Some(device_id)
    );

    // 登出：cookie 被清除
    let response = send(
        &app,
        cookie_request(Method::POST, "/api/auth/logout", &second_refresh),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(set_cookie(&response).contains("Max-Age=0"));

    // 登出后旧 cookie 无法刷新
    let response = send(
        &app,
        cookie_request(Method::POST, "/api/auth/refresh-token", &first_refresh),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response).contains("Max-Age=0"));
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Session not found");
}

#[tokio::test]
async fn test_login_failure_is_generic() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());
    create_confirmed_user(&ctx, "alice", "secret1").await;

    for (login, password) in [("alice", "wrong-pass"), ("nobody", "secret1")] {
        let response = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/login",
                json!({"login": login, "password": password}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Authentication failed");
    }
}

#[tokio::test]
async fn test_refresh_and_logout_without_cookie() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());

    for uri in ["/api/auth/refresh-token", "/api/auth/logout"] {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Refresh token not provided");
    }
}

#[tokio::test]
async fn test_logout_with_garbage_cookie_still_clears_it() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());

    let response = send(
        &app,
        cookie_request(Method::POST, "/api/auth/logout", "garbage"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(set_cookie(&response).contains("Max-Age=0"));
}

#[tokio::test]
async fn test_me_requires_bearer_token() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());
    let user = create_confirmed_user(&ctx, "alice", "secret1").await;
    let session = login(&app, "alice", "secret1", "ua").await;

    let response = send(&app, bearer_request(Method::GET, "/api/auth/me", &session.access_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"email": "alice@example.com", "login": "alice", "userId": user.id})
    );

    let response = send(
        &app,
        Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // 刷新令牌不能当作访问令牌使用
    let response = send(&app, bearer_request(Method::GET, "/api/auth/me", &session.refresh_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_devices_listing_and_termination() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());
    create_confirmed_user(&ctx, "alice", "secret1").await;
    let first = login(&app, "alice", "secret1", "laptop").await;
    login(&app, "alice", "secret1", "phone").await;
    login(&app, "alice", "secret1", "tablet").await;

    let response = send(
        &app,
        bearer_request(Method::GET, "/api/security/devices", &first.access_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let devices = body_json(response).await;
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 3);
    for device in devices {
        assert_eq!(device["ip"], "198.51.100.7");
        assert!(device["title"].is_string());
        assert!(device["lastActiveDate"].is_string());
        assert!(device["deviceId"].is_string());
    }

    // 终止其他设备：需要访问令牌 + 当前设备的 cookie
    let mut request = bearer_request(Method::DELETE, "/api/security/devices", &first.access_token);
    request.headers_mut().insert(
        header::COOKIE,
        format!("refreshToken={}", first.refresh_token).parse().unwrap(),
    );
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        bearer_request(Method::GET, "/api/security/devices", &first.access_token),
    )
    .await;
    let devices = body_json(response).await;
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["title"], "laptop");
}

#[tokio::test]
async fn test_delete_device_of_another_user_is_not_found() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());
    create_confirmed_user(&ctx, "alice", "secret1").await;
    create_confirmed_user(&ctx, "bob", "secret2").await;
    let alice = login(&app, "alice", "secret1", "ua").await;
    let bob = login(&app, "bob", "secret2", "ua").await;
    let bob_device = ctx
        .state
        .jwt_service
        .verify(&bob.refresh_token)
        .unwrap()
        .device_id
        .unwrap();

    let uri = format!("/api/security/devices/{}", bob_device);
    let response = send(&app, bearer_request(Method::DELETE, &uri, &alice.access_token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, bearer_request(Method::DELETE, &uri, &bob.access_token)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        cookie_request(Method::POST, "/api/auth/refresh-token", &bob.refresh_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_validation_errors() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/registration",
            json!({"login": "x", "password": "123", "email": "not-an-email"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let fields: Vec<&str> = body["error"]["errorsMessages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["login", "password", "email"]);
}

#[tokio::test]
async fn test_reused_confirmation_code_is_rejected() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());
    ctx.state
        .user_service
        .register(registration("alice", "secret1", "alice@example.com"))
        .await
        .unwrap();
    let code = ctx.emails.last_code("confirmation", "alice@example.com").await.unwrap();

    let confirm = || {
        json_request(
            Method::POST,
            "/api/auth/registration-confirmation",
            json!({"code": code}),
        )
    };
    assert_eq!(send(&app, confirm()).await.status(), StatusCode::NO_CONTENT);

    let response = send(&app, confirm()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["errorsMessages"][0]["field"], "code");
}

#[tokio::test]
async fn test_password_recovery_endpoints() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());
    create_confirmed_user(&ctx, "alice", "secret1").await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/password-recovery",
            json!({"email": "alice@example.com"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let code = ctx.emails.last_code("recovery", "alice@example.com").await.unwrap();

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/new-password",
            json!({"newPassword": "brandnew", "recoveryCode": code}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    login(&app, "alice", "brandnew", "ua").await;
}

#[tokio::test]
async fn test_testing_route_wipes_data() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());
    create_confirmed_user(&ctx, "alice", "secret1").await;

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/testing/all-data")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            json!({"login": "alice", "password": "secret1"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_testing_route_hidden_by_default() {
    let ctx = create_test_context_with(|config| config.server.expose_testing_routes = false);
    let app = create_router(ctx.state.clone());

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/testing/all-data")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = create_test_context();
    let app = create_router(ctx.state.clone());

    let response = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");

    let response = send(&app, Request::builder().uri("/ready").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ready"], true);
}
