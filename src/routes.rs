//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{auth::AdminCredentials, handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 认证路由（无需访问令牌，刷新/登出依赖 refreshToken cookie）
    let auth_routes = Router::new()
        .route("/api/auth/registration", post(handlers::auth::registration))
        .route(
            "/api/auth/registration-confirmation",
            post(handlers::auth::registration_confirmation),
        )
        .route(
            "/api/auth/registration-email-resending",
            post(handlers::auth::registration_email_resending),
        )
        .route("/api/auth/password-recovery", post(handlers::auth::password_recovery))
        .route("/api/auth/new-password", post(handlers::auth::new_password))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh-token", post(handlers::auth::refresh_token))
        .route("/api/auth/logout", post(handlers::auth::logout));

    // 需要访问令牌的路由
    let authenticated_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/security/devices",
            get(handlers::security_devices::list_devices)
                .delete(handlers::security_devices::delete_other_devices),
        )
        .route(
            "/api/security/devices/{device_id}",
            delete(handlers::security_devices::delete_device),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 访问令牌可选的路由
    let optional_auth_routes = Router::new()
        .route("/api/auth/me-or-default", get(handlers::auth::me_or_default))
        .route_layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::optional_auth_middleware,
        ));

    // 管理员路由（Basic 认证）
    let admin_routes = Router::new()
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/api/users/{id}", delete(handlers::users::delete_user))
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::new(AdminCredentials::from_config(&state.config.security)),
            crate::auth::basic::admin_auth_middleware,
        ));

    let mut router = Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(authenticated_routes)
        .merge(optional_auth_routes)
        .merge(admin_routes);

    if state.config.server.expose_testing_routes {
        tracing::warn!("Testing routes enabled: DELETE /api/testing/all-data");
        router = router.route(
            "/api/testing/all-data",
            delete(handlers::testing::delete_all_data),
        );
    }

    router
        .layer(RequestBodyLimitLayer::new(state.config.server.body_limit_bytes))
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
