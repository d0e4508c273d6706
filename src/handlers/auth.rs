//! 认证相关的 HTTP 处理器

use crate::{
    auth::{
        cookies::{clear_refresh_cookie, extract_refresh_token, refresh_cookie},
        jwt::TokenPair,
        middleware::AuthContext,
    },
    error::AppError,
    middleware::{AppState, ClientInfo},
    models::{
        auth::*,
        user::{MeOrDefaultView, MeView},
    },
    services::LogoutOutcome,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// 注册
pub async fn registration(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegistrationRequest>,
) -> Result<StatusCode, AppError> {
    state.user_service.register(req).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 注册确认
pub async fn registration_confirmation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmRegistrationRequest>,
) -> Result<StatusCode, AppError> {
    req.validate().map_err(AppError::Validation)?;

    state
        .auth_service
        .confirm_registration(req.code.trim())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 重新发送确认邮件
pub async fn registration_email_resending(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<StatusCode, AppError> {
    req.validate().map_err(AppError::Validation)?;

    state
        .auth_service
        .resend_confirmation(req.email.trim())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 密码找回
pub async fn password_recovery(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<StatusCode, AppError> {
    req.validate().map_err(AppError::Validation)?;

    state
        .auth_service
        .password_recovery(req.email.trim())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 设置新密码
pub async fn new_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewPasswordRequest>,
) -> Result<StatusCode, AppError> {
    req.validate().map_err(AppError::Validation)?;

    state
        .auth_service
        .new_password(req.new_password.trim(), req.recovery_code.trim())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 登录：访问令牌在响应体，刷新令牌在 cookie
pub async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let pair = state
        .auth_service
        .login(req.login.trim(), &req.password, &client.ip, &client.user_agent)
        .await?;

    token_response(&state, pair)
}

/// 刷新令牌；失败时同时清除 cookie
pub async fn refresh_token(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let secure = state.config.security.refresh_cookie_secure;

    let result = match extract_refresh_token(&headers) {
        Some(token) => state.auth_service.refresh_token(&token).await,
        None => Err(AppError::authentication("Refresh token not provided")),
    };

    match result.and_then(|pair| token_response(&state, pair)) {
        Ok(response) => response,
        Err(e) => with_cleared_cookie(e.into_response(), secure),
    }
}

/// 登出：无论结果如何都清除 cookie
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let secure = state.config.security.refresh_cookie_secure;

    let Some(token) = extract_refresh_token(&headers) else {
        return with_cleared_cookie(
            AppError::authentication("Refresh token not provided").into_response(),
            secure,
        );
    };

    let response = match state.auth_service.logout(&token).await {
        Ok(LogoutOutcome::TokenRejected(reason)) => {
            tracing::debug!(reason = %reason, "Logout token rejected");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    };

    with_cleared_cookie(response, secure)
}

/// 当前用户信息
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<Json<MeView>, AppError> {
    Ok(Json(state.user_service.me(auth_context.user_id).await?))
}

/// 当前用户信息；未携带有效访问令牌时返回匿名视图
pub async fn me_or_default(
    State(state): State<Arc<AppState>>,
    auth_context: Option<AuthContext>,
) -> Result<Json<MeOrDefaultView>, AppError> {
    let user_id = auth_context.map(|ctx| ctx.user_id);
    Ok(Json(state.user_service.me_or_default(user_id).await?))
}

fn token_response(state: &AppState, pair: TokenPair) -> Result<Response, AppError> {
    let cookie = refresh_cookie(
        &pair.refresh_token,
        state.jwt_service.refresh_ttl_secs(),
        state.config.security.refresh_cookie_secure,
    )
    .ok_or_else(|| AppError::internal_error("refresh token is not a valid cookie value"))?;

    let mut response = Json(AccessTokenResponse {
        access_token: pair.access_token,
    })
    .into_response();
    response.headers_mut().append(header::SET_COOKIE, cookie);

    Ok(response)
}

fn with_cleared_cookie(mut response: Response, secure: bool) -> Response {
    response
        .headers_mut()
        .append(header::SET_COOKIE, clear_refresh_cookie(secure));
    response
}
