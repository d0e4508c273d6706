//! 设备会话管理处理器

use crate::{
    auth::{cookies::extract_refresh_token, middleware::AuthContext},
    error::AppError,
    middleware::AppState,
    models::session::DeviceView,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

/// 列出当前用户的所有设备
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<Json<Vec<DeviceView>>, AppError> {
    let sessions = state
        .session_service
        .list_for_user(auth_context.user_id)
        .await?;

    Ok(Json(sessions.into_iter().map(DeviceView::from).collect()))
}

/// 终止除当前设备外的所有会话（当前设备由 refreshToken cookie 确定）
pub async fn delete_other_devices(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = extract_refresh_token(&headers)
        .ok_or_else(|| AppError::authentication("Refresh token not provided"))?;

    let device_id = state
        .auth_service
        .current_device(auth_context.user_id, &token)
        .await?;

    state
        .session_service
        .delete_all_other_sessions(auth_context.user_id, &device_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// 终止指定设备
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(device_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .session_service
        .delete_specific_session(auth_context.user_id, &device_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
