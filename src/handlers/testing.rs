//! 测试辅助路由（仅在 server.expose_testing_routes 打开时注册）

use crate::{error::AppError, middleware::AppState};
use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

/// 清空所有用户与会话
pub async fn delete_all_data(State(state): State<Arc<AppState>>) -> Result<StatusCode, AppError> {
    state.user_service.reset_all().await?;
    Ok(StatusCode::NO_CONTENT)
}
