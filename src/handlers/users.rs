//! 用户管理处理器（管理员 Basic 认证）

use crate::{
    error::AppError,
    middleware::AppState,
    models::{
        auth::RegistrationRequest,
        user::{Paginated, UserView, UsersQuery, UsersQueryParams},
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// 分页列出用户
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UsersQueryParams>,
) -> Result<Json<Paginated<UserView>>, AppError> {
    let query = UsersQuery::from(params);
    Ok(Json(state.user_service.list_users(&query).await?))
}

/// 创建已确认用户
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let user = state.user_service.create_by_admin(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// 按 id 软删除用户
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user_id =
        Uuid::parse_str(&id).map_err(|_| AppError::validation("id", "id is not a valid user id"))?;

    state.user_service.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
