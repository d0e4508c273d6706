//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 认证 / 会话生命周期错误，全部映射为 401
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("Refresh token expired")]
    TokenExpired,

    #[error("Invalid refresh token")]
    TokenInvalid,

    #[error("Invalid refresh token payload")]
    InvalidPayload,

    #[error("Session not found")]
    SessionNotFound,

    #[error("User not found")]
    UserNotFound,
}

/// 注册确认 / 密码找回错误，全部映射为 400 并带字段名
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmationError {
    #[error("Invalid confirmation code")]
    InvalidCode { field: &'static str },

    #[error("User already confirmed")]
    AlreadyConfirmed { field: &'static str },

    #[error("Confirmation code expired")]
    CodeExpired { field: &'static str },

    #[error("Such user not found")]
    UserNotFound { field: &'static str },
}

impl ConfirmationError {
    /// 出错的请求字段
    pub fn field(&self) -> &'static str {
        match self {
            ConfirmationError::InvalidCode { field }
            | ConfirmationError::AlreadyConfirmed { field }
            | ConfirmationError::CodeExpired { field }
            | ConfirmationError::UserNotFound { field } => field,
        }
    }
}

/// 单个字段的校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub field: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: field.to_string(),
        }
    }
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Authentication(_) | AppError::Auth(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Confirmation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Authentication failed".to_string(),
            AppError::Authentication(msg) => msg.clone(),
            // 登录失败统一文案，不暴露账号是否存在
            AppError::Auth(AuthError::InvalidCredentials) => "Authentication failed".to_string(),
            AppError::Auth(e) => e.to_string(),
            AppError::Confirmation(e) => e.to_string(),
            AppError::NotFound(msg) => format!("Resource not found: {}", msg),
            AppError::Validation(_) => "Validation failed".to_string(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// 字段级错误（校验失败、确认码错误）
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            AppError::Validation(errors) => errors.clone(),
            AppError::Confirmation(e) => vec![FieldError::new(e.field(), e.to_string())],
            _ => Vec::new(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    // 便捷方法
    pub fn not_found(msg: &str) -> Self {
        AppError::NotFound(msg.to_string())
    }

    pub fn validation(field: &str, msg: &str) -> Self {
        AppError::Validation(vec![FieldError::new(field, msg)])
    }

    pub fn authentication(msg: &str) -> Self {
        AppError::Authentication(msg.to_string())
    }

    pub fn internal_error(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
    #[serde(rename = "errorsMessages", skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.user_message(),
                request_id,
                fields: self.field_errors(),
            },
        };

        // 记录错误日志
        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Application error"
            );
        } else {
            tracing::warn!(
                code = self.code(),
                message = %self,
                request_id = %error_response.error.request_id,
                "Request rejected"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::Unauthorized.code(), 401);
        assert_eq!(AppError::NotFound("test".to_string()).code(), 404);
        assert_eq!(AppError::validation("login", "test").code(), 400);
        assert_eq!(AppError::Auth(AuthError::SessionNotFound).code(), 401);
        assert_eq!(AppError::Auth(AuthError::TokenExpired).code(), 401);
        assert_eq!(
            AppError::Confirmation(ConfirmationError::CodeExpired { field: "code" }).code(),
            400
        );
    }

    #[test]
    fn test_user_message_no_sensitive_info() {
        let error = AppError::Database(sqlx::Error::RowNotFound);
        let message = error.user_message();
        assert_eq!(message, "Database error occurred");
        assert!(!message.contains("sqlx"));
    }

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        let error = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(error.user_message(), AppError::Unauthorized.user_message());
    }

    #[test]
    fn test_confirmation_error_carries_field() {
        let error = AppError::from(ConfirmationError::AlreadyConfirmed { field: "email" });
        let fields = error.field_errors();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, "email");
        assert_eq!(fields[0].message, "User already confirmed");
    }
}
