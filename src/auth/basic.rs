//! 管理接口的 HTTP Basic 认证

use crate::{config::SecurityConfig, error::AppError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose, Engine as _};
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;

/// 管理员凭据；未配置密码时拒绝所有请求
pub struct AdminCredentials {
    login: String,
    password: Option<Secret<String>>,
}

impl AdminCredentials {
    pub fn new(login: &str, password: Option<Secret<String>>) -> Self {
        Self {
            login: login.to_string(),
            password,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(&security.admin_login, security.admin_password.clone())
    }

    pub fn verify(&self, headers: &HeaderMap) -> bool {
        let Some(password) = &self.password else {
            return false;
        };
        let Some((login, given)) = extract_basic(headers) else {
            return false;
        };

        same_bytes(login.as_bytes(), self.login.as_bytes())
            & same_bytes(given.as_bytes(), password.expose_secret().as_bytes())
    }
}

/// 解析 `Authorization: Basic base64(login:password)`
pub fn extract_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (login, password) = decoded.split_once(':')?;

    Some((login.to_string(), password.to_string()))
}

// 逐字节比较，不提前返回
fn same_bytes(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// 管理员认证中间件
pub async fn admin_auth_middleware(
    State(credentials): State<Arc<AdminCredentials>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !credentials.verify(req.headers()) {
        return Err(AppError::authentication("Admin credentials required"));
    }

    Ok(next.run(req).await)
}
