//! HTTP 中间件与应用状态
//! 请求追踪、客户端信息提取

use crate::{
    auth::{jwt::JwtService, password::PasswordHasher},
    config::AppConfig,
    error::AppError,
    repository::{
        InMemorySessionRepository, InMemoryUserRepository, PgSessionRepository,
        PgUserRepository, SessionRepository, UserRepository,
    },
    services::{AuthService, EmailSender, SessionService, UserService},
};
use axum::{
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tracing::Instrument;
use uuid::Uuid;

/// 持久化后端
pub enum Storage {
    Postgres(PgPool),
    Memory,
}

/// 应用状态
///
/// 服务以 Arc 共享，Clone 只是指针拷贝
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// 内存模式下为 None
    pub db: Option<PgPool>,
    pub jwt_service: Arc<JwtService>,
    pub auth_service: Arc<AuthService>,
    pub session_service: Arc<SessionService>,
    pub user_service: Arc<UserService>,
}

impl AppState {
    /// 按存储后端组装所有服务
    pub fn new(
        config: AppConfig,
        storage: Storage,
        email_sender: Arc<dyn EmailSender>,
    ) -> Result<Self, AppError> {
        let (db, users, sessions): (
            Option<PgPool>,
            Arc<dyn UserRepository>,
            Arc<dyn SessionRepository>,
        ) = match storage {
            Storage::Postgres(pool) => (
                Some(pool.clone()),
                Arc::new(PgUserRepository::new(pool.clone())),
                Arc::new(PgSessionRepository::new(pool)),
            ),
            Storage::Memory => (
                None,
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemorySessionRepository::new()),
            ),
        };

        let jwt_service = Arc::new(JwtService::from_config(&config)?);
        let hasher = Arc::new(PasswordHasher::from_config(&config.security)?);
        let session_service = Arc::new(SessionService::new(sessions));

        let auth_service = Arc::new(AuthService::new(
            users.clone(),
            session_service.clone(),
            jwt_service.clone(),
            hasher.clone(),
            email_sender.clone(),
            &config.security,
        ));
        let user_service = Arc::new(UserService::new(
            users,
            session_service.clone(),
            hasher,
            email_sender,
            &config.security,
        ));

        Ok(Self {
            config,
            db,
            jwt_service,
            auth_service,
            session_service,
            user_service,
        })
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        // 指标标签使用静态字符串
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            413 => "413",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 客户端信息（会话的 ip 与 title）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

impl FromRequestParts<Arc<AppState>> for ClientInfo {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let socket_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(Self {
            ip: client_ip(&parts.headers, socket_ip, state.config.security.trust_proxy),
            user_agent: parts
                .headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .filter(|s| !s.is_empty())
                .unwrap_or("unknown")
                .to_string(),
        })
    }
}

/// 获取客户端 IP 地址
fn client_ip(headers: &HeaderMap, socket_ip: Option<String>, trust_proxy: bool) -> String {
    // 如果信任代理，从 X-Forwarded-For 获取
    if trust_proxy {
        if let Some(forwarded_for) = headers.get("x-forwarded-for") {
            if let Ok(forwarded_str) = forwarded_for.to_str() {
                // X-Forwarded-For 可能包含多个 IP，取第一个
                if let Some(first_ip) = forwarded_str.split(',').next() {
                    let first_ip = first_ip.trim();
                    if !first_ip.is_empty() {
                        return first_ip.to_string();
                    }
                }
            }
        }

        // 尝试 X-Real-IP
        if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
            return real_ip.trim().to_string();
        }
    }

    socket_ip.unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_or_generate_trace_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", "test-trace-123".parse().unwrap());

        let trace_id = extract_or_generate_trace_id(&headers);
        assert_eq!(trace_id, "test-trace-123");

        let headers = HeaderMap::new();
        let trace_id = extract_or_generate_trace_id(&headers);
        assert!(Uuid::parse_str(&trace_id).is_ok());
    }

    #[test]
    fn test_client_ip_from_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());

        assert_eq!(client_ip(&headers, None, true), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_ignores_headers_without_trust() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7".parse().unwrap());

        assert_eq!(
            client_ip(&headers, Some("127.0.0.1".to_string()), false),
            "127.0.0.1"
        );
        assert_eq!(client_ip(&headers, None, false), "unknown");
    }

    #[test]
    fn test_client_ip_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());

        assert_eq!(client_ip(&headers, None, true), "198.51.100.2");
    }
}
