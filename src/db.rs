//! PostgreSQL 存储：连接池、迁移与就绪检查
//! 仅在 database.driver = postgres 时使用

use crate::config::DatabaseConfig;
use secrecy::ExposeSecret;
use sqlx::{migrate::MigrateError, postgres::PgPoolOptions, PgPool};
use std::time::{Duration, Instant};

/// 连接池参数
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
}

/// 日志里用的连接目标（去掉用户名和密码）
pub fn redacted_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let url = config.url.expose_secret();
    let target = redacted_url(url);

    let pool = pool_options(config).connect(url).await.map_err(|source| {
        tracing::error!(target_db = %target, error = %source, "Failed to connect to PostgreSQL");
        DbError::Connect { target: target.clone(), source }
    })?;

    tracing::info!(
        target_db = %target,
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "PostgreSQL pool ready"
    );

    Ok(pool)
}

/// 建立 users / sessions 表
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Schema migrations applied");
    Ok(())
}

/// 就绪检查，附带往返耗时
pub async fn health_check(pool: &PgPool) -> HealthStatus {
    let started = Instant::now();

    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => HealthStatus::Healthy {
            latency_ms: started.elapsed().as_millis() as u64,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database readiness check failed");
            HealthStatus::Unhealthy(e.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Cannot connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Migration failed: {0}")]
    Migrate(#[from] MigrateError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy { latency_ms: u64 },
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy { .. } => "healthy",
            HealthStatus::Unhealthy(_) => "unhealthy",
        }
    }

    /// 就绪响应里的附加说明
    pub fn detail(&self) -> String {
        match self {
            HealthStatus::Healthy { latency_ms } => format!("{}ms", latency_ms),
            HealthStatus::Unhealthy(msg) => msg.clone(),
        }
    }
}
