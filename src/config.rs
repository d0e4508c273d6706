//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:3000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
    /// 是否暴露 /api/testing/* 路由（清库，仅测试环境）
    pub expose_testing_routes: bool,
    /// 请求体大小上限（字节）
    pub body_limit_bytes: usize,
}

/// 持久化驱动
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 持久化驱动: postgres, memory
    pub driver: DatabaseDriver,
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）
    pub url: Secret<String>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// JWT 密钥（使用 Secret 包装，防止日志泄露）
    pub jwt_secret: Secret<String>,
    /// 访问令牌过期时间（秒）
    pub access_token_exp_secs: u64,
    /// 刷新令牌过期时间（秒），同时作为 refreshToken cookie 的 Max-Age
    pub refresh_token_exp_secs: u64,
    /// refreshToken cookie 是否带 Secure 标记
    pub refresh_cookie_secure: bool,
    /// 是否信任 X-Forwarded-For 头
    pub trust_proxy: bool,
    /// 注册确认码 / 密码找回码有效期（秒）
    pub confirmation_code_ttl_secs: u64,
    /// Argon2 内存开销（KiB）
    pub password_hash_memory_kib: u32,
    /// Argon2 迭代次数
    pub password_hash_iterations: u32,
    /// Argon2 并行度
    pub password_hash_parallelism: u32,
    /// /api/users 的 Basic 认证用户名
    pub admin_login: String,
    /// /api/users 的 Basic 认证密码；未设置时管理接口一律 401
    pub admin_password: Option<Secret<String>>,
}

/// 确认码 / 找回码有效期上限（7 天）
pub const MAX_CONFIRMATION_CODE_TTL_SECS: u64 = 7 * 24 * 3600;

impl SecurityConfig {
    /// 确认码有效期，超出上限时按上限计
    pub fn confirmation_code_ttl(&self) -> chrono::Duration {
        let secs = self.confirmation_code_ttl_secs.min(MAX_CONFIRMATION_CODE_TTL_SECS);
        chrono::Duration::seconds(secs as i64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP 主机；未设置时邮件只写日志
    pub smtp_host: Option<String>,
    /// SMTP 端口（STARTTLS）
    pub smtp_port: u16,
    /// 发件人地址
    pub from_address: String,
    /// SMTP 用户名（可选）
    pub smtp_user: Option<String>,
    /// SMTP 密码（可选，使用 Secret 包装）
    pub smtp_password: Option<Secret<String>>,
    /// 邮件中链接指向的前端地址
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("server.expose_testing_routes", false)?
            .set_default("server.body_limit_bytes", 64 * 1024)?
            .set_default("database.driver", "postgres")?
            .set_default("database.url", "postgresql://localhost/blog_platform")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.jwt_secret", "change-this-secret-in-production-min-32-chars!")?
            .set_default("security.access_token_exp_secs", 10)?
            .set_default("security.refresh_token_exp_secs", 20)?
            .set_default("security.refresh_cookie_secure", true)?
            .set_default("security.trust_proxy", true)?
            .set_default("security.confirmation_code_ttl_secs", 3600)?
            .set_default("security.password_hash_memory_kib", 19456)?
            .set_default("security.password_hash_iterations", 2)?
            .set_default("security.password_hash_parallelism", 1)?
            .set_default("security.admin_login", "admin")?
            .set_default("email.smtp_port", 587)?
            .set_default("email.from_address", "noreply@blog-platform.local")?
            .set_default("email.frontend_url", "https://blog-platform.local")?;

        // 从环境变量加载配置（前缀为 BLOG_）
        settings = settings.add_source(
            Environment::with_prefix("BLOG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证端口范围
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证数据库连接池配置
        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        // 验证 JWT 密钥长度（至少 32 字符）
        if self.security.jwt_secret.expose_secret().len() < 32 {
            return Err(ConfigError::Message(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        // 验证令牌过期时间
        if self.security.access_token_exp_secs == 0 || self.security.access_token_exp_secs > 86400 {
            return Err(ConfigError::Message(
                "access_token_exp_secs must be between 1 and 86400".to_string(),
            ));
        }

        if self.security.refresh_token_exp_secs <= self.security.access_token_exp_secs
            || self.security.refresh_token_exp_secs > 2592000
        {
            return Err(ConfigError::Message(
                "refresh_token_exp_secs must exceed access_token_exp_secs and be at most 2592000 (30 days)"
                    .to_string(),
            ));
        }

        if self.security.confirmation_code_ttl_secs == 0
            || self.security.confirmation_code_ttl_secs > MAX_CONFIRMATION_CODE_TTL_SECS
        {
            return Err(ConfigError::Message(format!(
                "confirmation_code_ttl_secs must be between 1 and {}",
                MAX_CONFIRMATION_CODE_TTL_SECS
            )));
        }

        // Argon2 要求 m >= 8 * p
        if self.security.password_hash_parallelism == 0
            || self.security.password_hash_iterations == 0
            || self.security.password_hash_memory_kib < 8 * self.security.password_hash_parallelism
        {
            return Err(ConfigError::Message(
                "password_hash_* parameters are out of range".to_string(),
            ));
        }

        Ok(())
    }
}
