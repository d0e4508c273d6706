//! 日志初始化
//! RUST_LOG 优先，否则使用 logging.level 加上依赖库的降噪规则

use crate::config::LoggingConfig;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// 未知取值按 pretty 处理（配置校验已拦截）
    pub fn from_config(config: &LoggingConfig) -> Self {
        match config.format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

// sqlx 每条语句都打 info，lettre 打印 SMTP 会话
const QUIET_DEPENDENCIES: &[&str] = &["sqlx=warn", "lettre=warn", "tower_http=info"];

/// 默认过滤规则
pub fn default_directives(level: &str) -> String {
    std::iter::once(level.to_lowercase())
        .chain(QUIET_DEPENDENCIES.iter().map(|d| d.to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// 安装全局 subscriber；已安装时只记录一条 warn
pub fn init_telemetry(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let format = LogFormat::from_config(config);
    let fmt_layer = match format {
        // JSON 输出请求 span 关闭事件，便于按 trace_id 聚合耗时
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed(),
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        tracing::warn!(error = %e, "Telemetry already initialized");
        return;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = ?format,
        "Telemetry initialized"
    );
}
