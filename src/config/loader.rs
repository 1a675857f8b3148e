//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `JUKEBOT_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `JUKEBOT_EXTRACTION__RESOLVER_URL=http://invidious:3000`
/// - `JUKEBOT_EXTRACTION__COOKIE=SID=...`（私密值，只从环境注入）
/// - `JUKEBOT_PROBE__WINDOW_BYTES=16384`
/// - `JUKEBOT_LOG__LEVEL=debug`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("extraction.resolver_url", "http://localhost:3000")?
        .set_default(
            "extraction.user_agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        )?
        .set_default("extraction.accept_language", "en-US,en;q=0.9")?
        .set_default("extraction.timeout_secs", 10)?
        .set_default("extraction.connect_timeout_secs", 10)?
        .set_default("extraction.read_timeout_secs", 10)?
        .set_default("probe.window_bytes", 8192)?
        .set_default("metadata.oembed_url", "https://www.youtube.com/oembed")?
        .set_default("metadata.timeout_secs", 5)?
        .set_default("metadata.join_wait_ms", 500)?
        .set_default("playback.default_volume_percent", 50)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: JUKEBOT_
    // 层级分隔符: __ (双下划线)
    // 例如: JUKEBOT_EXTRACTION__COOKIE=SID=...
    builder = builder.add_source(
        Environment::with_prefix("JUKEBOT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.extraction.resolver_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Resolver URL cannot be empty".to_string(),
        ));
    }

    if config.extraction.user_agent.is_empty() {
        return Err(ConfigError::ValidationError(
            "User agent cannot be empty".to_string(),
        ));
    }

    if config.extraction.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Extraction timeout cannot be 0".to_string(),
        ));
    }

    if config.probe.window_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "Probe window cannot be 0".to_string(),
        ));
    }

    if !(0..=100).contains(&config.playback.default_volume_percent) {
        return Err(ConfigError::ValidationError(format!(
            "Default volume must be within 0-100, got {}",
            config.playback.default_volume_percent
        )));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
///
/// Cookie 是私密值，只打印是否设置。
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Resolver URL: {}", config.extraction.resolver_url);
    tracing::info!("Extraction Timeout: {}s", config.extraction.timeout_secs);
    tracing::info!(
        "Cookie: {}",
        if config.extraction.cookie.is_some() {
            "set"
        } else {
            "unset"
        }
    );
    tracing::info!("Probe Window: {} bytes", config.probe.window_bytes);
    tracing::info!("oEmbed URL: {}", config.metadata.oembed_url);
    tracing::info!("Title Join Wait: {}ms", config.metadata.join_wait_ms);
    tracing::info!(
        "Default Volume: {}%",
        config.playback.default_volume_percent
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
