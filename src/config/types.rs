//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 提取配置
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// 探测配置
    #[serde(default)]
    pub probe: ProbeConfig,

    /// 元数据配置
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            probe: ProbeConfig::default(),
            metadata: MetadataConfig::default(),
            playback: PlaybackConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// 提取配置
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// 解析服务基础 URL（Invidious 兼容实例）
    #[serde(default = "default_resolver_url")]
    pub resolver_url: String,

    /// 伪装的浏览器 User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language 头
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// 可选的私密 Cookie，用于绕过平台的机器人/年龄门槛
    /// 通过环境变量注入（JUKEBOT_EXTRACTION__COOKIE），绝不写入日志
    #[serde(default)]
    pub cookie: Option<String>,

    /// 解析 API 单次请求超时（秒）
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,

    /// 流式请求的连接超时（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// 流式请求的读超时（秒）
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_resolver_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_extraction_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    10
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            resolver_url: default_resolver_url(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            cookie: None,
            timeout_secs: default_extraction_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

/// 探测配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// 探测窗口（字节）；探测只读这么多头部字节
    #[serde(default = "default_probe_window")]
    pub window_bytes: usize,
}

fn default_probe_window() -> usize {
    8192
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            window_bytes: default_probe_window(),
        }
    }
}

/// 元数据配置
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    /// oEmbed 端点
    #[serde(default = "default_oembed_url")]
    pub oembed_url: String,

    /// 标题请求超时（秒）
    #[serde(default = "default_metadata_timeout")]
    pub timeout_secs: u64,

    /// 播放启动后等待标题结果的上限（毫秒），超过即丢弃
    #[serde(default = "default_join_wait")]
    pub join_wait_ms: u64,
}

fn default_oembed_url() -> String {
    "https://www.youtube.com/oembed".to_string()
}

fn default_metadata_timeout() -> u64 {
    5
}

fn default_join_wait() -> u64 {
    500
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            oembed_url: default_oembed_url(),
            timeout_secs: default_metadata_timeout(),
            join_wait_ms: default_join_wait(),
        }
    }
}

/// 播放配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// 缺省音量百分比（0-100）
    #[serde(default = "default_volume_percent")]
    pub default_volume_percent: i64,
}

fn default_volume_percent() -> i64 {
    50
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume_percent: default_volume_percent(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.extraction.resolver_url, "http://localhost:3000");
        assert_eq!(config.extraction.timeout_secs, 10);
        assert!(config.extraction.cookie.is_none());
        assert_eq!(config.probe.window_bytes, 8192);
        assert_eq!(config.metadata.oembed_url, "https://www.youtube.com/oembed");
        assert_eq!(config.playback.default_volume_percent, 50);
    }

    #[test]
    fn test_user_agent_looks_like_browser() {
        let config = ExtractionConfig::default();
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
        assert!(config.accept_language.contains("en-US"));
    }
}
