//! API Resolver Backend - 外部解析服务后端
//!
//! 调用 Invidious 兼容实例的 /api/v1/videos/{id}，取回带时效的直链
//! 音频地址。请求携带伪装 UA、Accept-Language 与可选的私密 Cookie
//! （用于绕过平台的机器人/年龄门槛，绝不写入日志）。
//!
//! 返回的直链可能跳转且很快过期，由 HttpMediaFetcher 以同样的
//! 请求头在有界重试/跳转内拉取。

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::application::ports::{
    ExtractError, ExtractionBackendPort, ExtractionResult, StreamFormat,
};
use crate::domain::track::VideoReference;

/// 解析后端配置
#[derive(Debug, Clone)]
pub struct ApiResolverConfig {
    /// 解析服务基础 URL（Invidious 兼容实例）
    pub base_url: String,
    /// 伪装的浏览器 User-Agent
    pub user_agent: String,
    /// Accept-Language 头
    pub accept_language: String,
    /// 可选的私密 Cookie；来自环境配置，绝不写入日志
    pub cookie: Option<String>,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for ApiResolverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            user_agent: default_user_agent(),
            accept_language: "en-US,en;q=0.9".to_string(),
            cookie: None,
            timeout_secs: 10,
        }
    }
}

pub(crate) fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}

/// 构造带伪装头的 HeaderMap；Cookie 标记为 sensitive
pub(crate) fn spoofed_headers(
    user_agent: &str,
    accept_language: &str,
    cookie: Option<&str>,
) -> Result<HeaderMap, ExtractError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|e| ExtractError::InvalidResponse(format!("bad user agent: {}", e)))?,
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(accept_language)
            .map_err(|e| ExtractError::InvalidResponse(format!("bad accept-language: {}", e)))?,
    );
    if let Some(cookie) = cookie {
        let mut value = HeaderValue::from_str(cookie)
            .map_err(|e| ExtractError::InvalidResponse(format!("bad cookie value: {}", e)))?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }
    Ok(headers)
}

/// /api/v1/videos/{id} 响应里的自适应格式条目
#[derive(Debug, Deserialize)]
struct AdaptiveFormat {
    url: String,
    #[serde(rename = "type")]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    #[serde(default)]
    adaptive_formats: Vec<AdaptiveFormat>,
}

/// 外部解析服务后端
pub struct ApiResolverBackend {
    client: Client,
    config: ApiResolverConfig,
}

impl ApiResolverBackend {
    pub fn new(config: ApiResolverConfig) -> Result<Self, ExtractError> {
        let headers = spoofed_headers(
            &config.user_agent,
            &config.accept_language,
            config.cookie.as_deref(),
        )?;

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self, ExtractError> {
        Self::new(ApiResolverConfig::default())
    }

    fn videos_url(&self, video_id: &str) -> String {
        format!(
            "{}/api/v1/videos/{}",
            self.config.base_url.trim_end_matches('/'),
            video_id
        )
    }

    /// 挑选最合适的纯音频格式：WebM/Opus 优先，其次 MP4/AAC
    fn pick_audio(formats: &[AdaptiveFormat]) -> Option<(&AdaptiveFormat, StreamFormat)> {
        formats
            .iter()
            .find(|f| f.mime_type.starts_with("audio/webm"))
            .map(|f| (f, StreamFormat::WebmOpus))
            .or_else(|| {
                formats
                    .iter()
                    .find(|f| f.mime_type.starts_with("audio/mp4"))
                    .map(|f| (f, StreamFormat::Mp4Aac))
            })
    }
}

#[async_trait]
impl ExtractionBackendPort for ApiResolverBackend {
    fn name(&self) -> &'static str {
        "api_resolver"
    }

    async fn extract(
        &self,
        reference: &VideoReference,
    ) -> Result<ExtractionResult, ExtractError> {
        let url = self.videos_url(reference.id().as_str());

        tracing::debug!(
            video_id = %reference.id(),
            url = %url,
            cookie = self.config.cookie.is_some(),
            "Querying resolver API"
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractError::Timeout
            } else if e.is_connect() {
                ExtractError::Network(format!("cannot connect to resolver: {}", e))
            } else {
                ExtractError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Service(format!("HTTP {}", status)));
        }

        let video: VideoResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::InvalidResponse(e.to_string()))?;

        let (format, hint) = Self::pick_audio(&video.adaptive_formats)
            .ok_or_else(|| ExtractError::NoPlayableFormat(reference.id().to_string()))?;

        let media_url = Url::parse(&format.url)
            .map_err(|e| ExtractError::InvalidResponse(format!("bad media url: {}", e)))?;

        tracing::info!(
            video_id = %reference.id(),
            format = %hint,
            "Resolver returned direct media url"
        );

        Ok(ExtractionResult::DirectUrl {
            url: media_url,
            hint: Some(hint),
        })
    }
}
