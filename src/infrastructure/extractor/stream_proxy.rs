//! Stream Proxy Backend - 直接流式后端
//!
//! 请求解析实例的 /latest_version?id={id}&itag=251&local=true，
//! 响应体即音频流，不经过中间 URL 步骤。作为解析后端不可用或
//! 拒绝请求时的回退路径。
//!
//! 容器/编码 hint 从响应的 Content-Type 推断；推断不出时留空，
//! 交由探测器嗅探。

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};
use std::time::Duration;
use tokio_util::io::StreamReader;

use super::api_resolver::{default_user_agent, spoofed_headers};
use crate::application::ports::{
    ByteStream, ExtractError, ExtractionBackendPort, ExtractionResult, StreamFormat,
};
use crate::domain::track::VideoReference;

/// Opus 音频的 itag（WebM 容器，约 160kbps）
const ITAG_OPUS_AUDIO: u32 = 251;

/// 跳转跳数上限（与直链拉取一致）
const MAX_REDIRECT_HOPS: usize = 5;

/// 直接流式后端配置
#[derive(Debug, Clone)]
pub struct StreamProxyConfig {
    /// 解析服务基础 URL（Invidious 兼容实例）
    pub base_url: String,
    /// 伪装的浏览器 User-Agent
    pub user_agent: String,
    /// Accept-Language 头
    pub accept_language: String,
    /// 可选的私密 Cookie；绝不写入日志
    pub cookie: Option<String>,
    /// 连接超时（秒）
    pub connect_timeout_secs: u64,
    /// 读超时（秒）；约束单次读取而非整条流
    pub read_timeout_secs: u64,
}

impl Default for StreamProxyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            user_agent: default_user_agent(),
            accept_language: "en-US,en;q=0.9".to_string(),
            cookie: None,
            connect_timeout_secs: 10,
            read_timeout_secs: 10,
        }
    }
}

/// 直接流式后端
pub struct StreamProxyBackend {
    client: Client,
    config: StreamProxyConfig,
}

impl StreamProxyBackend {
    pub fn new(config: StreamProxyConfig) -> Result<Self, ExtractError> {
        let headers = spoofed_headers(
            &config.user_agent,
            &config.accept_language,
            config.cookie.as_deref(),
        )?;

        // 注意：不能设整请求超时，流会播放很久；只约束连接与单次读取
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .redirect(redirect::Policy::limited(MAX_REDIRECT_HOPS))
            .build()
            .map_err(|e| ExtractError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self, ExtractError> {
        Self::new(StreamProxyConfig::default())
    }

    fn stream_url(&self, video_id: &str) -> String {
        format!(
            "{}/latest_version?id={}&itag={}&local=true",
            self.config.base_url.trim_end_matches('/'),
            video_id,
            ITAG_OPUS_AUDIO
        )
    }
}

#[async_trait]
impl ExtractionBackendPort for StreamProxyBackend {
    fn name(&self) -> &'static str {
        "stream_proxy"
    }

    async fn extract(
        &self,
        reference: &VideoReference,
    ) -> Result<ExtractionResult, ExtractError> {
        let url = self.stream_url(reference.id().as_str());

        tracing::debug!(video_id = %reference.id(), url = %url, "Requesting proxied stream");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractError::Timeout
            } else if e.is_connect() {
                ExtractError::Network(format!("cannot connect to stream proxy: {}", e))
            } else {
                ExtractError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Service(format!("HTTP {}", status)));
        }

        let hint = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(StreamFormat::from_mime);

        tracing::info!(
            video_id = %reference.id(),
            hint = ?hint,
            "Stream proxy returned live stream"
        );

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let stream: ByteStream = Box::new(StreamReader::new(Box::pin(body)));

        Ok(ExtractionResult::Stream { stream, hint })
    }
}
