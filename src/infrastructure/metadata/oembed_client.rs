//! oEmbed Title Client - 标题元数据客户端
//!
//! 通过平台 oEmbed 端点尽力获取曲目标题。失败、超时一律由
//! 调用方吞掉并回退到原始输入，绝不影响播放主路径。

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::application::ports::{TitleError, TitleSourcePort};
use crate::domain::track::VideoReference;
use crate::infrastructure::extractor::ApiResolverConfig;

/// oEmbed 客户端配置
#[derive(Debug, Clone)]
pub struct OembedClientConfig {
    /// oEmbed 端点
    pub oembed_url: String,
    /// 伪装的浏览器 User-Agent
    pub user_agent: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for OembedClientConfig {
    fn default() -> Self {
        Self {
            oembed_url: "https://www.youtube.com/oembed".to_string(),
            user_agent: ApiResolverConfig::default().user_agent,
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: String,
}

/// oEmbed 标题客户端
pub struct OembedTitleClient {
    client: Client,
    config: OembedClientConfig,
}

impl OembedTitleClient {
    pub fn new(config: OembedClientConfig) -> Result<Self, TitleError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TitleError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self, TitleError> {
        Self::new(OembedClientConfig::default())
    }
}

#[async_trait]
impl TitleSourcePort for OembedTitleClient {
    async fn fetch_title(&self, reference: &VideoReference) -> Result<String, TitleError> {
        let response = self
            .client
            .get(&self.config.oembed_url)
            .query(&[("url", reference.watch_url()), ("format", "json")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TitleError::Timeout
                } else {
                    TitleError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TitleError::InvalidResponse(format!("HTTP {}", status)));
        }

        let oembed: OembedResponse = response
            .json()
            .await
            .map_err(|e| TitleError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            video_id = %reference.id(),
            title = %oembed.title,
            "Title fetched"
        );

        Ok(oembed.title)
    }
}
