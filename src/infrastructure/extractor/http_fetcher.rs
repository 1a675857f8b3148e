//! HTTP Media Fetcher - 直链媒体拉取
//!
//! 解析服务给出的直链带时效且可能跳转：用同样的伪装头重新拉取。
//! 重试次数与跳转跳数都是硬性上限，不是尽力而为。

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::{redirect, Client};
use std::time::Duration;
use tokio_util::io::StreamReader;
use url::Url;

use super::api_resolver::{default_user_agent, spoofed_headers};
use crate::application::ports::{ByteStream, ExtractError, FetchError, MediaFetchPort};

/// 拉取尝试上限
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

/// 跳转跳数上限
pub const MAX_REDIRECT_HOPS: usize = 5;

/// 直链拉取配置
#[derive(Debug, Clone)]
pub struct HttpMediaFetcherConfig {
    /// 伪装的浏览器 User-Agent（与解析请求一致）
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

impl Default for HttpMediaFetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: "en-US,en;q=0.9".to_string(),
            cookie: None,
            connect_timeout_secs: 10,
            read_timeout_secs: 10,
        }
    }
}

/// 直链媒体拉取器
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    pub fn new(config: HttpMediaFetcherConfig) -> Result<Self, ExtractError> {
        let headers = spoofed_headers(
            &config.user_agent,
            &config.accept_language,
            config.cookie.as_deref(),
        )?;

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .redirect(redirect::Policy::limited(MAX_REDIRECT_HOPS))
            .build()
            .map_err(|e| ExtractError::Network(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn with_defaults() -> Result<Self, ExtractError> {
        Self::new(HttpMediaFetcherConfig::default())
    }
}

#[async_trait]
impl MediaFetchPort for HttpMediaFetcher {
    async fn fetch(&self, url: &Url) -> Result<ByteStream, FetchError> {
        let mut last_error = String::new();

        for attempt in 1..=MAX_FETCH_ATTEMPTS {
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        tracing::debug!(attempt = attempt, "Media fetch succeeded");
                        let body = response.bytes_stream().map_err(std::io::Error::other);
                        let stream: ByteStream = Box::new(StreamReader::new(Box::pin(body)));
                        return Ok(stream);
                    }

                    // 4xx 不可重试：直链过期或被拒绝，重试没有意义
                    if !status.is_server_error() {
                        return Err(FetchError::Status(status.as_u16()));
                    }
                    last_error = format!("HTTP {}", status);
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            tracing::warn!(
                attempt = attempt,
                error = %last_error,
                "Media fetch attempt failed"
            );
        }

        Err(FetchError::Exhausted {
            attempts: MAX_FETCH_ATTEMPTS,
            reason: last_error,
        })
    }
}
