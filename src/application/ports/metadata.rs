//! Metadata Port - 曲目元数据抽象

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::track::VideoReference;

/// 标题获取错误
#[derive(Debug, Error)]
pub enum TitleError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout")]
    Timeout,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Title Source Port
///
/// 尽力获取人类可读的曲目标题。
/// 调用方吞掉一切失败并回退到原始输入，永不阻塞主播放路径。
#[async_trait]
pub trait TitleSourcePort: Send + Sync {
    async fn fetch_title(&self, reference: &VideoReference) -> Result<String, TitleError>;
}
