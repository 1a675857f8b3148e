//! Voice Context - Errors

use thiserror::Error;

use super::value_objects::ConnectionStatus;

#[derive(Debug, Error)]
pub enum VoiceError {
    /// 语音连接在限定时间内未就绪
    #[error("voice connection not ready within {0} seconds")]
    ConnectTimeout(u64),

    /// 播放器绑定被拒绝（连接未就绪或已销毁）
    #[error("failed to subscribe player: connection is {0}")]
    SubscriptionFailed(ConnectionStatus),

    /// 网关层错误
    #[error("voice gateway error: {0}")]
    Gateway(String),

    /// 会话已销毁
    #[error("voice session already destroyed")]
    SessionDestroyed,
}
