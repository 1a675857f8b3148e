//! 应用层错误定义
//!
//! 统一的播放失败分类。Display 即回复给调用方的单条失败消息：
//! 调用方要么收到完整的成功回复，要么收到一条失败消息，不暴露中间状态。

use thiserror::Error;

use crate::application::extraction::{ExtractionFailed, ProbeError};
use crate::application::ports::{FetchError, PlayerError, SubscribeError};
use crate::domain::track::TrackError;
use crate::domain::voice::VoiceError;

/// 播放失败
#[derive(Debug, Error)]
pub enum PlaybackFailure {
    /// 输入中找不到视频标识
    #[error("could not find a video in `{0}`")]
    InvalidReference(String),

    /// 所有提取后端均失败（携带逐后端原因）
    #[error(transparent)]
    ExtractionFailed(#[from] ExtractionFailed),

    /// 窗口内无法识别流格式
    #[error("could not recognize the audio format of the stream")]
    UnprobableStream,

    /// 语音连接未在限期内就绪
    #[error("could not connect to the voice channel (timeout)")]
    ConnectTimeout,

    /// 播放器绑定被拒绝
    #[error("could not subscribe the player to the voice connection")]
    SubscriptionFailed,

    /// 播放器或播放路径的运行时故障
    #[error("playback failed: {0}")]
    PlaybackError(String),
}

impl From<TrackError> for PlaybackFailure {
    fn from(err: TrackError) -> Self {
        match err {
            TrackError::InvalidReference(raw) => Self::InvalidReference(raw),
        }
    }
}

impl From<VoiceError> for PlaybackFailure {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::ConnectTimeout(_) => Self::ConnectTimeout,
            VoiceError::SubscriptionFailed(_) => Self::SubscriptionFailed,
            VoiceError::Gateway(reason) => Self::PlaybackError(reason),
            VoiceError::SessionDestroyed => {
                Self::PlaybackError("voice session was destroyed".to_string())
            }
        }
    }
}

impl From<SubscribeError> for PlaybackFailure {
    fn from(_: SubscribeError) -> Self {
        Self::SubscriptionFailed
    }
}

impl From<ProbeError> for PlaybackFailure {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::UnrecognizedFormat(_) => Self::UnprobableStream,
            ProbeError::Io(e) => Self::PlaybackError(format!("stream read failed: {}", e)),
        }
    }
}

impl From<FetchError> for PlaybackFailure {
    fn from(err: FetchError) -> Self {
        Self::PlaybackError(format!("media fetch failed: {}", err))
    }
}

impl From<PlayerError> for PlaybackFailure {
    fn from(err: PlayerError) -> Self {
        Self::PlaybackError(err.to_string())
    }
}
