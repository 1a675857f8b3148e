//! Playback Context - Errors

use thiserror::Error;

use super::state::PlaybackState;

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// 非法状态迁移
    #[error("invalid playback transition: {from} -> {to}")]
    InvalidTransition {
        from: PlaybackState,
        to: PlaybackState,
    },

    /// 音量只能在播放中调整
    #[error("volume can only be changed while playing (current state: {0})")]
    NotPlaying(PlaybackState),
}
