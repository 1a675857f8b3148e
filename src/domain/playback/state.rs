//! Playback Context - 播放状态机与音量

use serde::{Deserialize, Serialize};

/// 播放状态
///
/// 合法迁移:
/// - Idle -> Loading（play 调用）
/// - Loading -> Playing（流就绪）
/// - Playing -> Idle（自然播完）
/// - Loading | Playing -> Error（播放器故障）
/// - Loading | Playing -> Stopped（显式停止）
///
/// 播完后的 Idle、Error、Stopped 均为终态，必须恰好触发一次会话销毁。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Error,
    Stopped,
}

impl PlaybackState {
    /// 判断到目标状态的迁移是否合法
    pub fn can_transition(self, next: PlaybackState) -> bool {
        use PlaybackState::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Playing)
                | (Playing, Idle)
                | (Loading, Error)
                | (Playing, Error)
                | (Loading, Stopped)
                | (Playing, Stopped)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Error => "error",
            PlaybackState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 音量
///
/// 不变量: 始终被钳制在 [0.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume(f32);

impl Volume {
    pub fn new(value: f32) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 1.0))
        } else {
            Self(0.0)
        }
    }

    /// 从整数百分比构造（先钳制到 [0, 100]）
    pub fn from_percent(percent: i64) -> Self {
        Self(percent.clamp(0, 100) as f32 / 100.0)
    }

    pub fn as_f32(self) -> f32 {
        self.0
    }

    pub fn as_percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(0.5)
    }
}

impl std::fmt::Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.as_percent())
    }
}
