//! Playback Commands - 播放命令与响应
//!
//! 命令层（斜杠命令解析、权限校验）在本核心之外；
//! 这里定义它投递进来的命令形状与回给它的响应。

use crate::domain::playback::Volume;
use crate::domain::track::TrackTitle;
use crate::domain::voice::{ChannelId, GuildId};

/// 播放命令
///
/// 调用方已确认发起用户在可加入的语音频道内、
/// 且机器人具备 Connect/Speak 权限。
#[derive(Debug, Clone)]
pub struct PlayCommand {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    /// 语音频道显示名（用于回复文案）
    pub channel_name: String,
    /// 自由文本的视频引用
    pub input: String,
    /// 音量百分比（0-100，缺省 50），超界会被钳制
    pub volume_percent: i64,
}

impl PlayCommand {
    /// 缺省音量百分比
    pub const DEFAULT_VOLUME_PERCENT: i64 = 50;
}

/// 播放响应
#[derive(Debug, Clone)]
pub struct PlayResponse {
    pub title: TrackTitle,
    pub volume: Volume,
    pub channel_name: String,
}

impl PlayResponse {
    /// 面向用户的成功回复
    pub fn status_line(&self) -> String {
        format!(
            "Now playing: {} at {}% in {}",
            self.title,
            self.volume.as_percent(),
            self.channel_name
        )
    }
}

/// 调整音量命令
#[derive(Debug, Clone)]
pub struct SetVolumeCommand {
    pub guild_id: GuildId,
    pub volume_percent: i64,
}

/// 调整音量响应
#[derive(Debug, Clone)]
pub struct SetVolumeResponse {
    pub volume: Volume,
}

impl SetVolumeResponse {
    pub fn status_line(&self) -> String {
        format!("Volume set to {}%", self.volume.as_percent())
    }
}

/// 停止播放命令
#[derive(Debug, Clone)]
pub struct StopCommand {
    pub guild_id: GuildId,
}

/// 停止播放响应
#[derive(Debug, Clone)]
pub struct StopResponse {
    pub channel_name: String,
}

impl StopResponse {
    pub fn status_line(&self) -> String {
        format!("Stopped playback in {}", self.channel_name)
    }
}
