//! Voice Port - 语音传输抽象
//!
//! 定义语音网关、连接与音频播放器的抽象接口。
//! 本核心不定义线协议，只约定与底层语音传输的交互面。

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use super::extraction::ProbedStream;
use crate::domain::playback::Volume;
use crate::domain::voice::{ChannelId, ConnectionStatus, GuildId};

/// 播放器状态事件
///
/// 由播放器投递给单个监督例程；错误与自然结束可能竞争，
/// 消费方必须保证销毁只发生一次。
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// 流自然播放完毕
    Ended,
    /// 播放器运行时故障
    Fault(String),
}

/// 网关错误
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to open voice connection: {0}")]
    Connect(String),
}

/// 播放器绑定错误
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("connection is {0}, not ready")]
    NotReady(ConnectionStatus),
}

/// 播放器错误
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("player rejected stream: {0}")]
    Rejected(String),
}

/// Voice Gateway Port
///
/// 打开语音连接、创建播放器的入口
#[async_trait]
pub trait VoiceGatewayPort: Send + Sync {
    /// 连接语音频道；返回的连接初始为 Connecting，
    /// 就绪与否通过 status() 观察
    async fn connect(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<Box<dyn VoiceConnectionPort>, GatewayError>;

    /// 创建一个音频播放器
    fn create_player(&self) -> Arc<dyn AudioPlayerPort>;
}

/// 单条语音连接
#[async_trait]
pub trait VoiceConnectionPort: Send + Sync {
    /// 连接状态观察通道
    fn status(&self) -> watch::Receiver<ConnectionStatus>;

    /// 绑定播放器输出；仅在 Ready 时允许
    fn subscribe(&self, player: Arc<dyn AudioPlayerPort>) -> Result<(), SubscribeError>;

    /// 释放底层网络资源；可安全重复调用
    async fn disconnect(&self);
}

/// Audio Player Port
///
/// 播放已探测的流并投递状态事件
#[async_trait]
pub trait AudioPlayerPort: Send + Sync {
    /// 开始播放（应用初始音量）
    async fn play(&self, stream: ProbedStream, volume: Volume) -> Result<(), PlayerError>;

    /// 播放中原地调整音量，不重启流
    fn set_volume(&self, volume: Volume);

    /// 停止播放并释放持有的流
    fn stop(&self);

    /// 取走事件接收端
    ///
    /// 只允许取走一次：事件由单个监督例程消费。
    fn take_events(&self) -> Option<mpsc::Receiver<PlayerEvent>>;
}
