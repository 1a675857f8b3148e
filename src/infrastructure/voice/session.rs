//! Voice Session - 语音会话生命周期
//!
//! 持有到语音频道的连接：加入、限时等待就绪、播放器绑定、幂等销毁。
//! 销毁会触发会话级取消令牌，挂在会话上的网络操作据此尽力放弃。

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::{
    AudioPlayerPort, SubscribeError, VoiceConnectionPort, VoiceGatewayPort,
};
use crate::domain::voice::{ChannelId, ConnectionStatus, GuildId, VoiceError};

/// 连接就绪的固定等待上限
pub const READY_TIMEOUT: Duration = Duration::from_secs(15);

/// 语音会话
///
/// 不变量:
/// - 每个公会同时最多一个存活会话（由 GuildSessionRegistry 保证）
/// - Destroyed 为终态：销毁恰好执行一次，此后所有操作被拒绝
pub struct VoiceSession {
    id: Uuid,
    guild: GuildId,
    channel: ChannelId,
    channel_name: String,
    connection: Box<dyn VoiceConnectionPort>,
    cancel: CancellationToken,
    destroyed: AtomicBool,
    connected_at: DateTime<Utc>,
}

impl std::fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSession")
            .field("id", &self.id)
            .field("guild", &self.guild)
            .field("channel", &self.channel)
            .field("channel_name", &self.channel_name)
            .field("destroyed", &self.destroyed)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

impl VoiceSession {
    /// 加入语音频道并等待连接就绪
    ///
    /// 就绪等待有固定上限；超时或等待期间断开时立即释放连接，
    /// 绝不留下悬挂的 Connecting 会话。
    pub async fn join(
        gateway: &dyn VoiceGatewayPort,
        guild: GuildId,
        channel: ChannelId,
        channel_name: impl Into<String>,
    ) -> Result<Arc<Self>, VoiceError> {
        Self::join_with_timeout(gateway, guild, channel, channel_name, READY_TIMEOUT).await
    }

    /// 以指定就绪超时加入（测试用）
    pub async fn join_with_timeout(
        gateway: &dyn VoiceGatewayPort,
        guild: GuildId,
        channel: ChannelId,
        channel_name: impl Into<String>,
        ready_timeout: Duration,
    ) -> Result<Arc<Self>, VoiceError> {
        let connection = gateway
            .connect(guild, channel)
            .await
            .map_err(|e| VoiceError::Gateway(e.to_string()))?;

        let mut status = connection.status();

        let waited = tokio::time::timeout(ready_timeout, async {
            loop {
                match *status.borrow() {
                    ConnectionStatus::Ready => return Ok(()),
                    ConnectionStatus::Disconnected | ConnectionStatus::Destroyed => {
                        return Err(VoiceError::Gateway(
                            "connection lost while connecting".to_string(),
                        ));
                    }
                    ConnectionStatus::Connecting => {}
                }
                if status.changed().await.is_err() {
                    return Err(VoiceError::Gateway(
                        "connection status channel closed".to_string(),
                    ));
                }
            }
        })
        .await;

        match waited {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                connection.disconnect().await;
                return Err(e);
            }
            Err(_elapsed) => {
                connection.disconnect().await;
                tracing::warn!(
                    guild_id = %guild,
                    channel_id = %channel,
                    timeout_secs = ready_timeout.as_secs(),
                    "Voice connection not ready in time, destroyed"
                );
                return Err(VoiceError::ConnectTimeout(ready_timeout.as_secs()));
            }
        }

        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            guild,
            channel,
            channel_name: channel_name.into(),
            connection,
            cancel: CancellationToken::new(),
            destroyed: AtomicBool::new(false),
            connected_at: Utc::now(),
        });

        tracing::info!(
            session_id = %session.id,
            guild_id = %guild,
            channel_id = %channel,
            channel = %session.channel_name,
            "Voice session ready"
        );

        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn guild(&self) -> GuildId {
        self.guild
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// 当前连接状态
    pub fn status(&self) -> ConnectionStatus {
        if self.destroyed.load(Ordering::Acquire) {
            return ConnectionStatus::Destroyed;
        }
        *self.connection.status().borrow()
    }

    /// 连接状态观察通道（监督例程用）
    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.status()
    }

    /// 会话取消令牌：销毁时触发
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// 绑定播放器输出；连接非 Ready（含已销毁）时拒绝
    pub fn subscribe(&self, player: Arc<dyn AudioPlayerPort>) -> Result<(), VoiceError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(VoiceError::SubscriptionFailed(ConnectionStatus::Destroyed));
        }
        self.connection
            .subscribe(player)
            .map_err(|SubscribeError::NotReady(status)| VoiceError::SubscriptionFailed(status))
    }

    /// 销毁会话
    ///
    /// 幂等：可安全重复调用，到 Destroyed 的迁移与底层资源释放
    /// 只发生一次。
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            tracing::debug!(session_id = %self.id, "Voice session already destroyed");
            return;
        }

        self.cancel.cancel();
        self.connection.disconnect().await;

        tracing::info!(
            session_id = %self.id,
            guild_id = %self.guild,
            "Voice session destroyed"
        );
    }
}
