//! Playback Command Handlers
//!
//! 面向命令层的用例入口。失败策略：任何不可恢复失败都折叠成
//! 单条 PlaybackFailure 消息；期间创建过的会话在返回前一定已销毁。

use std::sync::Arc;

use crate::application::commands::play_commands::{
    PlayCommand, PlayResponse, SetVolumeCommand, SetVolumeResponse, StopCommand, StopResponse,
};
use crate::application::error::PlaybackFailure;
use crate::application::playback::{PlaybackController, PlaybackPipeline};
use crate::application::ports::VoiceGatewayPort;
use crate::domain::playback::Volume;
use crate::infrastructure::voice::{GuildSessionRegistry, VoiceSession};

/// Play Handler - 播放用例
///
/// 每公会串行：新的播放请求先销毁该公会的现存会话。
pub struct PlayHandler {
    gateway: Arc<dyn VoiceGatewayPort>,
    registry: Arc<GuildSessionRegistry>,
    pipeline: Arc<PlaybackPipeline>,
}

impl PlayHandler {
    pub fn new(
        gateway: Arc<dyn VoiceGatewayPort>,
        registry: Arc<GuildSessionRegistry>,
        pipeline: Arc<PlaybackPipeline>,
    ) -> Self {
        Self {
            gateway,
            registry,
            pipeline,
        }
    }

    pub async fn handle(&self, cmd: PlayCommand) -> Result<PlayResponse, PlaybackFailure> {
        let volume = Volume::from_percent(cmd.volume_percent);

        tracing::info!(
            guild_id = %cmd.guild_id,
            channel_id = %cmd.channel_id,
            input = %cmd.input,
            volume = %volume,
            "Play command received"
        );

        // 同公会最多一个会话：现存会话先销毁
        self.registry.evict(cmd.guild_id).await;

        // 加入语音频道并限时等待就绪；超时路径内部已释放连接
        let session = VoiceSession::join(
            self.gateway.as_ref(),
            cmd.guild_id,
            cmd.channel_id,
            cmd.channel_name.clone(),
        )
        .await?;

        let player = self.gateway.create_player();
        let controller =
            match PlaybackController::bind(session.clone(), player, Some(self.registry.clone())) {
                Ok(controller) => controller,
                Err(failure) => {
                    // 绑定失败同样不留下连接
                    session.destroy().await;
                    return Err(failure);
                }
            };

        self.registry.insert(controller.clone()).await;

        // play 的失败路径内部已销毁会话并从注册表摘除
        let title = controller.play(&self.pipeline, &cmd.input, volume).await?;

        Ok(PlayResponse {
            title,
            volume,
            channel_name: cmd.channel_name,
        })
    }
}

/// SetVolume Handler - 播放中调整音量
pub struct SetVolumeHandler {
    registry: Arc<GuildSessionRegistry>,
}

impl SetVolumeHandler {
    pub fn new(registry: Arc<GuildSessionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, cmd: SetVolumeCommand) -> Result<SetVolumeResponse, PlaybackFailure> {
        let controller = self
            .registry
            .get(cmd.guild_id)
            .ok_or_else(|| PlaybackFailure::PlaybackError(
                "nothing is playing in this guild".to_string(),
            ))?;

        let volume = controller
            .set_volume(Volume::from_percent(cmd.volume_percent))
            .map_err(|e| PlaybackFailure::PlaybackError(e.to_string()))?;

        Ok(SetVolumeResponse { volume })
    }
}

/// Stop Handler - 显式停止并销毁会话
pub struct StopHandler {
    registry: Arc<GuildSessionRegistry>,
}

impl StopHandler {
    pub fn new(registry: Arc<GuildSessionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, cmd: StopCommand) -> Result<StopResponse, PlaybackFailure> {
        let controller = self
            .registry
            .get(cmd.guild_id)
            .ok_or_else(|| PlaybackFailure::PlaybackError(
                "nothing is playing in this guild".to_string(),
            ))?;

        let channel_name = controller.session().channel_name().to_string();
        controller
            .stop()
            .await
            .map_err(|e| PlaybackFailure::PlaybackError(e.to_string()))?;

        Ok(StopResponse { channel_name })
    }
}
