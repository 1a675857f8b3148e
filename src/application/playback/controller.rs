//! Playback Controller - 播放生命周期控制
//!
//! 编排 解析 -> 提取 -> 拉流 -> 探测 -> 播放，把已探测的流绑定到
//! 语音会话内的播放器；管理音量与状态迁移。
//!
//! 不变量:
//! - 同一时刻最多持有一个已探测的流
//! - 无论结束事件（自然播完 / 播放器故障 / 意外断开）如何竞争，
//!   会话销毁恰好发生一次
//! - 会话创建后的任何失败都先销毁会话再返回

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::application::error::PlaybackFailure;
use crate::application::extraction::{ExtractorChain, FormatProbe};
use crate::application::ports::{
    AudioPlayerPort, ExtractionResult, MediaFetchPort, PlayerEvent, TitleSourcePort,
};
use crate::domain::playback::{PlaybackError, PlaybackState, Volume};
use crate::domain::track::{resolver, TrackTitle};
use crate::domain::voice::{ConnectionStatus, VoiceError};
use crate::infrastructure::voice::{GuildSessionRegistry, VoiceSession};

/// 播放管线的依赖集合
pub struct PlaybackPipeline {
    pub chain: Arc<ExtractorChain>,
    pub fetcher: Arc<dyn MediaFetchPort>,
    pub probe: Arc<FormatProbe>,
    pub title_source: Arc<dyn TitleSourcePort>,
    /// 播放启动后等待标题结果的上限；超过即丢弃
    pub title_wait: Duration,
}

/// 播放控制器
///
/// 与一个 VoiceSession 一对一绑定；语音连接由控制器独占。
pub struct PlaybackController {
    session: Arc<VoiceSession>,
    player: Arc<dyn AudioPlayerPort>,
    state: watch::Sender<PlaybackState>,
    torn_down: AtomicBool,
    registry: Option<Arc<GuildSessionRegistry>>,
}

impl PlaybackController {
    /// 把播放器绑定到就绪的会话
    ///
    /// 连接非 Ready（例如已抢先销毁）时报 SubscriptionFailed。
    pub fn bind(
        session: Arc<VoiceSession>,
        player: Arc<dyn AudioPlayerPort>,
        registry: Option<Arc<GuildSessionRegistry>>,
    ) -> Result<Arc<Self>, PlaybackFailure> {
        session.subscribe(player.clone())?;

        let (state, _) = watch::channel(PlaybackState::Idle);
        Ok(Arc::new(Self {
            session,
            player,
            state,
            torn_down: AtomicBool::new(false),
            registry,
        }))
    }

    pub fn session(&self) -> &Arc<VoiceSession> {
        &self.session
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    /// 状态观察通道（测试与上层等待用）
    pub fn watch_state(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// 播放一个视频引用
    ///
    /// 标题与主路径并发获取，失败或迟到都回退到原始输入，绝不拖慢播放。
    /// 启动成功后 spawn 监督例程接管终态处理。
    pub async fn play(
        self: &Arc<Self>,
        pipeline: &PlaybackPipeline,
        raw: &str,
        volume: Volume,
    ) -> Result<TrackTitle, PlaybackFailure> {
        self.transition(PlaybackState::Loading)
            .map_err(|e| PlaybackFailure::PlaybackError(e.to_string()))?;

        match self.run_pipeline(pipeline, raw, volume).await {
            Ok(title) => {
                self.spawn_supervisor();
                Ok(title)
            }
            Err(failure) => {
                // 会话先销毁，失败后返回；调用方只看到一条失败消息
                let _ = self.transition(PlaybackState::Error);
                self.teardown().await;
                Err(failure)
            }
        }
    }

    async fn run_pipeline(
        &self,
        pipeline: &PlaybackPipeline,
        raw: &str,
        volume: Volume,
    ) -> Result<TrackTitle, PlaybackFailure> {
        let reference = resolver::resolve(raw)?;

        tracing::info!(
            session_id = %self.session.id(),
            video_id = %reference.id(),
            "Starting playback pipeline"
        );

        // 标题并发尽力获取，不被主路径等待
        let mut title_task = {
            let title_source = pipeline.title_source.clone();
            let reference = reference.clone();
            tokio::spawn(async move { title_source.fetch_title(&reference).await })
        };

        let cancel = self.session.cancel_token();

        // 每个挂起点都与会话取消竞争：会话销毁时尽力放弃在途操作
        let extraction = tokio::select! {
            _ = cancel.cancelled() => return Err(VoiceError::SessionDestroyed.into()),
            result = pipeline.chain.extract(&reference) => result?,
        };

        let (stream, hint) = match extraction {
            ExtractionResult::Stream { stream, hint } => (stream, hint),
            ExtractionResult::DirectUrl { url, hint } => {
                let stream = tokio::select! {
                    _ = cancel.cancelled() => return Err(VoiceError::SessionDestroyed.into()),
                    result = pipeline.fetcher.fetch(&url) => result?,
                };
                (stream, hint)
            }
        };

        let probed = tokio::select! {
            _ = cancel.cancelled() => return Err(VoiceError::SessionDestroyed.into()),
            result = pipeline.probe.probe(stream, hint) => result?,
        };

        self.player.play(probed, volume).await?;
        self.transition(PlaybackState::Playing)
            .map_err(|e| PlaybackFailure::PlaybackError(e.to_string()))?;

        // 限时收割标题；迟到或失败一律丢弃
        let title = match tokio::time::timeout(pipeline.title_wait, &mut title_task).await {
            Ok(Ok(Ok(fetched))) if !fetched.trim().is_empty() => TrackTitle::new(fetched),
            Ok(_) => TrackTitle::fallback(&reference),
            Err(_elapsed) => {
                title_task.abort();
                TrackTitle::fallback(&reference)
            }
        };

        tracing::info!(
            session_id = %self.session.id(),
            video_id = %reference.id(),
            title = %title,
            volume = %volume,
            "Playback started"
        );

        Ok(title)
    }

    /// 播放中原地调整音量（已钳制），不重启流
    pub fn set_volume(&self, volume: Volume) -> Result<Volume, PlaybackError> {
        let state = self.state();
        if state != PlaybackState::Playing {
            return Err(PlaybackError::NotPlaying(state));
        }
        self.player.set_volume(volume);
        tracing::debug!(session_id = %self.session.id(), volume = %volume, "Volume changed");
        Ok(volume)
    }

    /// 显式停止播放并销毁会话
    pub async fn stop(&self) -> Result<(), PlaybackError> {
        self.transition(PlaybackState::Stopped)?;
        self.player.stop();
        self.teardown().await;
        Ok(())
    }

    /// 监督例程
    ///
    /// 单个例程消费播放器事件与连接状态：自然播完 -> Idle、
    /// 播放器故障 -> Error、意外断开 -> Error；每条路径都汇入
    /// 同一个一次性销毁闸门。
    fn spawn_supervisor(self: &Arc<Self>) {
        let mut events = match self.player.take_events() {
            Some(receiver) => receiver,
            None => {
                tracing::warn!(
                    session_id = %self.session.id(),
                    "Player events already consumed, supervisor not started"
                );
                return;
            }
        };

        let controller = Arc::clone(self);
        let mut status = self.session.status_watch();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => {
                        match event {
                            Some(PlayerEvent::Ended) => {
                                tracing::info!(
                                    session_id = %controller.session.id(),
                                    "Track finished"
                                );
                                let _ = controller.transition(PlaybackState::Idle);
                            }
                            Some(PlayerEvent::Fault(reason)) => {
                                tracing::error!(
                                    session_id = %controller.session.id(),
                                    error = %reason,
                                    "Audio player fault"
                                );
                                let _ = controller.transition(PlaybackState::Error);
                            }
                            None => {
                                tracing::debug!(
                                    session_id = %controller.session.id(),
                                    "Player event channel closed"
                                );
                            }
                        }
                        controller.teardown().await;
                        break;
                    }
                    changed = status.changed() => {
                        if changed.is_err() {
                            controller.teardown().await;
                            break;
                        }
                        let current = *status.borrow();
                        if matches!(
                            current,
                            ConnectionStatus::Disconnected | ConnectionStatus::Destroyed
                        ) {
                            tracing::warn!(
                                session_id = %controller.session.id(),
                                status = %current,
                                "Voice connection lost during playback"
                            );
                            let _ = controller.transition(PlaybackState::Error);
                            controller.teardown().await;
                            break;
                        }
                    }
                }
            }
        });
    }

    fn transition(&self, next: PlaybackState) -> Result<(), PlaybackError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|current| {
            if current.can_transition(next) {
                let from = *current;
                *current = next;
                tracing::debug!(from = %from, to = %next, "Playback state changed");
                true
            } else {
                outcome = Err(PlaybackError::InvalidTransition {
                    from: *current,
                    to: next,
                });
                false
            }
        });
        outcome
    }

    /// 一次性销毁闸门
    ///
    /// 停止播放器、销毁会话、从注册表摘除；重复调用是空操作。
    async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }

        self.player.stop();
        self.session.destroy().await;
        if let Some(registry) = &self.registry {
            registry.remove(self.session.guild(), self.session.id());
        }

        tracing::info!(
            session_id = %self.session.id(),
            guild_id = %self.session.guild(),
            "Playback torn down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        ByteStream, ExtractError, ExtractionBackendPort, FetchError, StreamFormat, TitleError,
        VoiceGatewayPort,
    };
    use crate::domain::track::VideoReference;
    use crate::domain::voice::{ChannelId, GuildId};
    use crate::infrastructure::voice::loopback::{LoopbackConfig, LoopbackVoiceGateway};
    use async_trait::async_trait;
    use url::Url;

    struct WebmBackend;

    #[async_trait]
    impl ExtractionBackendPort for WebmBackend {
        fn name(&self) -> &'static str {
            "webm"
        }

        async fn extract(
            &self,
            _reference: &VideoReference,
        ) -> Result<ExtractionResult, ExtractError> {
            let mut data = vec![0x1A, 0x45, 0xDF, 0xA3];
            data.extend_from_slice(&[0u8; 2048]);
            let stream: ByteStream = Box::new(std::io::Cursor::new(data));
            Ok(ExtractionResult::Stream { stream, hint: None })
        }
    }

    struct FailBackend(&'static str);

    #[async_trait]
    impl ExtractionBackendPort for FailBackend {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn extract(
            &self,
            _reference: &VideoReference,
        ) -> Result<ExtractionResult, ExtractError> {
            Err(ExtractError::Service("backend down".to_string()))
        }
    }

    struct NoFetch;

    #[async_trait]
    impl MediaFetchPort for NoFetch {
        async fn fetch(&self, _url: &Url) -> Result<ByteStream, FetchError> {
            Err(FetchError::Exhausted {
                attempts: 0,
                reason: "not used in this test".to_string(),
            })
        }
    }

    struct FixedTitle(&'static str);

    #[async_trait]
    impl TitleSourcePort for FixedTitle {
        async fn fetch_title(&self, _reference: &VideoReference) -> Result<String, TitleError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingTitle;

    #[async_trait]
    impl TitleSourcePort for FailingTitle {
        async fn fetch_title(&self, _reference: &VideoReference) -> Result<String, TitleError> {
            Err(TitleError::Network("no route".to_string()))
        }
    }

    fn pipeline(
        backends: Vec<Arc<dyn ExtractionBackendPort>>,
        title_source: Arc<dyn TitleSourcePort>,
    ) -> PlaybackPipeline {
        PlaybackPipeline {
            chain: Arc::new(ExtractorChain::new(backends)),
            fetcher: Arc::new(NoFetch),
            probe: Arc::new(FormatProbe::default()),
            title_source,
            title_wait: Duration::from_millis(200),
        }
    }

    async fn ready_controller(gateway: &LoopbackVoiceGateway) -> Arc<PlaybackController> {
        let session = VoiceSession::join(gateway, GuildId::new(1), ChannelId::new(2), "general")
            .await
            .unwrap();
        PlaybackController::bind(session, gateway.create_player(), None).unwrap()
    }

    async fn wait_for_state(controller: &PlaybackController, expected: PlaybackState) {
        let mut watch = controller.watch_state();
        tokio::time::timeout(Duration::from_secs(1), watch.wait_for(|s| *s == expected))
            .await
            .expect("state not reached in time")
            .unwrap();
    }

    #[tokio::test]
    async fn test_natural_end_tears_down_exactly_once() {
        let gateway = LoopbackVoiceGateway::with_defaults();
        let controller = ready_controller(&gateway).await;

        let pipeline = pipeline(vec![Arc::new(WebmBackend)], Arc::new(FixedTitle("Song")));
        let title = controller
            .play(&pipeline, "dQw4w9WgXcQ", Volume::from_percent(50))
            .await
            .unwrap();
        assert_eq!(title.as_str(), "Song");

        // 流瞬间吸干 -> Ended -> Idle + 单次销毁
        wait_for_state(&controller, PlaybackState::Idle).await;
        assert!(controller.is_torn_down());
        assert!(controller.session().is_destroyed());
        assert_eq!(gateway.disconnect_count(), 1);

        // 再次销毁不产生重复副作用
        controller.session().destroy().await;
        assert_eq!(gateway.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_player_fault_reaches_error_state() {
        let gateway = LoopbackVoiceGateway::new(LoopbackConfig {
            fault: Some("decoder blew up".to_string()),
            ..LoopbackConfig::default()
        });
        let controller = ready_controller(&gateway).await;

        let pipeline = pipeline(vec![Arc::new(WebmBackend)], Arc::new(FixedTitle("Song")));
        controller
            .play(&pipeline, "dQw4w9WgXcQ", Volume::default())
            .await
            .unwrap();

        wait_for_state(&controller, PlaybackState::Error).await;
        assert!(controller.session().is_destroyed());
        assert_eq!(gateway.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_destroys_session() {
        let gateway = LoopbackVoiceGateway::with_defaults();
        let controller = ready_controller(&gateway).await;

        let pipeline = pipeline(
            vec![Arc::new(FailBackend("resolver")), Arc::new(FailBackend("proxy"))],
            Arc::new(FixedTitle("Song")),
        );
        let err = controller
            .play(&pipeline, "dQw4w9WgXcQ", Volume::default())
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("resolver"));
        assert!(message.contains("proxy"));

        // 失败返回前会话已销毁
        assert!(controller.session().is_destroyed());
        assert_eq!(controller.state(), PlaybackState::Error);
    }

    #[tokio::test]
    async fn test_invalid_reference_fails_before_network() {
        let gateway = LoopbackVoiceGateway::with_defaults();
        let controller = ready_controller(&gateway).await;

        let pipeline = pipeline(vec![Arc::new(WebmBackend)], Arc::new(FixedTitle("Song")));
        let err = controller
            .play(&pipeline, "random text", Volume::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PlaybackFailure::InvalidReference(_)));
        assert!(controller.session().is_destroyed());
    }

    #[tokio::test]
    async fn test_title_failure_falls_back_to_raw_input() {
        let gateway = LoopbackVoiceGateway::with_defaults();
        let controller = ready_controller(&gateway).await;

        let pipeline = pipeline(vec![Arc::new(WebmBackend)], Arc::new(FailingTitle));
        let title = controller
            .play(&pipeline, "dQw4w9WgXcQ", Volume::default())
            .await
            .unwrap();

        assert_eq!(title.as_str(), "dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_set_volume_requires_playing() {
        let gateway = LoopbackVoiceGateway::with_defaults();
        let controller = ready_controller(&gateway).await;

        let err = controller.set_volume(Volume::from_percent(80)).unwrap_err();
        assert!(matches!(err, PlaybackError::NotPlaying(PlaybackState::Idle)));
    }

    #[tokio::test]
    async fn test_stop_reaches_stopped_and_tears_down() {
        let gateway = LoopbackVoiceGateway::with_defaults();
        let controller = ready_controller(&gateway).await;

        // 慢速流：播放保持 Playing 一段时间
        let pipeline = pipeline(vec![Arc::new(SlowBackend)], Arc::new(FixedTitle("Song")));
        controller
            .play(&pipeline, "dQw4w9WgXcQ", Volume::default())
            .await
            .unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);

        controller.stop().await.unwrap();
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert!(controller.session().is_destroyed());
        assert_eq!(gateway.disconnect_count(), 1);
    }

    struct SlowBackend;

    #[async_trait]
    impl ExtractionBackendPort for SlowBackend {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn extract(
            &self,
            _reference: &VideoReference,
        ) -> Result<ExtractionResult, ExtractError> {
            let mut data = vec![0x1A, 0x45, 0xDF, 0xA3];
            data.extend_from_slice(&[0u8; 64]);
            // 头部之后接一条永不结束的流，播放停留在 Playing
            let endless = tokio::io::AsyncReadExt::chain(
                std::io::Cursor::new(data),
                tokio::io::repeat(0u8),
            );
            let stream: ByteStream = Box::new(endless);
            Ok(ExtractionResult::Stream {
                stream,
                hint: None,
            })
        }
    }

    #[tokio::test]
    async fn test_unexpected_disconnect_tears_down_once() {
        let gateway = LoopbackVoiceGateway::with_defaults();
        let controller = ready_controller(&gateway).await;

        let pipeline = pipeline(vec![Arc::new(SlowBackend)], Arc::new(FixedTitle("Song")));
        controller
            .play(&pipeline, "dQw4w9WgXcQ", Volume::default())
            .await
            .unwrap();

        // 传输层意外断开 -> Error 终态 + 单次销毁
        gateway.sever_connections();
        wait_for_state(&controller, PlaybackState::Error).await;
        assert!(controller.is_torn_down());
        assert_eq!(gateway.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_volume_applied_while_playing() {
        let gateway = LoopbackVoiceGateway::with_defaults();
        let controller = ready_controller(&gateway).await;

        let pipeline = pipeline(vec![Arc::new(SlowBackend)], Arc::new(FixedTitle("Song")));
        controller
            .play(&pipeline, "dQw4w9WgXcQ", Volume::from_percent(50))
            .await
            .unwrap();

        let applied = controller.set_volume(Volume::from_percent(150)).unwrap();
        assert_eq!(applied.as_f32(), 1.0);

        controller.stop().await.unwrap();
    }
}
